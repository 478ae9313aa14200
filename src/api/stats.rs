use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::query_pairs;
use crate::client::error::ClientError;
use crate::client::transport::ApiRequest;
use crate::client::SoracomClient;

/// Aggregation unit for Air usage stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Minutes,
    Day,
    Month,
}

/// `from`/`to` are UNIX seconds.
#[derive(Debug, Clone, Serialize)]
pub struct StatsWindow {
    pub from: i64,
    pub to: i64,
    pub period: StatsPeriod,
}

pub struct StatsApi<'a> {
    client: &'a SoracomClient,
}

impl<'a> StatsApi<'a> {
    pub(crate) fn new(client: &'a SoracomClient) -> Self {
        Self { client }
    }

    /// Usage of the whole operator; needs the operator id from authentication.
    pub async fn get_air_stats_of_operator(&self, window: &StatsWindow) -> Result<Value, ClientError> {
        let operator_id = self
            .client
            .operator_id()
            .await
            .ok_or(ClientError::MissingOperatorId)?;
        self.get(format!("/stats/air/operators/{operator_id}"), window).await
    }

    pub async fn get_air_stats_of_sim(&self, sim_id: &str, window: &StatsWindow) -> Result<Value, ClientError> {
        self.get(format!("/stats/air/sims/{sim_id}"), window).await
    }

    pub async fn get_air_stats_of_group(
        &self,
        group_id: &str,
        window: &StatsWindow,
    ) -> Result<Value, ClientError> {
        self.get(format!("/stats/air/groups/{group_id}"), window).await
    }

    async fn get(&self, path: String, window: &StatsWindow) -> Result<Value, ClientError> {
        let request = ApiRequest::get(path).with_query(query_pairs(window)?);
        self.client.request(request).await
    }
}
