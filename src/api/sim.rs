use serde::Serialize;
use serde_json::Value;

use super::query_pairs;
use crate::client::error::ClientError;
use crate::client::transport::ApiRequest;
use crate::client::SoracomClient;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListSimsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed_class_filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_value_match_mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<String>,
}

/// Time-window pagination shared by session events and status history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SimHistoryParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<String>,
}

pub struct SimApi<'a> {
    client: &'a SoracomClient,
}

impl<'a> SimApi<'a> {
    pub(crate) fn new(client: &'a SoracomClient) -> Self {
        Self { client }
    }

    pub async fn get_sim(&self, sim_id: &str) -> Result<Value, ClientError> {
        self.client.request(ApiRequest::get(format!("/sims/{sim_id}"))).await
    }

    pub async fn list_sims(&self, params: &ListSimsParams) -> Result<Value, ClientError> {
        let request = ApiRequest::get("/sims").with_query(query_pairs(params)?);
        self.client.request(request).await
    }

    pub async fn list_sim_session_events(
        &self,
        sim_id: &str,
        params: &SimHistoryParams,
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::get(format!("/sims/{sim_id}/events/sessions"))
            .with_query(query_pairs(params)?);
        self.client.request(request).await
    }

    pub async fn list_sim_status_history(
        &self,
        sim_id: &str,
        params: &SimHistoryParams,
    ) -> Result<Value, ClientError> {
        let request = ApiRequest::get(format!("/sims/{sim_id}/statuses/history"))
            .with_query(query_pairs(params)?);
        self.client.request(request).await
    }
}
