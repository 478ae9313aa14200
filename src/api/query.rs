use serde::Serialize;
use serde_json::Value;

use super::query_pairs;
use crate::client::error::ClientError;
use crate::client::transport::ApiRequest;
use crate::client::SoracomClient;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchSimsParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sim_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imsi: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msisdn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iccid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub module_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundles: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_evaluated_key: Option<String>,
}

pub struct QueryApi<'a> {
    client: &'a SoracomClient,
}

impl<'a> QueryApi<'a> {
    pub(crate) fn new(client: &'a SoracomClient) -> Self {
        Self { client }
    }

    pub async fn search_sims(&self, params: &SearchSimsParams) -> Result<Value, ClientError> {
        let request = ApiRequest::get("/query/sims").with_query(query_pairs(params)?);
        self.client.request(request).await
    }
}
