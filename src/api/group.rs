use serde::Serialize;
use serde_json::Value;

use super::query_pairs;
use crate::client::error::ClientError;
use crate::client::transport::ApiRequest;
use crate::client::SoracomClient;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ListGroupsParams {
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

pub struct GroupApi<'a> {
    client: &'a SoracomClient,
}

impl<'a> GroupApi<'a> {
    pub(crate) fn new(client: &'a SoracomClient) -> Self {
        Self { client }
    }

    pub async fn get_group(&self, group_id: &str) -> Result<Value, ClientError> {
        self.client
            .request(ApiRequest::get(format!("/groups/{group_id}")))
            .await
    }

    pub async fn list_groups(&self, params: &ListGroupsParams) -> Result<Value, ClientError> {
        let request = ApiRequest::get("/groups").with_query(query_pairs(params)?);
        self.client.request(request).await
    }
}
