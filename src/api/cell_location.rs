use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::error::ClientError;
use crate::client::transport::ApiRequest;
use crate::client::SoracomClient;

/// One cell tower. 3G cells use `lac`/`cid`, LTE cells `tac`/`ecid` (or `eci`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellIdentifier {
    pub mcc: String,
    pub mnc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tac: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eci: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

pub struct CellLocationApi<'a> {
    client: &'a SoracomClient,
}

impl<'a> CellLocationApi<'a> {
    pub(crate) fn new(client: &'a SoracomClient) -> Self {
        Self { client }
    }

    pub async fn batch_get_cell_locations(
        &self,
        cells: &[CellIdentifier],
    ) -> Result<Value, ClientError> {
        let body = serde_json::to_value(cells)
            .map_err(|e| ClientError::InvalidResponse(format!("encoding cell identifiers: {e}")))?;
        self.client
            .request(ApiRequest::post("/cell_locations", Some(body)))
            .await
    }
}
