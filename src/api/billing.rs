use serde_json::Value;

use crate::client::error::ClientError;
use crate::client::transport::ApiRequest;
use crate::client::SoracomClient;

pub struct BillingApi<'a> {
    client: &'a SoracomClient,
}

impl<'a> BillingApi<'a> {
    pub(crate) fn new(client: &'a SoracomClient) -> Self {
        Self { client }
    }

    pub async fn get_billing_history(&self) -> Result<Value, ClientError> {
        self.client.request(ApiRequest::get("/bills")).await
    }

    /// Finalized bill for `year_month` (`YYYYMM`).
    pub async fn get_billing(&self, year_month: &str) -> Result<Value, ClientError> {
        self.client
            .request(ApiRequest::get(format!("/bills/{year_month}")))
            .await
    }

    pub async fn get_latest_billing(&self) -> Result<Value, ClientError> {
        self.client.request(ApiRequest::get("/bills/latest")).await
    }

    pub async fn get_billing_summary_of_bill_items(&self) -> Result<Value, ClientError> {
        self.client
            .request(ApiRequest::get("/bills/summaries/bill_items"))
            .await
    }

    pub async fn get_billing_summary_of_sims(&self) -> Result<Value, ClientError> {
        self.client
            .request(ApiRequest::get("/bills/summaries/sims"))
            .await
    }
}
