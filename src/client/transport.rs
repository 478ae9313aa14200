use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, error, trace};

use crate::client::error::ClientError;

pub const API_KEY_HEADER: &str = "X-Soracom-API-Key";
pub const TOKEN_HEADER: &str = "X-Soracom-Token";
const SERVER_NAME: &str = "soracom-mcp-server";
const ACCEPT_TYPE: &str = "application/json";

/// Fixed per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub fn user_agent() -> String {
    format!("{}/{}", SERVER_NAME, crate::VERSION)
}

/// Short-lived auth pair attached to every authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeaders {
    pub api_key: String,
    pub token: String,
}

/// A replayable description of one outbound call.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Set once the request has gone through a re-authentication cycle.
    pub retried: bool,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retried: false,
        }
    }

    pub fn post(path: impl Into<String>, body: Option<Value>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            query: Vec::new(),
            body,
            retried: false,
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// HTTP client bound to one region endpoint.
#[derive(Debug, Clone)]
pub struct Transport {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl Transport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(format!("building http client: {e}")))?;

        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Standard headers plus the auth pair when present.
    fn build_headers(&self, auth: Option<&AuthHeaders>) -> Result<HeaderMap, ClientError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&user_agent())
                .map_err(|e| ClientError::Transport(e.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_TYPE));

        if let Some(auth) = auth {
            headers.insert(
                API_KEY_HEADER,
                HeaderValue::from_str(&auth.api_key)
                    .map_err(|e| ClientError::Transport(format!("invalid api key header: {e}")))?,
            );
            headers.insert(
                TOKEN_HEADER,
                HeaderValue::from_str(&auth.token)
                    .map_err(|e| ClientError::Transport(format!("invalid token header: {e}")))?,
            );
        }

        Ok(headers)
    }

    /// Issue `request` exactly once and return the parsed body.
    ///
    /// Non-2xx responses become [`ClientError::Status`]. Timeouts and
    /// connection failures are logged here and returned as-is.
    pub async fn send_once(
        &self,
        request: &ApiRequest,
        auth: Option<&AuthHeaders>,
    ) -> Result<Value, ClientError> {
        let url = self.url(&request.path);
        let headers = self.build_headers(auth)?;

        debug!(
            method = %request.method,
            url = %request.path,
            base_url = %self.base_url,
            "Making API request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = match builder.send().await {
            Ok(response) => response,
            Err(err) => {
                let err = ClientError::from(err);
                if err.is_network() {
                    error!(
                        error = %err,
                        url = %request.path,
                        base_url = %self.base_url,
                        timeout_ms = self.timeout.as_millis() as u64,
                        "Request failed before a response was received"
                    );
                }
                return Err(err);
            }
        };

        let status = response.status();
        let text = response.text().await.map_err(ClientError::from)?;
        trace!(status = %status.as_u16(), url = %request.path, "received response");

        if !status.is_success() {
            return Err(ClientError::Status {
                status,
                message: error_message(status, &text),
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }
}

/// Prefer the `message` field of a JSON error body, then the raw body.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(message) = map.get("message").and_then(|v| v.as_str()) {
            return message.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[tokio::test]
    async fn send_once_attaches_standard_and_auth_headers() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/sims")
            .match_header("User-Agent", Matcher::Exact(user_agent()))
            .match_header("Accept", "application/json")
            .match_header(API_KEY_HEADER, "api-key-1")
            .match_header(TOKEN_HEADER, "token-1")
            .match_query(Matcher::UrlEncoded("limit".into(), "10".into()))
            .with_status(200)
            .with_body(r#"[{"simId":"sim-1"}]"#)
            .create_async()
            .await;

        let transport = Transport::new(format!("{}/v1", server.url()), REQUEST_TIMEOUT).unwrap();
        let auth = AuthHeaders {
            api_key: "api-key-1".into(),
            token: "token-1".into(),
        };
        let request = ApiRequest::get("/sims").with_query(vec![("limit".into(), "10".into())]);

        let body = transport.send_once(&request, Some(&auth)).await.unwrap();
        assert_eq!(body, json!([{"simId": "sim-1"}]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_once_posts_json_body() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/cell_locations")
            .match_header("Content-Type", "application/json")
            .match_body(Matcher::Json(json!([{"mcc": "440", "mnc": "10"}])))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let transport = Transport::new(format!("{}/v1/", server.url()), REQUEST_TIMEOUT).unwrap();
        let request = ApiRequest::post("cell_locations", Some(json!([{"mcc": "440", "mnc": "10"}])));

        assert_eq!(transport.send_once(&request, None).await.unwrap(), json!([]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn send_once_maps_error_status_with_message() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/v1/groups/missing")
            .with_status(404)
            .with_body(r#"{"code":"SEM0005","message":"Group not found"}"#)
            .create_async()
            .await;

        let transport = Transport::new(format!("{}/v1", server.url()), REQUEST_TIMEOUT).unwrap();
        let err = transport
            .send_once(&ApiRequest::get("/groups/missing"), None)
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(reqwest::StatusCode::NOT_FOUND));
        assert_eq!(err.remote_message(), "Group not found");
    }

    #[tokio::test]
    async fn send_once_treats_empty_body_as_null() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/v1/auth/logout")
            .with_status(204)
            .create_async()
            .await;

        let transport = Transport::new(format!("{}/v1", server.url()), REQUEST_TIMEOUT).unwrap();
        let body = transport
            .send_once(&ApiRequest::post("/auth/logout", None), None)
            .await
            .unwrap();
        assert_eq!(body, Value::Null);
    }

    #[test]
    fn error_message_falls_back_to_body_then_reason() {
        assert_eq!(
            error_message(reqwest::StatusCode::BAD_GATEWAY, "upstream down"),
            "upstream down"
        );
        assert_eq!(
            error_message(reqwest::StatusCode::UNAUTHORIZED, ""),
            "Unauthorized"
        );
    }
}
