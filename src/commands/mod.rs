pub mod auth;
pub mod billing;
pub mod cell_location;
pub mod group;
pub mod query;
pub mod sim;
pub mod stats;
pub mod validator;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use crate::client::{ClientError, ClientRegistry, Coverage, SoracomClient};
use crate::security::auth::Credentials;

pub use rmcp::model::CallToolResult;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("Invalid parameters provided: {0}")]
    InvalidParameters(String),
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Per-invocation settings: credentials plus the coverage chosen for this call.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub credentials: Credentials,
    pub coverage: Coverage,
}

/// What a command needs to reach the API.
pub struct CommandContext<'a> {
    pub config: ServerConfig,
    pub registry: &'a ClientRegistry,
}

impl<'a> CommandContext<'a> {
    pub fn new(config: ServerConfig, registry: &'a ClientRegistry) -> Self {
        Self { config, registry }
    }

    /// Check credentials, then acquire an authenticated client.
    pub async fn client(&self) -> Result<Arc<SoracomClient>, CommandError> {
        self.config.credentials.validate()?;
        Ok(self
            .registry
            .acquire(&self.config.credentials, self.config.coverage)
            .await?)
    }
}

/// Envelope builders for tool results.
pub mod response {
    use chrono::{SecondsFormat, Utc};
    use rmcp::model::{CallToolResult, Content};
    use serde_json::{json, Map, Value};

    /// `Error: <message>` flagged as a tool error.
    pub fn error(message: &str) -> CallToolResult {
        CallToolResult::error(vec![Content::text(format!("Error: {message}"))])
    }

    /// `{"data": …, "metadata": {"timestamp": …, …}}` as pretty JSON.
    pub fn success(data: Value, metadata: Option<Map<String, Value>>) -> CallToolResult {
        let mut meta = Map::new();
        meta.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Some(extra) = metadata {
            meta.extend(extra);
        }

        let body = json!({ "data": data, "metadata": meta });
        let text = serde_json::to_string_pretty(&body).unwrap_or_else(|_| body.to_string());
        CallToolResult::success(vec![Content::text(text)])
    }

    /// Wrap an array body as `{"items": […], "count": n}`.
    pub fn list(items: Value, metadata: Option<Map<String, Value>>) -> CallToolResult {
        match items {
            Value::Array(items) => {
                let count = items.len();
                success(json!({ "items": items, "count": count }), metadata)
            }
            other => success(other, metadata),
        }
    }
}

#[async_trait]
pub trait ToolCommand: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn input_schema(&self) -> Value;

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError>;

    /// Run the command, turning any failure into an error envelope.
    async fn execute(&self, args: Value, ctx: &CommandContext<'_>) -> CallToolResult {
        match self.run(args, ctx).await {
            Ok(result) => {
                debug!(tool = self.name(), "tool executed successfully");
                result
            }
            Err(err) => {
                error!(tool = self.name(), error = %err, "tool execution failed");
                response::error(&err.to_string())
            }
        }
    }
}

/// Every tool the server exposes.
pub struct CommandSet {
    commands: Vec<Box<dyn ToolCommand>>,
}

impl CommandSet {
    pub fn new(commands: Vec<Box<dyn ToolCommand>>) -> Self {
        Self { commands }
    }

    pub fn all() -> Self {
        let commands: Vec<Box<dyn ToolCommand>> = vec![
            Box::new(auth::LogoutCommand),
            Box::new(sim::ListSimsCommand),
            Box::new(sim::GetSimCommand),
            Box::new(sim::ListSimSessionEventsCommand),
            Box::new(sim::ListSimStatusHistoryCommand),
            Box::new(query::SearchSimsCommand),
            Box::new(stats::GetAirStatsOfSimCommand),
            Box::new(stats::GetAirStatsOfOperatorCommand),
            Box::new(stats::GetAirStatsOfGroupCommand),
            Box::new(group::ListGroupsCommand),
            Box::new(group::GetGroupCommand),
            Box::new(billing::GetLatestBillingCommand),
            Box::new(billing::GetBillingHistoryCommand),
            Box::new(billing::GetBillingCommand),
            Box::new(billing::GetBillingSummaryOfBillItemsCommand),
            Box::new(billing::GetBillingSummaryOfSimsCommand),
            Box::new(cell_location::BatchGetCellLocationsCommand),
        ];
        Self::new(commands)
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolCommand> {
        self.commands
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// Commands ordered by name.
    pub fn sorted(&self) -> Vec<&dyn ToolCommand> {
        let mut commands: Vec<&dyn ToolCommand> = self.commands.iter().map(|c| c.as_ref()).collect();
        commands.sort_by_key(|c| c.name());
        commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl Default for CommandSet {
    fn default() -> Self {
        Self::all()
    }
}
