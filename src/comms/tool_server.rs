//! MCP tool server: the `CommandSet` behind an `rmcp` stdio service.

use std::sync::Arc;

use anyhow::Result;
use rmcp::model::{
    CallToolRequestParam, CallToolResult, Implementation, JsonObject, ListToolsResult,
    PaginatedRequestParam, ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, RoleServer};
use rmcp::transport::stdio;
use rmcp::{ErrorData as McpError, ServerHandler, ServiceExt};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::client::{ClientRegistry, Coverage};
use crate::commands::{response, CommandContext, CommandSet, ServerConfig};

pub const SERVER_NAME: &str = "soracom-mcp-server";

pub struct ToolServer {
    commands: CommandSet,
    registry: Arc<ClientRegistry>,
    defaults: ServerConfig,
}

impl ToolServer {
    pub fn new(commands: CommandSet, registry: Arc<ClientRegistry>, defaults: ServerConfig) -> Self {
        Self {
            commands,
            registry,
            defaults,
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Tools sorted by name, each schema extended with the `coverage` selector.
    pub fn tools(&self) -> Vec<Tool> {
        self.commands
            .sorted()
            .into_iter()
            .map(|command| {
                let mut schema: JsonObject = command.input_schema().as_object().cloned().unwrap_or_default();
                let properties = schema
                    .entry("properties")
                    .or_insert_with(|| Value::Object(JsonObject::new()));
                if let Some(properties) = properties.as_object_mut() {
                    properties.insert(
                        "coverage".into(),
                        json!({
                            "type": "string",
                            "enum": ["jp", "g"],
                            "description": "API coverage region (default: jp for Japan, g for Global coverage)"
                        }),
                    );
                }
                Tool::new(command.name(), command.description(), schema)
            })
            .collect()
    }

    /// Run one tool. Failures come back as error envelopes, never as protocol errors.
    pub async fn call(&self, name: &str, arguments: Option<JsonObject>) -> CallToolResult {
        info!(tool = %name, "Executing tool");

        let Some(command) = self.commands.get(name) else {
            error!(tool = %name, "Unknown tool requested");
            return response::error(&format!("Unknown tool: {name}"));
        };

        let coverage = match self.coverage_for(arguments.as_ref()) {
            Ok(coverage) => coverage,
            Err(message) => return response::error(&message),
        };
        let config = ServerConfig {
            coverage,
            ..self.defaults.clone()
        };
        let ctx = CommandContext::new(config, &self.registry);
        command
            .execute(arguments.map(Value::Object).unwrap_or(Value::Null), &ctx)
            .await
    }

    fn coverage_for(&self, arguments: Option<&JsonObject>) -> Result<Coverage, String> {
        match arguments
            .and_then(|args| args.get("coverage"))
            .and_then(Value::as_str)
        {
            Some(raw) if !raw.is_empty() => raw
                .parse()
                .map_err(|e| format!("Invalid parameters provided: {e}")),
            _ => Ok(self.defaults.coverage),
        }
    }
}

impl ServerHandler for ToolServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: crate::VERSION.to_string(),
                ..Implementation::from_build_env()
            },
            ..Default::default()
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        let tools = self.tools();
        debug!(count = tools.len(), "Listing available tools");
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        Ok(self.call(&request.name, request.arguments).await)
    }
}

/// Serve on stdin/stdout until the host disconnects.
pub async fn serve_stdio(server: ToolServer) -> Result<()> {
    let service = server
        .serve(stdio())
        .await
        .inspect_err(|e| error!(error = %e, "tool server failed to start"))?;
    let reason = service.waiting().await?;
    debug!(?reason, "tool server stopped");
    Ok(())
}
