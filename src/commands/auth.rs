use async_trait::async_trait;
use serde_json::{json, Value};

use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};

pub struct LogoutCommand;

#[async_trait]
impl ToolCommand for LogoutCommand {
    fn name(&self) -> &'static str {
        "Auth_logout"
    }

    fn description(&self) -> &'static str {
        "Clear cached authentication tokens"
    }

    fn input_schema(&self) -> Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn run(&self, _args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let client = ctx.client().await?;
        client
            .logout(Some(&ctx.config.credentials.auth_key_id))
            .await?;

        Ok(response::success(
            json!({
                "message": "Authentication cache cleared. The system will automatically re-authenticate on the next API call.",
                "note": "You can continue to use all SORACOM API functions normally.",
            }),
            None,
        ))
    }
}
