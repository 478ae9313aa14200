use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::validator::{check_sim_id, page_limit, parse_args};
use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};
use crate::api::sim::{ListSimsParams, SimHistoryParams};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListSimsArgs {
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    last_evaluated_key: Option<String>,
}

pub struct ListSimsCommand;

#[async_trait]
impl ToolCommand for ListSimsCommand {
    fn name(&self) -> &'static str {
        "Sim_listSims"
    }

    fn description(&self) -> &'static str {
        "List all IoT SIM cards in your account. Returns paginated results with SIM details"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": {
                    "type": "number",
                    "description": "Maximum number of SIMs to return (default: 10)"
                },
                "lastEvaluatedKey": {
                    "type": "string",
                    "description": "The ID of the last SIM retrieved on the previous page. Specify this to continue from the next SIM onward"
                }
            }
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: ListSimsArgs = parse_args(args)?;
        let params = ListSimsParams {
            limit: Some(page_limit(args.limit, None)?),
            last_evaluated_key: args.last_evaluated_key,
            ..Default::default()
        };

        let client = ctx.client().await?;
        let sims = client.sim().list_sims(&params).await?;
        Ok(response::list(sims, None))
    }
}

#[derive(Debug, Deserialize)]
struct SimIdArgs {
    sim_id: String,
}

pub struct GetSimCommand;

#[async_trait]
impl ToolCommand for GetSimCommand {
    fn name(&self) -> &'static str {
        "Sim_getSim"
    }

    fn description(&self) -> &'static str {
        "Get detailed information about a specific IoT SIM card by SIM ID"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sim_id": { "type": "string", "description": "SIM ID of the target IoT SIM" }
            },
            "required": ["sim_id"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: SimIdArgs = parse_args(args)?;
        check_sim_id(&args.sim_id)?;

        let client = ctx.client().await?;
        let sim = client.sim().get_sim(&args.sim_id).await?;
        Ok(response::success(sim, None))
    }
}

#[derive(Debug, Deserialize)]
struct SimHistoryArgs {
    sim_id: String,
    #[serde(default)]
    from: Option<i64>,
    #[serde(default)]
    to: Option<i64>,
    #[serde(default)]
    limit: Option<u32>,
    #[serde(default)]
    last_evaluated_key: Option<String>,
}

impl SimHistoryArgs {
    fn into_params(self) -> Result<(String, SimHistoryParams), CommandError> {
        check_sim_id(&self.sim_id)?;
        let params = SimHistoryParams {
            from: self.from,
            to: self.to,
            limit: Some(page_limit(self.limit, None)?),
            last_evaluated_key: self.last_evaluated_key,
        };
        Ok((self.sim_id, params))
    }
}

fn sim_history_schema(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "sim_id": { "type": "string", "description": "SIM ID of the target IoT SIM" },
            "from": {
                "type": "number",
                "description": format!("Start time (UNIX time in milliseconds) of the period to retrieve the {what}")
            },
            "to": {
                "type": "number",
                "description": format!("End time (UNIX time in milliseconds) of the period to retrieve the {what}")
            },
            "limit": { "type": "number", "description": "Maximum number of items to retrieve (default: 10)" },
            "last_evaluated_key": {
                "type": "string",
                "description": "The key of the last item retrieved on the previous page. Specify this to continue from the next item"
            }
        },
        "required": ["sim_id"]
    })
}

pub struct ListSimSessionEventsCommand;

#[async_trait]
impl ToolCommand for ListSimSessionEventsCommand {
    fn name(&self) -> &'static str {
        "Sim_listSimSessionEvents"
    }

    fn description(&self) -> &'static str {
        "List the session event history (Created, Modified, Deleted) of an IoT SIM"
    }

    fn input_schema(&self) -> Value {
        sim_history_schema("session event history")
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let (sim_id, params) = parse_args::<SimHistoryArgs>(args)?.into_params()?;

        let client = ctx.client().await?;
        let events = client.sim().list_sim_session_events(&sim_id, &params).await?;
        Ok(response::list(events, None))
    }
}

pub struct ListSimStatusHistoryCommand;

#[async_trait]
impl ToolCommand for ListSimStatusHistoryCommand {
    fn name(&self) -> &'static str {
        "Sim_listSimStatusHistory"
    }

    fn description(&self) -> &'static str {
        "List the status change history of an IoT SIM"
    }

    fn input_schema(&self) -> Value {
        sim_history_schema("status history")
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let (sim_id, params) = parse_args::<SimHistoryArgs>(args)?.into_params()?;

        let client = ctx.client().await?;
        let history = client.sim().list_sim_status_history(&sim_id, &params).await?;
        Ok(response::list(history, None))
    }
}
