use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::validator::{check_sim_id, parse_args, require_non_empty};
use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};
use crate::api::stats::{StatsPeriod, StatsWindow};

const FROM_DESCRIPTION_SHORT: &str = "Start date in UNIX timestamp (seconds). day: subtract up to 604800 seconds (7 days). month: subtract up to 7776000 seconds (3 months)";
const TO_DESCRIPTION: &str = "End date in UNIX timestamp (seconds). Use the current timestamp";

#[derive(Debug, Deserialize)]
struct WindowArgs {
    from: i64,
    to: i64,
    period: StatsPeriod,
}

impl WindowArgs {
    /// Operator and group reports only aggregate by day or month.
    fn coarse(self) -> Result<StatsWindow, CommandError> {
        if self.period == StatsPeriod::Minutes {
            return Err(CommandError::InvalidParameters(
                "period must be either \"day\" or \"month\"".to_string(),
            ));
        }
        self.window()
    }

    fn window(self) -> Result<StatsWindow, CommandError> {
        if self.from <= 0 || self.to <= 0 {
            return Err(CommandError::InvalidParameters(
                "from and to must be positive UNIX timestamps".to_string(),
            ));
        }
        Ok(StatsWindow {
            from: self.from,
            to: self.to,
            period: self.period,
        })
    }
}

fn window_properties(periods: &[&str], from_description: &str) -> Map<String, Value> {
    let mut properties = Map::new();
    properties.insert(
        "from".into(),
        json!({ "type": "number", "description": from_description }),
    );
    properties.insert(
        "to".into(),
        json!({ "type": "number", "description": TO_DESCRIPTION }),
    );
    properties.insert(
        "period".into(),
        json!({
            "type": "string",
            "enum": periods,
            "description": "Unit of aggregation. Start with \"month\" for a broader overview"
        }),
    );
    properties
}

#[derive(Debug, Deserialize)]
struct SimStatsArgs {
    sim_id: String,
    #[serde(flatten)]
    window: WindowArgs,
}

pub struct GetAirStatsOfSimCommand;

#[async_trait]
impl ToolCommand for GetAirStatsOfSimCommand {
    fn name(&self) -> &'static str {
        "Stats_getAirStatsOfSim"
    }

    fn description(&self) -> &'static str {
        "Retrieve the usage report for the subscriber specified by the SIM ID"
    }

    fn input_schema(&self) -> Value {
        let mut properties = window_properties(
            &["minutes", "day", "month"],
            "Start date in UNIX timestamp (seconds). minutes: subtract up to 2764800 seconds (32 days). day or month: subtract up to 46656000 seconds (18 months)",
        );
        properties.insert(
            "sim_id".into(),
            json!({ "type": "string", "description": "SIM ID of the target SIM" }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": ["sim_id", "from", "to", "period"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: SimStatsArgs = parse_args(args)?;
        check_sim_id(&args.sim_id)?;
        let window = args.window.window()?;

        let client = ctx.client().await?;
        let stats = client.stats().get_air_stats_of_sim(&args.sim_id, &window).await?;
        Ok(response::success(stats, None))
    }
}

pub struct GetAirStatsOfOperatorCommand;

#[async_trait]
impl ToolCommand for GetAirStatsOfOperatorCommand {
    fn name(&self) -> &'static str {
        "Stats_getAirStatsOfOperator"
    }

    fn description(&self) -> &'static str {
        "Get data usage statistics for Air service"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": window_properties(&["day", "month"], FROM_DESCRIPTION_SHORT),
            "required": ["from", "to", "period"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let window = parse_args::<WindowArgs>(args)?.coarse()?;

        let client = ctx.client().await?;
        let stats = client.stats().get_air_stats_of_operator(&window).await?;
        Ok(response::success(stats, None))
    }
}

#[derive(Debug, Deserialize)]
struct GroupStatsArgs {
    group_id: String,
    #[serde(flatten)]
    window: WindowArgs,
}

pub struct GetAirStatsOfGroupCommand;

#[async_trait]
impl ToolCommand for GetAirStatsOfGroupCommand {
    fn name(&self) -> &'static str {
        "Stats_getAirStatsOfGroup"
    }

    fn description(&self) -> &'static str {
        "Retrieves the usage report for the specified group"
    }

    fn input_schema(&self) -> Value {
        let mut properties = window_properties(&["day", "month"], FROM_DESCRIPTION_SHORT);
        properties.insert(
            "group_id".into(),
            json!({ "type": "string", "description": "The Group ID" }),
        );
        json!({
            "type": "object",
            "properties": properties,
            "required": ["group_id", "from", "to", "period"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: GroupStatsArgs = parse_args(args)?;
        require_non_empty("group_id", &args.group_id)?;
        let window = args.window.coarse()?;

        let client = ctx.client().await?;
        let stats = client
            .stats()
            .get_air_stats_of_group(&args.group_id, &window)
            .await?;
        Ok(response::success(stats, None))
    }
}
