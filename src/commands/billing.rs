use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use super::validator::parse_args;
use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};

fn empty_schema() -> Value {
    json!({ "type": "object", "properties": {} })
}

pub struct GetLatestBillingCommand;

#[async_trait]
impl ToolCommand for GetLatestBillingCommand {
    fn name(&self) -> &'static str {
        "Billing_getLatestBilling"
    }

    fn description(&self) -> &'static str {
        "Retrieves the preliminary usage fee for the current month"
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn run(&self, _args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let client = ctx.client().await?;
        let billing = client.billing().get_latest_billing().await?;
        Ok(response::success(billing, None))
    }
}

pub struct GetBillingHistoryCommand;

#[async_trait]
impl ToolCommand for GetBillingHistoryCommand {
    fn name(&self) -> &'static str {
        "Billing_getBillingHistory"
    }

    fn description(&self) -> &'static str {
        "List all available finalized billing periods from the last 18 months."
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn run(&self, _args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let client = ctx.client().await?;
        let history = client.billing().get_billing_history().await?;
        Ok(response::success(history, None))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct YearMonthArgs {
    year_month: String,
}

impl YearMonthArgs {
    fn validate(&self) -> Result<(), CommandError> {
        let ym = self.year_month.as_str();
        if ym.len() != 6 || !ym.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CommandError::InvalidParameters(
                "yearMonth must be in YYYYMM format".to_string(),
            ));
        }
        Ok(())
    }
}

pub struct GetBillingCommand;

#[async_trait]
impl ToolCommand for GetBillingCommand {
    fn name(&self) -> &'static str {
        "Billing_getBilling"
    }

    fn description(&self) -> &'static str {
        "Gets a finalized past billing history for the specified month. Returns complete billing details including charges by service type."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "yearMonth": {
                    "type": "string",
                    "description": "Billing year-month (YYYYMM format)"
                }
            },
            "required": ["yearMonth"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: YearMonthArgs = parse_args(args)?;
        args.validate()?;

        let client = ctx.client().await?;
        let billing = client.billing().get_billing(&args.year_month).await?;
        Ok(response::success(
            json!({
                "yearMonth": args.year_month,
                "billing": billing,
                "message": "Billing data retrieved successfully"
            }),
            None,
        ))
    }
}

pub struct GetBillingSummaryOfBillItemsCommand;

#[async_trait]
impl ToolCommand for GetBillingSummaryOfBillItemsCommand {
    fn name(&self) -> &'static str {
        "Billing_getBillingSummaryOfBillItems"
    }

    fn description(&self) -> &'static str {
        "Get a billing summary of bill items for the last 4 months (this month to 3 months ago). Shows charges categorized by services."
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn run(&self, _args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let client = ctx.client().await?;
        let summary = client.billing().get_billing_summary_of_bill_items().await?;
        Ok(response::list(summary, None))
    }
}

pub struct GetBillingSummaryOfSimsCommand;

#[async_trait]
impl ToolCommand for GetBillingSummaryOfSimsCommand {
    fn name(&self) -> &'static str {
        "Billing_getBillingSummaryOfSims"
    }

    fn description(&self) -> &'static str {
        "Get a billing summary of SIMs for the last 4 months (current month to 3 months ago). List of cost breakdown. The list is sorted by amount in descending order, and include up to 100 items."
    }

    fn input_schema(&self) -> Value {
        empty_schema()
    }

    async fn run(&self, _args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let client = ctx.client().await?;
        let summary = client.billing().get_billing_summary_of_sims().await?;
        Ok(response::list(summary, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_month_format() {
        let ok: YearMonthArgs = parse_args(json!({"yearMonth": "202405"})).unwrap();
        assert!(ok.validate().is_ok());

        for bad in ["2024-05", "20245", "abcdef"] {
            let args: YearMonthArgs = parse_args(json!({"yearMonth": bad})).unwrap();
            assert!(args.validate().is_err(), "{bad}");
        }
    }

    #[test]
    fn test_year_month_required() {
        assert!(parse_args::<YearMonthArgs>(json!({})).is_err());
    }
}
