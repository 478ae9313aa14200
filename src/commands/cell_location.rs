use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::validator::{parse_args, require_non_empty};
use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};
use crate::api::cell_location::CellIdentifier;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchArgs {
    cell_identifiers: Vec<CellIdentifier>,
}

impl BatchArgs {
    fn validate(&self) -> Result<(), CommandError> {
        if self.cell_identifiers.is_empty() {
            return Err(CommandError::InvalidParameters(
                "At least one cell identifier is required".to_string(),
            ));
        }
        for cell in &self.cell_identifiers {
            require_non_empty("mcc", &cell.mcc)?;
            require_non_empty("mnc", &cell.mnc)?;
        }
        Ok(())
    }
}

pub struct BatchGetCellLocationsCommand;

#[async_trait]
impl ToolCommand for BatchGetCellLocationsCommand {
    fn name(&self) -> &'static str {
        "CellLocation_batchGetCellLocations"
    }

    fn description(&self) -> &'static str {
        "Get location information for multiple cell towers in batch. For 3G networks, specify MCC, MNC, LAC, and CID. For 4G/LTE networks, specify MCC, MNC, TAC, and ECID. Uses OpenCelliD Project database."
    }

    fn input_schema(&self) -> Value {
        let field = |description: &str| json!({ "type": "string", "description": description });
        json!({
            "type": "object",
            "properties": {
                "cellIdentifiers": {
                    "type": "array",
                    "description": "Array of cell identifiers to get location information for",
                    "items": {
                        "type": "object",
                        "properties": {
                            "mcc": field("Mobile Country Code (required)"),
                            "mnc": field("Mobile Network Code (required)"),
                            "lac": field("Location Area Code (for 3G networks)"),
                            "cid": field("Cell ID (for 3G networks)"),
                            "tac": field("Tracking Area Code (for 4G/LTE networks)"),
                            "ecid": field("Enhanced Cell ID (for 4G/LTE networks)"),
                            "eci": field("Enhanced Cell ID alternative (same as ecid)"),
                            "identifier": field("Optional identifier to link request to response")
                        },
                        "required": ["mcc", "mnc"]
                    },
                    "minItems": 1
                }
            },
            "required": ["cellIdentifiers"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: BatchArgs = parse_args(args)?;
        args.validate()?;

        let client = ctx.client().await?;
        let locations = client
            .cell_location()
            .batch_get_cell_locations(&args.cell_identifiers)
            .await?;

        let mut metadata = Map::new();
        metadata.insert(
            "totalCount".into(),
            json!(locations.as_array().map(Vec::len).unwrap_or(0)),
        );
        metadata.insert("requestCount".into(), json!(args.cell_identifiers.len()));
        Ok(response::success(locations, Some(metadata)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_at_least_one_cell() {
        let args: BatchArgs = parse_args(json!({"cellIdentifiers": []})).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_requires_mcc_and_mnc() {
        assert!(parse_args::<BatchArgs>(json!({"cellIdentifiers": [{"mcc": "440"}]})).is_err());

        let args: BatchArgs =
            parse_args(json!({"cellIdentifiers": [{"mcc": "440", "mnc": ""}]})).unwrap();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_optional_fields_are_omitted_downstream() {
        let args: BatchArgs = parse_args(json!({
            "cellIdentifiers": [{"mcc": "440", "mnc": "10", "tac": "5840", "ecid": "44668480"}]
        }))
        .unwrap();
        args.validate().unwrap();
        let body = serde_json::to_value(&args.cell_identifiers).unwrap();
        assert_eq!(body, json!([{"mcc": "440", "mnc": "10", "tac": "5840", "ecid": "44668480"}]));
    }
}
