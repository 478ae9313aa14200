use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::validator::{page_limit, parse_args, MAX_SIM_SEARCH_LIMIT};
use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};
use crate::api::query::SearchSimsParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum SearchType {
    And,
    Or,
}

impl SearchType {
    fn as_str(self) -> &'static str {
        match self {
            SearchType::And => "and",
            SearchType::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum SessionStatus {
    Na,
    Online,
    Offline,
}

impl SessionStatus {
    fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Na => "NA",
            SessionStatus::Online => "ONLINE",
            SessionStatus::Offline => "OFFLINE",
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SearchSimsArgs {
    #[serde(rename = "searchTerm")]
    search_term: Option<String>,
    name: Option<String>,
    group: Option<String>,
    group_id: Option<String>,
    sim_id: Option<String>,
    imsi: Option<String>,
    msisdn: Option<String>,
    iccid: Option<String>,
    serial_number: Option<String>,
    tag: Option<String>,
    status: Option<String>,
    session_status: Option<SessionStatus>,
    subscription: Option<String>,
    module_type: Option<String>,
    bundles: Option<String>,
    search_type: Option<SearchType>,
    limit: Option<u32>,
    last_evaluated_key: Option<String>,
}

fn present(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

impl SearchSimsArgs {
    fn specific_fields(&self) -> usize {
        [
            &self.name,
            &self.group,
            &self.group_id,
            &self.sim_id,
            &self.imsi,
            &self.msisdn,
            &self.iccid,
            &self.serial_number,
            &self.tag,
            &self.status,
            &self.subscription,
            &self.module_type,
            &self.bundles,
        ]
        .iter()
        .filter(|v| present(v).is_some())
        .count()
            + usize::from(self.session_status.is_some())
    }

    /// A bare `searchTerm` fans out across the identifying fields with OR.
    /// Two or more specific fields default to AND.
    fn into_params(self) -> Result<SearchSimsParams, CommandError> {
        let specific = self.specific_fields();
        let limit = Some(page_limit(self.limit, Some(MAX_SIM_SEARCH_LIMIT))?);
        let last_evaluated_key = present(&self.last_evaluated_key);

        let mut params = match present(&self.search_term) {
            Some(term) if specific == 0 => SearchSimsParams {
                name: Some(term.clone()),
                group: Some(term.clone()),
                imsi: Some(term.clone()),
                msisdn: Some(term.clone()),
                iccid: Some(term.clone()),
                serial_number: Some(term.clone()),
                sim_id: Some(term.clone()),
                tag: Some(term),
                search_type: Some(SearchType::Or.as_str().to_string()),
                ..Default::default()
            },
            _ => SearchSimsParams {
                name: present(&self.name),
                group: present(&self.group),
                group_id: present(&self.group_id),
                sim_id: present(&self.sim_id),
                imsi: present(&self.imsi),
                msisdn: present(&self.msisdn),
                iccid: present(&self.iccid),
                serial_number: present(&self.serial_number),
                tag: present(&self.tag),
                status: present(&self.status),
                session_status: self.session_status.map(|s| s.as_str().to_string()),
                subscription: present(&self.subscription),
                module_type: present(&self.module_type),
                bundles: present(&self.bundles),
                ..Default::default()
            },
        };

        if let Some(search_type) = self.search_type {
            params.search_type = Some(search_type.as_str().to_string());
        } else if specific > 1 && params.search_type.is_none() {
            params.search_type = Some(SearchType::And.as_str().to_string());
        }

        params.limit = limit;
        params.last_evaluated_key = last_evaluated_key;
        Ok(params)
    }
}

pub struct SearchSimsCommand;

#[async_trait]
impl ToolCommand for SearchSimsCommand {
    fn name(&self) -> &'static str {
        "Query_searchSims"
    }

    fn description(&self) -> &'static str {
        "Search for IoT SIM cards using flexible criteria. Use \"searchTerm\" for general search across all fields (name, ICCID, IMSI, etc.) or use specific field parameters for targeted search. Supports AND/OR logic."
    }

    fn input_schema(&self) -> Value {
        let text = |description: &str| json!({ "type": "string", "description": description });
        json!({
            "type": "object",
            "properties": {
                "searchTerm": text("Searches name, group, imsi, msisdn, iccid, serial_number, sim_id and tag at once. Use when the field is unknown"),
                "name": text("SIM name"),
                "group": text("Group name"),
                "group_id": text("Group ID"),
                "sim_id": text("SIM ID"),
                "imsi": text("IMSI"),
                "msisdn": text("MSISDN"),
                "iccid": text("ICCID"),
                "serial_number": text("Serial number"),
                "tag": text("Tag value"),
                "status": text("SIM status (e.g. active, inactive, suspended)"),
                "session_status": {
                    "type": "string",
                    "enum": ["NA", "ONLINE", "OFFLINE"],
                    "description": "Session status"
                },
                "subscription": text("Subscription (e.g. plan-D)"),
                "module_type": text("Module type"),
                "bundles": text("Bundle type"),
                "search_type": {
                    "type": "string",
                    "enum": ["and", "or"],
                    "description": "Search condition type. Defaults to \"and\" for multiple specific fields, \"or\" for searchTerm"
                },
                "limit": {
                    "type": "number",
                    "minimum": 1,
                    "maximum": MAX_SIM_SEARCH_LIMIT,
                    "description": "Maximum number of SIMs to return (default: 10)"
                },
                "last_evaluated_key": text("SIM ID of the last SIM on the previous page")
            }
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let params = parse_args::<SearchSimsArgs>(args)?.into_params()?;

        let client = ctx.client().await?;
        let sims = client.query().search_sims(&params).await?;

        let total = sims.as_array().map(Vec::len).unwrap_or(0);
        let mut metadata = Map::new();
        metadata.insert("totalCount".into(), json!(total));
        metadata.insert(
            "hasMore".into(),
            json!(params.limit.is_some_and(|limit| total == limit as usize)),
        );
        metadata.insert(
            "searchType".into(),
            json!(params.search_type.as_deref().unwrap_or("and")),
        );
        Ok(response::success(sims, Some(metadata)))
    }
}
