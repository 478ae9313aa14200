use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::validator::{page_limit, parse_args, require_non_empty, MAX_GROUP_LIST_LIMIT};
use super::{response, CallToolResult, CommandContext, CommandError, ToolCommand};
use crate::api::group::ListGroupsParams;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TagMatchMode {
    Exact,
    Prefix,
}

impl TagMatchMode {
    fn as_str(self) -> &'static str {
        match self {
            TagMatchMode::Exact => "exact",
            TagMatchMode::Prefix => "prefix",
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListGroupsArgs {
    tag_name: Option<String>,
    tag_value: Option<String>,
    tag_value_match_mode: Option<TagMatchMode>,
    limit: Option<u32>,
    #[serde(rename = "lastEvaluatedKey")]
    last_evaluated_key: Option<String>,
}

impl ListGroupsArgs {
    fn into_params(self) -> Result<ListGroupsParams, CommandError> {
        Ok(ListGroupsParams {
            limit: Some(page_limit(self.limit, Some(MAX_GROUP_LIST_LIMIT))?),
            tag_name: self.tag_name,
            tag_value: self.tag_value,
            tag_value_match_mode: self.tag_value_match_mode.map(|m| m.as_str().to_string()),
            last_evaluated_key: self.last_evaluated_key,
        })
    }
}

pub struct ListGroupsCommand;

#[async_trait]
impl ToolCommand for ListGroupsCommand {
    fn name(&self) -> &'static str {
        "Group_listGroups"
    }

    fn description(&self) -> &'static str {
        "Return a list of groups"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "tag_name": {
                    "type": "string",
                    "description": "Tag name of the group. Filters through all groups that exactly match the tag name. When tag_name is specified, tag_value is required"
                },
                "tag_value": {
                    "type": "string",
                    "description": "Tag value of the groups"
                },
                "tag_value_match_mode": {
                    "type": "string",
                    "enum": ["exact", "prefix"],
                    "description": "Search criteria for tag strings (exact or prefix, default: exact)"
                },
                "limit": {
                    "type": "number",
                    "description": "Maximum number of results per response page (default: 10)"
                },
                "lastEvaluatedKey": {
                    "type": "string",
                    "description": "The last Group ID retrieved on the current page. Specify this to continue from the next group onward"
                }
            }
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let params = parse_args::<ListGroupsArgs>(args)?.into_params()?;

        let client = ctx.client().await?;
        let groups = client.group().list_groups(&params).await?;

        let total = groups.as_array().map(Vec::len).unwrap_or(0);
        let mut metadata = Map::new();
        metadata.insert("totalCount".into(), json!(total));
        metadata.insert(
            "hasMore".into(),
            json!(params.limit.is_some_and(|limit| total == limit as usize)),
        );
        Ok(response::list(groups, Some(metadata)))
    }
}

#[derive(Debug, Deserialize)]
struct GroupIdArgs {
    group_id: String,
}

pub struct GetGroupCommand;

#[async_trait]
impl ToolCommand for GetGroupCommand {
    fn name(&self) -> &'static str {
        "Group_getGroup"
    }

    fn description(&self) -> &'static str {
        "Get information about a specific group"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "group_id": {
                    "type": "string",
                    "description": "ID of the target Group"
                }
            },
            "required": ["group_id"]
        })
    }

    async fn run(&self, args: Value, ctx: &CommandContext<'_>) -> Result<CallToolResult, CommandError> {
        let args: GroupIdArgs = parse_args(args)?;
        require_non_empty("group_id", &args.group_id)?;

        let client = ctx.client().await?;
        let group = client.group().get_group(&args.group_id).await?;
        Ok(response::success(group, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_groups_defaults() {
        let params = parse_args::<ListGroupsArgs>(json!({})).unwrap().into_params().unwrap();
        assert_eq!(params.limit, Some(10));
        assert!(params.tag_name.is_none());
    }

    #[test]
    fn test_list_groups_tag_filter() {
        let params = parse_args::<ListGroupsArgs>(json!({
            "tag_name": "env",
            "tag_value": "prod",
            "tag_value_match_mode": "prefix",
            "lastEvaluatedKey": "g-9"
        }))
        .unwrap()
        .into_params()
        .unwrap();
        assert_eq!(params.tag_value_match_mode.as_deref(), Some("prefix"));
        assert_eq!(params.last_evaluated_key.as_deref(), Some("g-9"));
    }

    #[test]
    fn test_list_groups_limit_bounds() {
        for bad in [json!({"limit": 0}), json!({"limit": 101}), json!({"tag_value_match_mode": "suffix"})] {
            let result = parse_args::<ListGroupsArgs>(bad).and_then(ListGroupsArgs::into_params);
            assert!(result.is_err());
        }
    }
}
