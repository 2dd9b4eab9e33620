use netbox_core::{BranchApi, NetBoxApi, NewBranch};
use serde_json::{Map, Value, json};

use crate::dispatch::{DEFAULT_SEARCH_LIMIT, DispatchError, Dispatcher};
use crate::object_types;

#[derive(Debug)]
pub(crate) struct ToolDefinition {
    pub name: &'static str,
    pub description: String,
    pub input_schema: Value,
}

/// Why a `tools/call` did not produce a tool result.
#[derive(Debug)]
pub(crate) enum ToolCallError {
    UnknownTool(String),
    /// Arguments missing or of the wrong JSON type.
    InvalidArguments(String),
    Dispatch(DispatchError),
}

impl From<DispatchError> for ToolCallError {
    fn from(err: DispatchError) -> Self {
        ToolCallError::Dispatch(err)
    }
}

fn object_type_schema() -> Value {
    json!({
        "type": "string",
        "description": "NetBox object type (e.g. \"devices\", \"ip-addresses\")"
    })
}

fn object_id_schema(description: &str) -> Value {
    json!({ "type": "integer", "minimum": 1, "description": description })
}

pub(crate) fn tool_definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "get_objects",
            description: format!(
                "Get objects from NetBox based on their type and filters. Filters follow the NetBox API filtering options for each object type; array values become repeated query parameters.\n\nValid object_type values:\n\n{}",
                object_types::catalog_text()
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "filters": {
                        "type": "object",
                        "description": "Query filters, e.g. {\"site\": \"dc1\", \"status\": [\"active\", \"planned\"]}",
                        "additionalProperties": {
                            "type": ["string", "number", "boolean", "array", "null"]
                        }
                    }
                },
                "required": ["object_type"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "search_netbox",
            description: "Perform a global search across NetBox objects. Returns matching objects across different NetBox models.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Search string" },
                    "limit": { "type": "integer", "minimum": 1, "default": DEFAULT_SEARCH_LIMIT }
                },
                "required": ["query"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_object_by_id",
            description: "Get detailed information about a specific NetBox object by its ID.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "object_id": object_id_schema("Numeric ID of the object")
                },
                "required": ["object_type", "object_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "create_object",
            description: "Create a new object in NetBox and return it. Example data for a device: {\"name\": \"new-device\", \"device_type\": 1, \"role\": 1, \"site\": 1, \"status\": \"active\"}. For an IP address: {\"address\": \"192.168.100.1/24\", \"status\": \"active\"}.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "data": { "type": "object", "description": "Object properties to create" }
                },
                "required": ["object_type", "data"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "update_object",
            description: "Update an existing NetBox object. Only the fields present in data are changed, e.g. {\"status\": \"planned\"}.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "object_id": object_id_schema("Numeric ID of the object to update"),
                    "data": { "type": "object", "description": "Object properties to update" }
                },
                "required": ["object_type", "object_id", "data"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "delete_object",
            description: "Delete a NetBox object. Returns true when NetBox confirms the deletion with 204 No Content.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "object_id": object_id_schema("Numeric ID of the object to delete")
                },
                "required": ["object_type", "object_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "bulk_create_objects",
            description: "Create multiple NetBox objects in a single API call, e.g. [{\"address\": \"192.168.100.1/24\"}, {\"address\": \"192.168.100.2/24\"}].".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "data_list": { "type": "array", "items": { "type": "object" } }
                },
                "required": ["object_type", "data_list"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "bulk_update_objects",
            description: "Update multiple NetBox objects in a single API call. Every item MUST contain an 'id' field, e.g. [{\"id\": 1, \"status\": \"planned\"}, {\"id\": 2, \"status\": \"active\"}].".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "data_list": { "type": "array", "items": { "type": "object" } }
                },
                "required": ["object_type", "data_list"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "bulk_delete_objects",
            description: "Delete multiple NetBox objects in a single API call, e.g. [1, 2, 3].".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "object_type": object_type_schema(),
                    "id_list": { "type": "array", "items": { "type": "integer", "minimum": 1 } }
                },
                "required": ["object_type", "id_list"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "list_branches",
            description: "List NetBox branches. Always queried against the main schema.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {},
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "get_branch",
            description: "Get a NetBox branch by ID.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "branch_id": object_id_schema("Numeric ID of the branch")
                },
                "required": ["branch_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "create_branch",
            description: "Create a NetBox branch, optionally based on another branch's schema ID.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "name": { "type": "string" },
                    "description": { "type": "string", "default": "" },
                    "base_branch": {
                        "type": ["string", "null"],
                        "description": "Schema ID of the branch to base this one on"
                    }
                },
                "required": ["name"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "update_branch",
            description: "Update a NetBox branch.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "branch_id": object_id_schema("Numeric ID of the branch"),
                    "data": { "type": "object" }
                },
                "required": ["branch_id", "data"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "delete_branch",
            description: "Delete a NetBox branch.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "branch_id": object_id_schema("Numeric ID of the branch")
                },
                "required": ["branch_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "merge_branch",
            description: "Merge a branch into main, or into target_branch when given.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "branch_id": object_id_schema("Numeric ID of the branch to merge"),
                    "target_branch": {
                        "type": ["string", "null"],
                        "description": "Schema ID of the target branch"
                    }
                },
                "required": ["branch_id"],
                "additionalProperties": false
            }),
        },
        ToolDefinition {
            name: "set_active_branch",
            description: "Scope subsequent object requests to a branch schema ID. Pass null to return to main.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "branch": { "type": ["string", "null"] }
                },
                "additionalProperties": false
            }),
        },
    ]
}

pub(crate) async fn execute_tool<C>(
    dispatcher: &Dispatcher<C>,
    name: &str,
    args: &Map<String, Value>,
) -> Result<Value, ToolCallError>
where
    C: NetBoxApi + BranchApi,
{
    match name {
        "get_objects" => {
            let object_type = required_str(args, "object_type")?;
            let filters = filter_pairs(args.get("filters"))?;
            Ok(dispatcher.list_objects(object_type, &filters).await?)
        }
        "search_netbox" => {
            let query = required_str(args, "query")?;
            let limit = arg_optional_u64(args, "limit")?.unwrap_or(DEFAULT_SEARCH_LIMIT);
            Ok(dispatcher.search(query, limit).await?)
        }
        "get_object_by_id" => {
            let object_type = required_str(args, "object_type")?;
            let id = required_u64(args, "object_id")?;
            Ok(dispatcher.get_by_id(object_type, id).await?)
        }
        "create_object" => {
            let object_type = required_str(args, "object_type")?;
            let data = required_object(args, "data")?;
            Ok(dispatcher.create_object(object_type, data).await?)
        }
        "update_object" => {
            let object_type = required_str(args, "object_type")?;
            let id = required_u64(args, "object_id")?;
            let data = required_object(args, "data")?;
            Ok(dispatcher.update_object(object_type, id, data).await?)
        }
        "delete_object" => {
            let object_type = required_str(args, "object_type")?;
            let id = required_u64(args, "object_id")?;
            Ok(Value::Bool(dispatcher.delete_object(object_type, id).await?))
        }
        "bulk_create_objects" => {
            let object_type = required_str(args, "object_type")?;
            let records = required_array(args, "data_list")?;
            Ok(dispatcher.bulk_create_objects(object_type, records).await?)
        }
        "bulk_update_objects" => {
            let object_type = required_str(args, "object_type")?;
            let records = required_array(args, "data_list")?;
            Ok(dispatcher.bulk_update_objects(object_type, records).await?)
        }
        "bulk_delete_objects" => {
            let object_type = required_str(args, "object_type")?;
            let ids = required_id_list(args, "id_list")?;
            Ok(Value::Bool(dispatcher.bulk_delete_objects(object_type, &ids).await?))
        }
        "list_branches" => Ok(dispatcher.list_branches().await?),
        "get_branch" => {
            let id = required_u64(args, "branch_id")?;
            Ok(dispatcher.get_branch(id).await?)
        }
        "create_branch" => {
            let branch = NewBranch::new(required_str(args, "name")?)
                .with_description(arg_optional_string(args, "description")?.unwrap_or_default())
                .with_base_branch(arg_optional_string(args, "base_branch")?);
            Ok(dispatcher.create_branch(&branch).await?)
        }
        "update_branch" => {
            let id = required_u64(args, "branch_id")?;
            let data = required_object(args, "data")?;
            Ok(dispatcher.update_branch(id, data).await?)
        }
        "delete_branch" => {
            let id = required_u64(args, "branch_id")?;
            Ok(Value::Bool(dispatcher.delete_branch(id).await?))
        }
        "merge_branch" => {
            let id = required_u64(args, "branch_id")?;
            let target = arg_optional_string(args, "target_branch")?;
            Ok(dispatcher.merge_branch(id, target.as_deref()).await?)
        }
        "set_active_branch" => {
            let branch = arg_optional_string(args, "branch")?;
            Ok(dispatcher.set_active_branch(branch.as_deref()))
        }
        _ => Err(ToolCallError::UnknownTool(name.to_string())),
    }
}

fn invalid(message: String) -> ToolCallError {
    ToolCallError::InvalidArguments(message)
}

fn required<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a Value, ToolCallError> {
    args.get(key)
        .ok_or_else(|| invalid(format!("Missing required field '{key}'")))
}

fn required_str<'a>(args: &'a Map<String, Value>, key: &str) -> Result<&'a str, ToolCallError> {
    required(args, key)?
        .as_str()
        .ok_or_else(|| invalid(format!("'{key}' must be a string")))
}

/// NetBox ids start at 1.
fn positive_id(value: &Value) -> Option<u64> {
    value.as_u64().filter(|id| *id > 0)
}

fn required_u64(args: &Map<String, Value>, key: &str) -> Result<u64, ToolCallError> {
    positive_id(required(args, key)?)
        .ok_or_else(|| invalid(format!("'{key}' must be a positive integer")))
}

fn required_object<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a Value, ToolCallError> {
    let value = required(args, key)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(invalid(format!("'{key}' must be an object")))
    }
}

fn required_array<'a>(
    args: &'a Map<String, Value>,
    key: &str,
) -> Result<&'a [Value], ToolCallError> {
    required(args, key)?
        .as_array()
        .map(Vec::as_slice)
        .ok_or_else(|| invalid(format!("'{key}' must be an array")))
}

fn required_id_list(args: &Map<String, Value>, key: &str) -> Result<Vec<u64>, ToolCallError> {
    required_array(args, key)?
        .iter()
        .enumerate()
        .map(|(index, item)| {
            positive_id(item)
                .ok_or_else(|| invalid(format!("{key}[{index}] must be a positive integer")))
        })
        .collect()
}

fn arg_optional_u64(args: &Map<String, Value>, key: &str) -> Result<Option<u64>, ToolCallError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(Some)
            .ok_or_else(|| invalid(format!("'{key}' must be a non-negative integer"))),
    }
}

fn arg_optional_string(
    args: &Map<String, Value>,
    key: &str,
) -> Result<Option<String>, ToolCallError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(v)) => Ok(Some(v.clone())),
        Some(_) => Err(invalid(format!("'{key}' must be a string"))),
    }
}

/// Flattens a filters object into query pairs. Arrays repeat their key,
/// nulls are dropped.
fn filter_pairs(filters: Option<&Value>) -> Result<Vec<(String, String)>, ToolCallError> {
    let map = match filters {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(invalid("'filters' must be an object".to_string())),
    };

    let mut pairs = Vec::with_capacity(map.len());
    for (key, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    pairs.push((key.clone(), scalar_to_string(item, key)?));
                }
            }
            other => pairs.push((key.clone(), scalar_to_string(other, key)?)),
        }
    }
    Ok(pairs)
}

fn scalar_to_string(value: &Value, key: &str) -> Result<String, ToolCallError> {
    match value {
        Value::String(v) => Ok(v.clone()),
        Value::Number(v) => Ok(v.to_string()),
        Value::Bool(v) => Ok(v.to_string()),
        _ => Err(invalid(format!(
            "filter '{key}' values must be scalar (string/number/bool)"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubClient;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test args must be an object"),
        }
    }

    #[test]
    fn tool_names_are_unique_and_cover_object_operations() {
        let tools = tool_definitions();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name).collect();
        for expected in [
            "get_objects",
            "search_netbox",
            "get_object_by_id",
            "create_object",
            "update_object",
            "delete_object",
            "bulk_create_objects",
            "bulk_update_objects",
            "bulk_delete_objects",
        ] {
            assert!(names.contains(&expected), "missing tool {expected}");
        }
        let total = names.len();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn get_objects_description_lists_catalog() {
        let tools = tool_definitions();
        let get_objects = tools.iter().find(|t| t.name == "get_objects").unwrap();
        assert!(get_objects.description.contains("- ip-addresses"));
        assert!(get_objects.description.contains("Wireless:"));
    }

    #[test]
    fn filter_pairs_expands_arrays_and_skips_nulls() {
        let pairs = filter_pairs(Some(&json!({
            "site": "dc1",
            "status": ["active", "planned"],
            "vlan_id": 100,
            "tag": null
        })))
        .unwrap();
        assert_eq!(
            pairs,
            vec![
                ("site".to_string(), "dc1".to_string()),
                ("status".to_string(), "active".to_string()),
                ("status".to_string(), "planned".to_string()),
                ("vlan_id".to_string(), "100".to_string()),
            ]
        );
        assert!(filter_pairs(None).unwrap().is_empty());
    }

    #[test]
    fn filter_pairs_rejects_nested_values() {
        let err = filter_pairs(Some(&json!({"site": {"name": "dc1"}}))).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments(_)));
        let err = filter_pairs(Some(&json!(["site"]))).unwrap_err();
        assert!(matches!(err, ToolCallError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn string_object_id_is_an_argument_error() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!({})));
        let err = execute_tool(
            &dispatcher,
            "get_object_by_id",
            &args(json!({"object_type": "devices", "object_id": "123"})),
        )
        .await
        .unwrap_err();
        match err {
            ToolCallError::InvalidArguments(message) => assert!(message.contains("object_id")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(dispatcher.client().calls().is_empty());
    }

    #[tokio::test]
    async fn missing_and_mistyped_arguments_are_argument_errors() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!({})));
        let cases = [
            ("get_objects", json!({"filters": {}})),
            ("get_objects", json!({"object_type": 123})),
            ("get_object_by_id", json!({"object_type": "devices"})),
            ("create_object", json!({"object_type": "devices", "data": [1]})),
            ("bulk_delete_objects", json!({"object_type": "devices", "id_list": [1, "2"]})),
            ("search_netbox", json!({"query": "x", "limit": "ten"})),
            ("get_object_by_id", json!({"object_type": "devices", "object_id": 0})),
            ("delete_branch", json!({"branch_id": 0})),
            ("bulk_delete_objects", json!({"object_type": "devices", "id_list": [1, 0]})),
            ("bulk_delete_objects", json!({"object_type": "devices", "id_list": [-3]})),
        ];
        for (tool, arguments) in cases {
            let err = execute_tool(&dispatcher, tool, &args(arguments)).await.unwrap_err();
            assert!(
                matches!(err, ToolCallError::InvalidArguments(_)),
                "{tool} should reject its arguments"
            );
        }
    }

    #[tokio::test]
    async fn unknown_tool_is_reported() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!({})));
        let err = execute_tool(&dispatcher, "drop_database", &Map::new()).await.unwrap_err();
        assert!(matches!(err, ToolCallError::UnknownTool(name) if name == "drop_database"));
    }

    #[tokio::test]
    async fn search_defaults_limit_to_ten() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!([])));
        execute_tool(&dispatcher, "search_netbox", &args(json!({"query": "core"})))
            .await
            .unwrap();
        let calls = dispatcher.client().calls();
        assert_eq!(calls[0].params[1], ("limit".to_string(), "10".to_string()));
    }

    #[tokio::test]
    async fn delete_tools_return_booleans() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!(true)));
        let deleted = execute_tool(
            &dispatcher,
            "delete_object",
            &args(json!({"object_type": "devices", "object_id": 5})),
        )
        .await
        .unwrap();
        assert_eq!(deleted, json!(true));

        let deleted = execute_tool(
            &dispatcher,
            "bulk_delete_objects",
            &args(json!({"object_type": "devices", "id_list": [1, 2, 3]})),
        )
        .await
        .unwrap();
        assert_eq!(deleted, json!(true));
        assert_eq!(dispatcher.client().calls()[1].body, json!([1, 2, 3]));
    }

    #[tokio::test]
    async fn bulk_update_without_id_reaches_dispatch_validation() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!([])));
        let err = execute_tool(
            &dispatcher,
            "bulk_update_objects",
            &args(json!({"object_type": "devices", "data_list": [{"status": "planned"}]})),
        )
        .await
        .unwrap_err();
        assert!(matches!(
            err,
            ToolCallError::Dispatch(DispatchError::MissingIdentifier { index: 0 })
        ));
        assert!(dispatcher.client().calls().is_empty());
    }

    #[tokio::test]
    async fn branch_tools_route_to_branch_api() {
        let dispatcher = Dispatcher::new(StubClient::replying(json!({"id": 3})));
        execute_tool(
            &dispatcher,
            "create_branch",
            &args(json!({"name": "feature-x", "base_branch": "td5smq0f"})),
        )
        .await
        .unwrap();
        execute_tool(
            &dispatcher,
            "merge_branch",
            &args(json!({"branch_id": 3, "target_branch": null})),
        )
        .await
        .unwrap();
        let active = execute_tool(&dispatcher, "set_active_branch", &args(json!({"branch": "abc"})))
            .await
            .unwrap();
        assert_eq!(active, json!({"active_branch": "abc"}));

        let calls = dispatcher.client().calls();
        assert_eq!(calls[0].op, "create_branch");
        assert_eq!(
            calls[0].body,
            json!({"name": "feature-x", "description": "", "base_branch": "td5smq0f"})
        );
        assert_eq!(calls[1].op, "merge_branch");
        assert_eq!(calls[1].id, Some(3));
        assert_eq!(calls[1].body, json!({"target_branch": null}));
    }
}
