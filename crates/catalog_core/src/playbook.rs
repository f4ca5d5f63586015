//! Playbook types.
//!
//! A playbook is a named, ordered list of rules. The catalog stores each
//! playbook as a generic workflow definition whose first DAG task carries
//! the rules as a serialized `rules` parameter.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Annotation carrying the human-facing playbook name.
pub const PLAYBOOK_NAME_ANNOTATION: &str = "workflows.argoproj.io/atlanName";

/// Workflow parameter carrying the serialized rule list.
pub const RULES_PARAMETER: &str = "rules";

#[derive(Debug, Clone, PartialEq)]
pub struct Playbook {
    pub name: String,
    pub rules: Vec<PlaybookRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookRule {
    pub name: String,
    #[serde(default)]
    pub config: PlaybookRuleConfig,
    #[serde(default)]
    pub actions: Vec<PlaybookAction>,
}

impl PlaybookRule {
    /// The rule's filter, unwrapped from its search-request envelope.
    ///
    /// Rules store a whole search request (`{"dsl": {"query": …}}`); a
    /// bare query is accepted too.
    pub fn match_query(&self) -> Option<&Value> {
        let query = self.config.query.as_ref()?;
        query
            .get("dsl")
            .and_then(|dsl| dsl.get("query"))
            .or(Some(query))
            .filter(|q| !q.is_null())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookRuleConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookAction {
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub actions_schema: PlaybookActionSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybookActionSchema {
    pub operand: String,
    pub operator: ActionOperator,
    #[serde(default)]
    pub value: Value,
}

/// Only `METADATA_UPDATE` is executed; anything else is kept by name so it
/// can be reported.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionType {
    MetadataUpdate,
    Other(String),
}

impl From<String> for ActionType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "METADATA_UPDATE" => ActionType::MetadataUpdate,
            _ => ActionType::Other(value),
        }
    }
}

impl From<ActionType> for String {
    fn from(value: ActionType) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionType::MetadataUpdate => f.write_str("METADATA_UPDATE"),
            ActionType::Other(name) => f.write_str(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActionOperator {
    Add,
    Remove,
    Replace,
    Unknown(String),
}

impl From<String> for ActionOperator {
    fn from(value: String) -> Self {
        match value.as_str() {
            "ADD" => ActionOperator::Add,
            "REMOVE" => ActionOperator::Remove,
            "REPLACE" => ActionOperator::Replace,
            _ => ActionOperator::Unknown(value),
        }
    }
}

impl From<ActionOperator> for String {
    fn from(value: ActionOperator) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ActionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionOperator::Add => f.write_str("ADD"),
            ActionOperator::Remove => f.write_str("REMOVE"),
            ActionOperator::Replace => f.write_str("REPLACE"),
            ActionOperator::Unknown(name) => f.write_str(name),
        }
    }
}

/// Value payload of an `owners` action. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnersValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_users: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_groups: Option<BTreeSet<String>>,
}

impl OwnersValue {
    /// `None` when the action value is not an owners object.
    pub fn from_value(value: &Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}

// ── Workflow definition envelope ──────────────────────────────

/// `_source` of one hit from the workflow search endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<WorkflowMetadata>,
    #[serde(default)]
    pub spec: WorkflowSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_metadata: Option<WorkflowMetadata>,
    #[serde(default)]
    pub templates: Vec<WorkflowTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dag: Option<WorkflowDag>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDag {
    #[serde(default)]
    pub tasks: Vec<WorkflowTask>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<WorkflowArguments>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowArguments {
    #[serde(default)]
    pub parameters: Vec<NameValuePair>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

impl WorkflowDefinition {
    /// Minimal definition carrying `rules` as the first task's parameter.
    pub fn with_rules(playbook_name: &str, rules: impl Into<Value>) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(
            PLAYBOOK_NAME_ANNOTATION.to_string(),
            playbook_name.to_string(),
        );
        Self {
            metadata: None,
            spec: WorkflowSpec {
                workflow_metadata: Some(WorkflowMetadata {
                    name: None,
                    annotations,
                }),
                templates: vec![WorkflowTemplate {
                    name: Some("main".to_string()),
                    dag: Some(WorkflowDag {
                        tasks: vec![WorkflowTask {
                            name: Some("run".to_string()),
                            arguments: Some(WorkflowArguments {
                                parameters: vec![NameValuePair {
                                    name: RULES_PARAMETER.to_string(),
                                    value: rules.into(),
                                }],
                            }),
                        }],
                    }),
                }],
            },
        }
    }

    pub fn playbook_name(&self) -> Option<&str> {
        let annotated = self
            .spec
            .workflow_metadata
            .as_ref()
            .and_then(|m| m.annotations.get(PLAYBOOK_NAME_ANNOTATION));
        annotated
            .map(String::as_str)
            .or_else(|| self.metadata.as_ref()?.name.as_deref())
    }

    /// A parameter of the first task of the first template's DAG.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.spec
            .templates
            .first()?
            .dag
            .as_ref()?
            .tasks
            .first()?
            .arguments
            .as_ref()?
            .parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn unknown_action_type_keeps_its_name() {
        let action: PlaybookAction = serde_json::from_value(json!({
            "type": "SEND_SLACK",
            "actionsSchema": {"operand": "x", "operator": "ADD", "value": null}
        }))
        .unwrap();
        assert_eq!(action.action_type, ActionType::Other("SEND_SLACK".into()));
        assert_eq!(action.action_type.to_string(), "SEND_SLACK");
    }

    #[test]
    fn operator_parses_known_and_unknown() {
        let op: ActionOperator = serde_json::from_value(json!("REPLACE")).unwrap();
        assert_eq!(op, ActionOperator::Replace);
        let op: ActionOperator = serde_json::from_value(json!("MERGE")).unwrap();
        assert_eq!(op, ActionOperator::Unknown("MERGE".into()));
    }

    #[test]
    fn match_query_unwraps_search_request() {
        let rule: PlaybookRule = serde_json::from_value(json!({
            "name": "r1",
            "config": {"query": {"dsl": {"query": {"term": {"__typeName.keyword": "Table"}}}}},
            "actions": []
        }))
        .unwrap();
        assert_eq!(
            rule.match_query(),
            Some(&json!({"term": {"__typeName.keyword": "Table"}}))
        );
    }

    #[test]
    fn owners_value_reads_either_side() {
        let owners = OwnersValue::from_value(&json!({"ownerGroups": ["admins"]})).unwrap();
        assert!(owners.owner_users.is_none());
        assert_eq!(owners.owner_groups.unwrap().len(), 1);
        assert!(OwnersValue::from_value(&json!("nope")).is_none());
    }

    #[test]
    fn workflow_definition_exposes_name_and_rules_parameter() {
        let def: WorkflowDefinition = serde_json::from_value(json!({
            "spec": {
                "workflowMetadata": {"annotations": {"workflows.argoproj.io/atlanName": "Tag PII"}},
                "templates": [{"dag": {"tasks": [{"arguments": {"parameters": [
                    {"name": "rules", "value": "[]"}
                ]}}]}}]
            }
        }))
        .unwrap();
        assert_eq!(def.playbook_name(), Some("Tag PII"));
        assert_eq!(def.parameter(RULES_PARAMETER), Some(&json!("[]")));
        assert_eq!(def.parameter("missing"), None);
    }
}
