//! Parsing and validating a model reply into deferred commands.
//!
//! The reply is untrusted text. Every check failure becomes a human-readable
//! string in the error list; nothing here raises, and a malformed action never
//! invalidates its siblings.

use crate::actions::dispatch::Command;
use crate::actions::types::{
    lookup_action, DockEdge, ExpandState, UiAction, WindowState,
};
use crate::snapshot::item::SnapshotIndex;

/// Turns reply text into deferred commands plus errors.
///
/// Commands come back in reply order; the two lists are independent — partial
/// success is the norm, and the caller decides whether a non-empty error list
/// blocks execution.
pub fn extract_actions(reply: &str, index: &SnapshotIndex) -> (Vec<Command>, Vec<String>) {
    let mut commands = Vec::new();
    let mut errors = Vec::new();

    if reply.trim().is_empty() {
        errors.push("model reply is empty".to_string());
        return (commands, errors);
    }

    let document: serde_json::Value = match serde_json::from_str(reply) {
        Ok(value) => value,
        Err(e) => {
            errors.push(format!("model reply is not valid JSON: {e}"));
            return (commands, errors);
        }
    };

    let Some(root) = document.as_object() else {
        errors.push("model reply root is not a JSON object".to_string());
        return (commands, errors);
    };

    let Some(actions) = root.get("actions").and_then(|v| v.as_array()) else {
        errors.push("model reply has no \"actions\" array".to_string());
        return (commands, errors);
    };

    for (i, entry) in actions.iter().enumerate() {
        match validate_entry(i, entry, index) {
            Ok(command) => commands.push(command),
            Err(message) => errors.push(message),
        }
    }

    (commands, errors)
}

/// Runs one reply entry through the full validation ladder.
fn validate_entry(
    i: usize,
    entry: &serde_json::Value,
    index: &SnapshotIndex,
) -> Result<Command, String> {
    let Some(obj) = entry.as_object() else {
        return Err(format!("action #{i}: not a JSON object"));
    };

    let id = required_string(obj, "id").map_err(|why| format!("action #{i}: {why}"))?;
    let action_name = required_string(obj, "action").map_err(|why| format!("action #{i}: {why}"))?;
    let params = string_params(obj).map_err(|why| format!("action #{i}: {why}"))?;

    let Some(item) = index.get(id) else {
        return Err(format!("action #{i}: unknown element id \"{id}\""));
    };

    let Some(spec) = lookup_action(action_name) else {
        return Err(format!("action #{i}: unknown action \"{action_name}\""));
    };

    if !item.patterns.contains(&spec.pattern) {
        return Err(format!(
            "action #{i}: element \"{id}\" does not expose the {} pattern required by {}",
            spec.pattern.label(),
            spec.name,
        ));
    }

    if params.len() != spec.param_count {
        return Err(format!(
            "action #{i}: {} expects {} parameter(s), got {}",
            spec.name,
            spec.param_count,
            params.len(),
        ));
    }

    let action = typed_action(spec.name, &params)
        .map_err(|why| format!("action #{i}: {why}"))?;

    Ok(Command {
        item_id: id.to_string(),
        item_name: item.name.clone(),
        action,
    })
}

fn required_string<'a>(
    obj: &'a serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<&'a str, String> {
    match obj.get(field) {
        Some(value) => match value.as_str() {
            Some(s) if !s.is_empty() => Ok(s),
            Some(_) => Err(format!("\"{field}\" field is empty")),
            None => Err(format!("\"{field}\" field is not a string")),
        },
        None => Err(format!("missing \"{field}\" field")),
    }
}

fn string_params(obj: &serde_json::Map<String, serde_json::Value>) -> Result<Vec<String>, String> {
    let Some(value) = obj.get("params") else {
        return Ok(Vec::new());
    };
    let Some(array) = value.as_array() else {
        return Err("\"params\" field is not an array".to_string());
    };
    array
        .iter()
        .map(|p| {
            p.as_str()
                .map(str::to_string)
                .ok_or_else(|| "\"params\" entries must be strings".to_string())
        })
        .collect()
}

/// Maps the canonical action name plus raw parameters to a typed action.
/// Arity has already been checked; only vocabulary can still fail here.
fn typed_action(name: &'static str, params: &[String]) -> Result<UiAction, String> {
    match name {
        "ExpandOrCollapse" => ExpandState::from_param(&params[0])
            .map(|state| UiAction::ExpandOrCollapse { state })
            .ok_or_else(|| {
                format!(
                    "invalid parameter \"{}\" for ExpandOrCollapse (expected expanded or collapsed)",
                    params[0]
                )
            }),
        "Invoke" => Ok(UiAction::Invoke),
        "Toggle" => Ok(UiAction::Toggle),
        "Arrange" => DockEdge::from_param(&params[0])
            .map(|edge| UiAction::Arrange { edge })
            .ok_or_else(|| {
                format!(
                    "invalid parameter \"{}\" for Arrange (expected left, right, top, bottom or center)",
                    params[0]
                )
            }),
        "SetValue" => Ok(UiAction::SetValue { text: params[0].clone() }),
        "SetWindowVisualState" => WindowState::from_param(&params[0])
            .map(|state| UiAction::SetWindowVisualState { state })
            .ok_or_else(|| {
                format!(
                    "invalid parameter \"{}\" for SetWindowVisualState (expected maximized, minimized or normal)",
                    params[0]
                )
            }),
        "CloseWindow" => Ok(UiAction::CloseWindow),
        other => Err(format!("unknown action \"{other}\"")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::item::{IndexEntry, Pattern};
    use std::collections::BTreeSet;

    fn index_with(entries: &[(&str, &str, &[Pattern])]) -> SnapshotIndex {
        let mut index = SnapshotIndex::default();
        for (id, name, patterns) in entries {
            index.insert(
                id.to_string(),
                IndexEntry {
                    name: name.to_string(),
                    control_type: "Button".to_string(),
                    patterns: patterns.iter().copied().collect::<BTreeSet<_>>(),
                },
            );
        }
        index
    }

    #[test]
    fn empty_reply_yields_one_error() {
        let index = SnapshotIndex::default();
        let (commands, errors) = extract_actions("   \n ", &index);
        assert!(commands.is_empty());
        assert_eq!(errors, vec!["model reply is empty"]);
    }

    #[test]
    fn invalid_json_yields_one_error() {
        let index = SnapshotIndex::default();
        let (commands, errors) = extract_actions("not json {", &index);
        assert!(commands.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("model reply is not valid JSON"));
    }

    #[test]
    fn non_object_root_yields_one_error() {
        let index = SnapshotIndex::default();
        let (commands, errors) = extract_actions("[1, 2]", &index);
        assert!(commands.is_empty());
        assert_eq!(errors, vec!["model reply root is not a JSON object"]);
    }

    #[test]
    fn missing_actions_array_yields_one_error() {
        let index = SnapshotIndex::default();
        let (commands, errors) = extract_actions("{}", &index);
        assert!(commands.is_empty());
        assert_eq!(errors, vec!["model reply has no \"actions\" array"]);
    }

    #[test]
    fn valid_action_becomes_a_deferred_command() {
        let index = index_with(&[("btn_1", "Save", &[Pattern::Invoke])]);
        let (commands, errors) =
            extract_actions(r#"{"actions":[{"id":"btn_1","action":"Invoke"}]}"#, &index);
        assert!(errors.is_empty());
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].item_id, "btn_1");
        assert_eq!(commands[0].item_name, "Save");
        assert_eq!(commands[0].action, UiAction::Invoke);
    }

    #[test]
    fn action_name_matching_is_case_insensitive() {
        let index = index_with(&[("btn_1", "Save", &[Pattern::Invoke])]);
        let (commands, errors) =
            extract_actions(r#"{"actions":[{"id":"btn_1","action":"invoke"}]}"#, &index);
        assert!(errors.is_empty());
        assert_eq!(commands[0].action, UiAction::Invoke);
    }

    #[test]
    fn missing_capability_is_reported_by_name() {
        let index = index_with(&[("X", "Item", &[Pattern::Invoke])]);
        let (commands, errors) =
            extract_actions(r#"{"actions":[{"id":"X","action":"Toggle"}]}"#, &index);
        assert!(commands.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Toggle"));
        assert!(errors[0].contains("Toggle pattern"));
    }

    #[test]
    fn unknown_id_preserves_partial_success() {
        let index = index_with(&[("X", "Item", &[Pattern::Invoke])]);
        let reply = r#"{"actions":[{"id":"X","action":"Invoke"},{"id":"bad","action":"Invoke"}]}"#;
        let (commands, errors) = extract_actions(reply, &index);
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].item_id, "X");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("unknown element id \"bad\""));
    }

    #[test]
    fn arity_mismatch_is_an_error() {
        let index = index_with(&[("X", "Window", &[Pattern::Transform])]);
        let reply = r#"{"actions":[{"id":"X","action":"Arrange","params":["left","extra"]}]}"#;
        let (commands, errors) = extract_actions(reply, &index);
        assert!(commands.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("expects 1 parameter(s), got 2"));
    }

    #[test]
    fn vocabulary_is_mapped_case_insensitively() {
        let index = index_with(&[("win_1", "Editor", &[Pattern::Window])]);
        let reply = r#"{"actions":[{"id":"win_1","action":"SetWindowVisualState","params":["Maximized"]}]}"#;
        let (commands, errors) = extract_actions(reply, &index);
        assert!(errors.is_empty());
        assert_eq!(
            commands[0].action,
            UiAction::SetWindowVisualState { state: WindowState::Maximized }
        );
    }

    #[test]
    fn unmapped_vocabulary_value_is_an_error() {
        let index = index_with(&[("win_1", "Editor", &[Pattern::Window])]);
        let reply = r#"{"actions":[{"id":"win_1","action":"SetWindowVisualState","params":["fullscreen"]}]}"#;
        let (commands, errors) = extract_actions(reply, &index);
        assert!(commands.is_empty());
        assert!(errors[0].contains("invalid parameter \"fullscreen\""));
    }

    #[test]
    fn set_value_parameter_is_free_text() {
        let index = index_with(&[("edit_1", "Search", &[Pattern::Value])]);
        let reply = r#"{"actions":[{"id":"edit_1","action":"SetValue","params":["anything at all: [ok]"]}]}"#;
        let (commands, errors) = extract_actions(reply, &index);
        assert!(errors.is_empty());
        assert_eq!(
            commands[0].action,
            UiAction::SetValue { text: "anything at all: [ok]".to_string() }
        );
    }

    #[test]
    fn malformed_entries_are_isolated_with_index() {
        let index = index_with(&[("btn_1", "Save", &[Pattern::Invoke])]);
        let reply = r#"{"actions":[
            42,
            {"action":"Invoke"},
            {"id":"","action":"Invoke"},
            {"id":"btn_1","action":"Invoke","params":"left"},
            {"id":"btn_1","action":"Invoke"}
        ]}"#;
        let (commands, errors) = extract_actions(reply, &index);
        assert_eq!(commands.len(), 1);
        assert_eq!(errors.len(), 4);
        assert!(errors[0].contains("action #0"));
        assert!(errors[1].contains("missing \"id\" field"));
        assert!(errors[2].contains("\"id\" field is empty"));
        assert!(errors[3].contains("\"params\" field is not an array"));
    }
}
