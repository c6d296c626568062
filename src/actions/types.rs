//! The closed action vocabulary and its capability table.
//!
//! One variant per table row: adding or removing an action is a compile-time
//! exhaustive change, never a string-table edit.

use serde::{Deserialize, Serialize};

use crate::snapshot::item::Pattern;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandState {
    Expanded,
    Collapsed,
}

impl ExpandState {
    pub fn from_param(param: &str) -> Option<Self> {
        match param.to_ascii_lowercase().as_str() {
            "expanded" => Some(ExpandState::Expanded),
            "collapsed" => Some(ExpandState::Collapsed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DockEdge {
    Left,
    Right,
    Top,
    Bottom,
    Center,
}

impl DockEdge {
    pub fn from_param(param: &str) -> Option<Self> {
        match param.to_ascii_lowercase().as_str() {
            "left" => Some(DockEdge::Left),
            "right" => Some(DockEdge::Right),
            "top" => Some(DockEdge::Top),
            "bottom" => Some(DockEdge::Bottom),
            "center" => Some(DockEdge::Center),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Maximized,
    Minimized,
    Normal,
}

impl WindowState {
    pub fn from_param(param: &str) -> Option<Self> {
        match param.to_ascii_lowercase().as_str() {
            "maximized" => Some(WindowState::Maximized),
            "minimized" => Some(WindowState::Minimized),
            "normal" => Some(WindowState::Normal),
            _ => None,
        }
    }
}

/// A fully validated, typed manipulation of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UiAction {
    ExpandOrCollapse { state: ExpandState },
    Invoke,
    Toggle,
    Arrange { edge: DockEdge },
    SetValue { text: String },
    SetWindowVisualState { state: WindowState },
    CloseWindow,
}

impl UiAction {
    /// The capability the target element must expose for this action.
    pub fn required_pattern(&self) -> Pattern {
        match self {
            UiAction::ExpandOrCollapse { .. } => Pattern::ExpandCollapse,
            UiAction::Invoke => Pattern::Invoke,
            UiAction::Toggle => Pattern::Toggle,
            UiAction::Arrange { .. } => Pattern::Transform,
            UiAction::SetValue { .. } => Pattern::Value,
            UiAction::SetWindowVisualState { .. } | UiAction::CloseWindow => Pattern::Window,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            UiAction::ExpandOrCollapse { .. } => "ExpandOrCollapse",
            UiAction::Invoke => "Invoke",
            UiAction::Toggle => "Toggle",
            UiAction::Arrange { .. } => "Arrange",
            UiAction::SetValue { .. } => "SetValue",
            UiAction::SetWindowVisualState { .. } => "SetWindowVisualState",
            UiAction::CloseWindow => "CloseWindow",
        }
    }
}

/// One row of the static capability table: what a model is allowed to request.
pub struct ActionSpec {
    pub name: &'static str,
    pub pattern: Pattern,
    pub param_count: usize,
    /// Enumerated parameter values, empty for parameterless actions and for
    /// free-text `SetValue`.
    pub vocabulary: &'static [&'static str],
}

pub const ACTION_TABLE: &[ActionSpec] = &[
    ActionSpec {
        name: "ExpandOrCollapse",
        pattern: Pattern::ExpandCollapse,
        param_count: 1,
        vocabulary: &["expanded", "collapsed"],
    },
    ActionSpec { name: "Invoke", pattern: Pattern::Invoke, param_count: 0, vocabulary: &[] },
    ActionSpec { name: "Toggle", pattern: Pattern::Toggle, param_count: 0, vocabulary: &[] },
    ActionSpec {
        name: "Arrange",
        pattern: Pattern::Transform,
        param_count: 1,
        vocabulary: &["left", "right", "top", "bottom", "center"],
    },
    ActionSpec { name: "SetValue", pattern: Pattern::Value, param_count: 1, vocabulary: &[] },
    ActionSpec {
        name: "SetWindowVisualState",
        pattern: Pattern::Window,
        param_count: 1,
        vocabulary: &["maximized", "minimized", "normal"],
    },
    ActionSpec { name: "CloseWindow", pattern: Pattern::Window, param_count: 0, vocabulary: &[] },
];

/// Case-insensitive lookup into the capability table.
pub fn lookup_action(name: &str) -> Option<&'static ActionSpec> {
    ACTION_TABLE.iter().find(|spec| spec.name.eq_ignore_ascii_case(name))
}
