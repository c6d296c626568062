//! Deferred commands and batch execution.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::actions::types::UiAction;
use crate::errors::UiPilotResult;

/// Performs a validated action against the live element behind an id.
///
/// The platform implementation resolves the handle through the relation built
/// at scan time (`snapshot::uia`); nothing above this trait ever touches a
/// live element directly.
pub trait ActionDriver: Send + Sync {
    fn perform(&self, item_id: &str, action: &UiAction) -> UiPilotResult<()>;
}

/// A validated action bound to a specific element, not yet executed.
/// Built at parse time, run later on the caller's trigger (confirmation or
/// auto-execute).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub item_id: String,
    /// Element name captured at validation time, for confirmation UIs and logs.
    pub item_name: String,
    pub action: UiAction,
}

impl Command {
    /// Short human-readable summary, e.g. `Invoke on "Save" (btn_3)`.
    pub fn describe(&self) -> String {
        if self.item_name.is_empty() {
            format!("{} on {}", self.action.name(), self.item_id)
        } else {
            format!("{} on \"{}\" ({})", self.action.name(), self.item_name, self.item_id)
        }
    }
}

/// Result of one executed command. Failures are recorded here as well as
/// logged; a failed command never stops the rest of the batch.
#[derive(Debug, Clone, Serialize)]
pub struct ActionOutcome {
    pub command: Command,
    pub success: bool,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Runs the batch in list order against the driver, isolating failures per
/// command.
pub fn run_batch(commands: &[Command], driver: &dyn ActionDriver) -> Vec<ActionOutcome> {
    commands
        .iter()
        .map(|command| match driver.perform(&command.item_id, &command.action) {
            Ok(()) => {
                tracing::info!(target = %command.describe(), "action dispatched");
                ActionOutcome {
                    command: command.clone(),
                    success: true,
                    error: None,
                    timestamp: Utc::now(),
                }
            }
            Err(e) => {
                tracing::warn!(target = %command.describe(), error = %e, "action dispatch failed");
                ActionOutcome {
                    command: command.clone(),
                    success: false,
                    error: Some(e.to_string()),
                    timestamp: Utc::now(),
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UiPilotError;
    use std::sync::Mutex;

    /// Records performed actions; fails on a designated id.
    struct RecordingDriver {
        fail_on: &'static str,
        performed: Mutex<Vec<String>>,
    }

    impl ActionDriver for RecordingDriver {
        fn perform(&self, item_id: &str, action: &UiAction) -> UiPilotResult<()> {
            self.performed.lock().unwrap().push(format!("{}:{}", item_id, action.name()));
            if item_id == self.fail_on {
                return Err(UiPilotError::Dispatch("element not responding".into()));
            }
            Ok(())
        }
    }

    fn command(id: &str, action: UiAction) -> Command {
        Command { item_id: id.to_string(), item_name: String::new(), action }
    }

    #[test]
    fn failures_do_not_stop_the_batch() {
        let driver = RecordingDriver { fail_on: "btn_2", performed: Mutex::new(Vec::new()) };
        let commands = vec![
            command("btn_1", UiAction::Invoke),
            command("btn_2", UiAction::Toggle),
            command("btn_3", UiAction::Invoke),
        ];

        let outcomes = run_batch(&commands, &driver);

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[1].error.as_deref().unwrap().contains("element not responding"));
        assert!(outcomes[2].success);
        assert_eq!(
            *driver.performed.lock().unwrap(),
            vec!["btn_1:Invoke", "btn_2:Toggle", "btn_3:Invoke"]
        );
    }

    #[test]
    fn describe_includes_name_when_present() {
        let mut cmd = command("btn_1", UiAction::Invoke);
        assert_eq!(cmd.describe(), "Invoke on btn_1");
        cmd.item_name = "Save".to_string();
        assert_eq!(cmd.describe(), "Invoke on \"Save\" (btn_1)");
    }
}
