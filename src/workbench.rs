//! Session lifetime: one scan, one published snapshot, wholesale replacement.
//!
//! The snapshot is immutable on publish. `rescan` builds the replacement fully
//! off to the side and then swaps a single `Arc`; readers holding the previous
//! session keep a consistent view until they drop it, so an extraction started
//! against snapshot N never observes a half-replaced index.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::actions::dispatch::{run_batch, ActionDriver, ActionOutcome, Command};
use crate::actions::protocol::extract_actions;
use crate::config::AppConfig;
use crate::errors::{UiPilotError, UiPilotResult};
use crate::snapshot::classifier::classify;
use crate::snapshot::compactor::compact;
use crate::snapshot::item::Snapshot;
use crate::snapshot::serializer::{serialize, ContextFormat};
use crate::snapshot::uia;

/// One scan's published state: classified tree, index, and the driver holding
/// the live handles. Replaced as a unit, never mutated.
pub struct Session {
    pub snapshot: Snapshot,
    pub driver: Arc<dyn ActionDriver>,
    pub scanned_at: DateTime<Utc>,
}

impl Session {
    pub fn new(mut snapshot: Snapshot, driver: Arc<dyn ActionDriver>) -> Self {
        classify(&mut snapshot.root);
        Self { snapshot, driver, scanned_at: Utc::now() }
    }

    /// Compacts and serializes the session's tree for a model prompt.
    pub fn context(&self, format: ContextFormat) -> String {
        let compacted = compact(&self.snapshot.root);
        serialize(&compacted, format)
    }

    /// Parses a model reply against this session's index.
    pub fn extract(&self, reply: &str) -> (Vec<Command>, Vec<String>) {
        extract_actions(reply, &self.snapshot.index)
    }

    /// Runs validated commands against this session's live handles.
    pub fn execute(&self, commands: &[Command]) -> Vec<ActionOutcome> {
        run_batch(commands, self.driver.as_ref())
    }
}

pub struct Workbench {
    config: AppConfig,
    current: RwLock<Option<Arc<Session>>>,
}

impl Workbench {
    pub fn new(config: AppConfig) -> Self {
        Self { config, current: RwLock::new(None) }
    }

    /// Scans the live desktop and publishes the result, replacing any previous
    /// session wholesale. All command lists extracted from the old session are
    /// implicitly invalidated — their driver is gone from the workbench.
    pub async fn rescan(&self) -> UiPilotResult<Arc<Session>> {
        let (snapshot, driver) = uia::scan_desktop(
            self.config.scan.max_depth,
            self.config.scan.max_items,
            self.config.execution.window_wait_ms,
        )
        .await?;
        Ok(self.publish(snapshot, driver).await)
    }

    /// Publishes an externally produced scan (tests, alternate providers).
    pub async fn publish(&self, snapshot: Snapshot, driver: Arc<dyn ActionDriver>) -> Arc<Session> {
        let session = Arc::new(Session::new(snapshot, driver));
        let items = session.snapshot.index.len();
        *self.current.write().await = Some(session.clone());
        tracing::info!(items, "session published");
        session
    }

    /// The currently published session, if a scan has run.
    pub async fn session(&self) -> UiPilotResult<Arc<Session>> {
        self.current
            .read()
            .await
            .clone()
            .ok_or_else(|| UiPilotError::Session("no snapshot published yet — scan first".into()))
    }

    pub async fn context(&self) -> UiPilotResult<String> {
        Ok(self.session().await?.context(self.config.context.format))
    }

    pub async fn extract(&self, reply: &str) -> UiPilotResult<(Vec<Command>, Vec<String>)> {
        Ok(self.session().await?.extract(reply))
    }

    pub async fn execute(&self, commands: &[Command]) -> UiPilotResult<Vec<ActionOutcome>> {
        Ok(self.session().await?.execute(commands))
    }

    pub fn auto_execute(&self) -> bool {
        self.config.execution.auto_execute
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::types::UiAction;
    use crate::snapshot::item::{Classification, IndexEntry, Item, Pattern, SnapshotIndex};
    use std::collections::BTreeSet;
    use std::sync::Mutex;

    struct CountingDriver {
        performed: Mutex<Vec<String>>,
    }

    impl ActionDriver for CountingDriver {
        fn perform(&self, item_id: &str, _action: &UiAction) -> UiPilotResult<()> {
            self.performed.lock().unwrap().push(item_id.to_string());
            Ok(())
        }
    }

    fn snapshot_with_button(button_id: &str) -> Snapshot {
        let button = Item {
            id: button_id.to_string(),
            control_type: "Button".to_string(),
            name: "Save".to_string(),
            automation_id: String::new(),
            class_name: String::new(),
            help_text: String::new(),
            patterns: [Pattern::Invoke].into_iter().collect::<BTreeSet<_>>(),
            facets: BTreeSet::new(),
            classification: Classification::Unknown,
            children: Vec::new(),
        };
        let root = Item {
            id: "pane_1".to_string(),
            control_type: "Pane".to_string(),
            name: "Desktop".to_string(),
            automation_id: String::new(),
            class_name: String::new(),
            help_text: String::new(),
            patterns: BTreeSet::new(),
            facets: BTreeSet::new(),
            classification: Classification::Unknown,
            children: vec![button],
        };
        let mut index = SnapshotIndex::default();
        index.insert(
            "pane_1".to_string(),
            IndexEntry {
                name: "Desktop".to_string(),
                control_type: "Pane".to_string(),
                patterns: BTreeSet::new(),
            },
        );
        index.insert(
            button_id.to_string(),
            IndexEntry {
                name: "Save".to_string(),
                control_type: "Button".to_string(),
                patterns: [Pattern::Invoke].into_iter().collect(),
            },
        );
        Snapshot { root, index }
    }

    #[tokio::test]
    async fn session_pipeline_classifies_compacts_and_extracts() {
        let workbench = Workbench::new(AppConfig::default());
        let driver = Arc::new(CountingDriver { performed: Mutex::new(Vec::new()) });
        workbench.publish(snapshot_with_button("btn_1"), driver.clone()).await;

        let context = workbench.context().await.unwrap();
        assert!(context.contains("btn_1"));

        let (commands, errors) = workbench
            .extract(r#"{"actions":[{"id":"btn_1","action":"Invoke"}]}"#)
            .await
            .unwrap();
        assert!(errors.is_empty());

        let outcomes = workbench.execute(&commands).await.unwrap();
        assert!(outcomes[0].success);
        assert_eq!(*driver.performed.lock().unwrap(), vec!["btn_1"]);
    }

    #[tokio::test]
    async fn no_session_is_a_session_error() {
        let workbench = Workbench::new(AppConfig::default());
        let err = workbench.context().await.unwrap_err();
        assert!(matches!(err, UiPilotError::Session(_)));
    }

    #[tokio::test]
    async fn publish_replaces_wholesale_but_old_session_stays_consistent() {
        let workbench = Workbench::new(AppConfig::default());
        let driver: Arc<dyn ActionDriver> =
            Arc::new(CountingDriver { performed: Mutex::new(Vec::new()) });

        let old = workbench.publish(snapshot_with_button("btn_1"), driver.clone()).await;
        workbench.publish(snapshot_with_button("btn_2"), driver).await;

        // The new session no longer resolves the old id.
        let (commands, errors) = workbench
            .extract(r#"{"actions":[{"id":"btn_1","action":"Invoke"}]}"#)
            .await
            .unwrap();
        assert!(commands.is_empty());
        assert_eq!(errors.len(), 1);

        // A reader still holding the old Arc sees the old index, not a blend.
        let (old_commands, old_errors) =
            old.extract(r#"{"actions":[{"id":"btn_1","action":"Invoke"}]}"#);
        assert_eq!(old_commands.len(), 1);
        assert!(old_errors.is_empty());
    }
}
