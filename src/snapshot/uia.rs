//! Windows UI Automation backend: the live `TreeProvider` for scanning and the
//! `ActionDriver` that invokes capability patterns at dispatch time.
//!
//! UIA interface pointers are bound to the COM apartment of the thread that
//! created them, so one dedicated thread owns the apartment, the scan, and the
//! cached element handles for the whole session; `perform` calls marshal to it
//! over a channel. The walker is not safe for concurrent traversal, so one
//! scan runs at a time. On non-Windows platforms `scan_desktop` reports the
//! backend as unavailable.

use std::sync::mpsc as std_mpsc;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::actions::dispatch::ActionDriver;
use crate::actions::types::UiAction;
use crate::errors::{UiPilotError, UiPilotResult};
use crate::snapshot::item::Snapshot;

// ── Thread-bound dispatch ───────────────────────────────────────────────────

/// One action marshalled to the thread that owns the live platform objects.
struct DispatchRequest {
    item_id: String,
    action: UiAction,
    reply: std_mpsc::Sender<UiPilotResult<()>>,
}

/// `ActionDriver` front half of a dedicated dispatch thread.
///
/// The paired thread holds the COM guard and every interface pointer; it keeps
/// its apartment alive until this handle is dropped, so no pointer ever
/// outlives the apartment it was created in.
pub struct ThreadBoundDriver {
    requests: mpsc::UnboundedSender<DispatchRequest>,
}

impl ThreadBoundDriver {
    fn channel() -> (Self, mpsc::UnboundedReceiver<DispatchRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { requests: tx }, rx)
    }
}

impl ActionDriver for ThreadBoundDriver {
    fn perform(&self, item_id: &str, action: &UiAction) -> UiPilotResult<()> {
        let (reply_tx, reply_rx) = std_mpsc::channel();
        let request = DispatchRequest {
            item_id: item_id.to_string(),
            action: action.clone(),
            reply: reply_tx,
        };
        self.requests
            .send(request)
            .map_err(|_| UiPilotError::Dispatch("dispatch thread has exited".into()))?;
        reply_rx
            .recv()
            .map_err(|_| UiPilotError::Dispatch("dispatch thread dropped the request".into()))?
    }
}

/// Serves marshalled requests until every driver handle is gone. Runs on the
/// owning thread, so `perform` may close over non-Send state (COM pointers).
fn serve_requests<F>(mut requests: mpsc::UnboundedReceiver<DispatchRequest>, mut perform: F)
where
    F: FnMut(&str, &UiAction) -> UiPilotResult<()>,
{
    while let Some(request) = requests.blocking_recv() {
        let result = perform(&request.item_id, &request.action);
        let _ = request.reply.send(result);
    }
}

// ── Windows implementation ──────────────────────────────────────────────────

#[cfg(target_os = "windows")]
mod win {
    use std::collections::{BTreeSet, HashMap};

    use windows::core::{Interface, BSTR};
    use windows::Win32::Foundation::RECT;
    use windows::Win32::System::Com::{
        CoCreateInstance, CoInitializeEx, CoUninitialize, CLSCTX_ALL, COINIT_MULTITHREADED,
    };
    use windows::Win32::UI::Accessibility::{
        CUIAutomation, IUIAutomation, IUIAutomationElement, IUIAutomationExpandCollapsePattern,
        IUIAutomationInvokePattern, IUIAutomationTogglePattern, IUIAutomationTransformPattern,
        IUIAutomationTreeWalker, IUIAutomationValuePattern, IUIAutomationWindowPattern,
        UIA_ExpandCollapsePatternId, UIA_InvokePatternId, UIA_TogglePatternId,
        UIA_TransformPatternId, UIA_ValuePatternId, UIA_WindowPatternId,
        WindowVisualState_Maximized, WindowVisualState_Minimized, WindowVisualState_Normal,
    };
    use windows::Win32::UI::WindowsAndMessaging::{GetSystemMetrics, SM_CXSCREEN, SM_CYSCREEN};

    use crate::actions::types::{DockEdge, ExpandState, UiAction, WindowState};
    use crate::errors::{UiPilotError, UiPilotResult};
    use crate::snapshot::item::{Facet, Pattern};
    use crate::snapshot::scanner::{ElementFacts, TreeProvider};

    /// RAII guard for COM initialization on the current thread.
    pub struct ComGuard;

    impl ComGuard {
        pub fn new() -> UiPilotResult<Self> {
            unsafe {
                CoInitializeEx(None, COINIT_MULTITHREADED)
                    .ok()
                    .map_err(|e| UiPilotError::Scan(format!("CoInitializeEx: {e}")))?;
            }
            Ok(Self)
        }
    }

    impl Drop for ComGuard {
        fn drop(&mut self) {
            unsafe { CoUninitialize() };
        }
    }

    pub struct UiaProvider {
        automation: IUIAutomation,
        walker: IUIAutomationTreeWalker,
        handles: HashMap<String, IUIAutomationElement>,
    }

    impl UiaProvider {
        pub fn new() -> UiPilotResult<Self> {
            let automation: IUIAutomation = unsafe {
                CoCreateInstance(&CUIAutomation, None, CLSCTX_ALL)
                    .map_err(|e| UiPilotError::Scan(format!("CoCreateInstance UIA: {e}")))?
            };
            let walker = unsafe {
                automation
                    .ControlViewWalker()
                    .map_err(|e| UiPilotError::Scan(format!("ControlViewWalker: {e}")))?
            };
            Ok(Self { automation, walker, handles: HashMap::new() })
        }

        pub fn into_executor(self, window_wait_ms: u32) -> PatternExecutor {
            PatternExecutor { handles: self.handles, window_wait_ms }
        }
    }

    impl TreeProvider for UiaProvider {
        type Node = IUIAutomationElement;

        fn root(&mut self) -> UiPilotResult<IUIAutomationElement> {
            unsafe {
                self.automation
                    .GetRootElement()
                    .map_err(|e| UiPilotError::Scan(format!("GetRootElement: {e}")))
            }
        }

        // UIA reports "no child" and "child unreachable" through the same HRESULT
        // path; both simply end the branch.
        fn first_child(&mut self, node: &IUIAutomationElement) -> UiPilotResult<Option<IUIAutomationElement>> {
            Ok(unsafe { self.walker.GetFirstChildElement(node) }.ok())
        }

        fn next_sibling(&mut self, node: &IUIAutomationElement) -> UiPilotResult<Option<IUIAutomationElement>> {
            Ok(unsafe { self.walker.GetNextSiblingElement(node) }.ok())
        }

        fn facts(&mut self, node: &IUIAutomationElement) -> UiPilotResult<ElementFacts> {
            let control_type = unsafe {
                node.CurrentControlType()
                    .map_err(|e| UiPilotError::Scan(format!("CurrentControlType: {e}")))?
            };

            let name = unsafe { node.CurrentName().unwrap_or_default().to_string() };
            let automation_id = unsafe { node.CurrentAutomationId().unwrap_or_default().to_string() };
            let class_name = unsafe { node.CurrentClassName().unwrap_or_default().to_string() };
            let help_text = unsafe { node.CurrentHelpText().unwrap_or_default().to_string() };

            let mut patterns = BTreeSet::new();
            for (id, tag) in [
                (UIA_ExpandCollapsePatternId, Pattern::ExpandCollapse),
                (UIA_InvokePatternId, Pattern::Invoke),
                (UIA_TogglePatternId, Pattern::Toggle),
                (UIA_TransformPatternId, Pattern::Transform),
                (UIA_ValuePatternId, Pattern::Value),
                (UIA_WindowPatternId, Pattern::Window),
            ] {
                if unsafe { node.GetCurrentPattern(id) }.is_ok() {
                    patterns.insert(tag);
                }
            }

            let control_type_name = control_type_name(control_type.0);
            let mut facets = BTreeSet::new();
            unsafe {
                if node.CurrentIsContentElement().map(|b| b.as_bool()).unwrap_or(false) {
                    facets.insert(Facet::Content);
                }
                if node.CurrentIsControlElement().map(|b| b.as_bool()).unwrap_or(false) {
                    facets.insert(Facet::Control);
                }
                if node.CurrentIsEnabled().map(|b| b.as_bool()).unwrap_or(false) {
                    facets.insert(Facet::Enabled);
                }
                if node.CurrentIsOffscreen().map(|b| b.as_bool()).unwrap_or(false) {
                    facets.insert(Facet::Offscreen);
                }
            }
            // Win32 dialogs use the #32770 window class.
            if control_type_name == "Window" && class_name == "#32770" {
                facets.insert(Facet::Dialog);
            }

            Ok(ElementFacts {
                control_type: control_type_name.to_string(),
                name,
                automation_id,
                class_name,
                help_text,
                patterns,
                facets,
            })
        }

        fn retain(&mut self, id: &str, node: &IUIAutomationElement) {
            self.handles.insert(id.to_string(), node.clone());
        }
    }

    /// Dispatch side of the scan: the id → live-handle relation. Compacted
    /// item copies never carry handles; every command resolves here. Lives on
    /// the dispatch thread for the session's lifetime and never crosses it.
    pub struct PatternExecutor {
        handles: HashMap<String, IUIAutomationElement>,
        window_wait_ms: u32,
    }

    impl PatternExecutor {
        fn handle(&self, item_id: &str) -> UiPilotResult<&IUIAutomationElement> {
            self.handles
                .get(item_id)
                .ok_or_else(|| UiPilotError::Dispatch(format!("no live element for id \"{item_id}\"")))
        }

        fn pattern<T: Interface>(
            &self,
            element: &IUIAutomationElement,
            id: windows::Win32::UI::Accessibility::UIA_PATTERN_ID,
            label: &str,
        ) -> UiPilotResult<T> {
            unsafe {
                element
                    .GetCurrentPattern(id)
                    .map_err(|e| UiPilotError::Dispatch(format!("{label} pattern unavailable: {e}")))?
                    .cast::<T>()
                    .map_err(|e| UiPilotError::Dispatch(format!("{label} pattern cast: {e}")))
            }
        }

        /// Bounded wait for the window to become responsive before acting.
        fn wait_responsive(&self, pattern: &IUIAutomationWindowPattern) {
            let idle = unsafe { pattern.WaitForInputIdle(self.window_wait_ms as i32) };
            if !matches!(idle.map(|b| b.as_bool()), Ok(true)) {
                tracing::warn!(wait_ms = self.window_wait_ms, "window not idle before action, proceeding anyway");
            }
        }

        fn arrange(&self, element: &IUIAutomationElement, edge: DockEdge) -> UiPilotResult<()> {
            let transform: IUIAutomationTransformPattern =
                self.pattern(element, UIA_TransformPatternId, "Transform")?;
            let rect: RECT = unsafe {
                element
                    .CurrentBoundingRectangle()
                    .map_err(|e| UiPilotError::Dispatch(format!("CurrentBoundingRectangle: {e}")))?
            };
            let width = (rect.right - rect.left) as f64;
            let height = (rect.bottom - rect.top) as f64;
            let screen_w = unsafe { GetSystemMetrics(SM_CXSCREEN) } as f64;
            let screen_h = unsafe { GetSystemMetrics(SM_CYSCREEN) } as f64;

            let (x, y) = match edge {
                DockEdge::Left => (0.0, rect.top as f64),
                DockEdge::Right => (screen_w - width, rect.top as f64),
                DockEdge::Top => (rect.left as f64, 0.0),
                DockEdge::Bottom => (rect.left as f64, screen_h - height),
                DockEdge::Center => ((screen_w - width) / 2.0, (screen_h - height) / 2.0),
            };

            unsafe {
                transform
                    .Move(x, y)
                    .map_err(|e| UiPilotError::Dispatch(format!("Transform.Move: {e}")))
            }
        }

        pub fn perform(&self, item_id: &str, action: &UiAction) -> UiPilotResult<()> {
            let element = self.handle(item_id)?;

            match action {
                UiAction::ExpandOrCollapse { state } => {
                    let pattern: IUIAutomationExpandCollapsePattern =
                        self.pattern(element, UIA_ExpandCollapsePatternId, "ExpandCollapse")?;
                    let result = match state {
                        ExpandState::Expanded => unsafe { pattern.Expand() },
                        ExpandState::Collapsed => unsafe { pattern.Collapse() },
                    };
                    result.map_err(|e| UiPilotError::Dispatch(format!("ExpandCollapse: {e}")))
                }
                UiAction::Invoke => {
                    let pattern: IUIAutomationInvokePattern =
                        self.pattern(element, UIA_InvokePatternId, "Invoke")?;
                    unsafe { pattern.Invoke() }
                        .map_err(|e| UiPilotError::Dispatch(format!("Invoke: {e}")))
                }
                UiAction::Toggle => {
                    let pattern: IUIAutomationTogglePattern =
                        self.pattern(element, UIA_TogglePatternId, "Toggle")?;
                    unsafe { pattern.Toggle() }
                        .map_err(|e| UiPilotError::Dispatch(format!("Toggle: {e}")))
                }
                UiAction::Arrange { edge } => self.arrange(element, *edge),
                UiAction::SetValue { text } => {
                    let pattern: IUIAutomationValuePattern =
                        self.pattern(element, UIA_ValuePatternId, "Value")?;
                    unsafe { pattern.SetValue(&BSTR::from(text.as_str())) }
                        .map_err(|e| UiPilotError::Dispatch(format!("SetValue: {e}")))
                }
                UiAction::SetWindowVisualState { state } => {
                    let pattern: IUIAutomationWindowPattern =
                        self.pattern(element, UIA_WindowPatternId, "Window")?;
                    self.wait_responsive(&pattern);
                    let target = match state {
                        WindowState::Maximized => WindowVisualState_Maximized,
                        WindowState::Minimized => WindowVisualState_Minimized,
                        WindowState::Normal => WindowVisualState_Normal,
                    };
                    unsafe { pattern.SetWindowVisualState(target) }
                        .map_err(|e| UiPilotError::Dispatch(format!("SetWindowVisualState: {e}")))
                }
                UiAction::CloseWindow => {
                    let pattern: IUIAutomationWindowPattern =
                        self.pattern(element, UIA_WindowPatternId, "Window")?;
                    self.wait_responsive(&pattern);
                    unsafe { pattern.Close() }
                        .map_err(|e| UiPilotError::Dispatch(format!("CloseWindow: {e}")))
                }
            }
        }
    }

    fn control_type_name(ct: i32) -> &'static str {
        // UIA_*ControlTypeId values
        match ct {
            50000 => "Button",
            50001 => "Calendar",
            50002 => "CheckBox",
            50003 => "ComboBox",
            50004 => "Edit",
            50005 => "Hyperlink",
            50006 => "Image",
            50007 => "ListItem",
            50008 => "List",
            50009 => "Menu",
            50010 => "MenuBar",
            50011 => "MenuItem",
            50012 => "ProgressBar",
            50013 => "RadioButton",
            50014 => "ScrollBar",
            50015 => "Slider",
            50016 => "Spinner",
            50017 => "StatusBar",
            50018 => "Tab",
            50019 => "TabItem",
            50020 => "Text",
            50021 => "ToolBar",
            50022 => "ToolTip",
            50023 => "Tree",
            50024 => "TreeItem",
            50025 => "Custom",
            50026 => "Group",
            50027 => "Thumb",
            50028 => "DataGrid",
            50029 => "DataItem",
            50030 => "Document",
            50031 => "SplitButton",
            50032 => "Window",
            50033 => "Pane",
            50034 => "Header",
            50035 => "HeaderItem",
            50036 => "Table",
            50037 => "TitleBar",
            50038 => "Separator",
            _ => "Unknown",
        }
    }
}

// ── Async entry point ───────────────────────────────────────────────────────

/// Spawns the session's dispatch thread, scans the live desktop on it, and
/// returns the snapshot together with the channel-backed driver. The thread
/// owns the COM apartment and the live handles; it stays up — and the
/// apartment stays initialized — until the driver is dropped.
#[cfg(target_os = "windows")]
pub async fn scan_desktop(
    max_depth: u32,
    max_items: usize,
    window_wait_ms: u32,
) -> UiPilotResult<(Snapshot, Arc<dyn ActionDriver>)> {
    let (driver, requests) = ThreadBoundDriver::channel();
    let (snapshot_tx, snapshot_rx) = tokio::sync::oneshot::channel();

    std::thread::Builder::new()
        .name("uia-dispatch".into())
        .spawn(move || {
            let _com = match win::ComGuard::new() {
                Ok(guard) => guard,
                Err(e) => {
                    let _ = snapshot_tx.send(Err(e));
                    return;
                }
            };
            let mut provider = match win::UiaProvider::new() {
                Ok(provider) => provider,
                Err(e) => {
                    let _ = snapshot_tx.send(Err(e));
                    return;
                }
            };
            let snapshot = crate::snapshot::scanner::scan(&mut provider, max_depth, max_items);
            let executor = provider.into_executor(window_wait_ms);
            if snapshot_tx.send(Ok(snapshot)).is_err() {
                return;
            }
            serve_requests(requests, |item_id, action| executor.perform(item_id, action));
        })
        .map_err(|e| UiPilotError::Scan(format!("spawn dispatch thread: {e}")))?;

    let snapshot = snapshot_rx
        .await
        .map_err(|_| UiPilotError::Scan("dispatch thread exited before scanning".into()))??;
    Ok((snapshot, Arc::new(driver)))
}

#[cfg(not(target_os = "windows"))]
pub async fn scan_desktop(
    _max_depth: u32,
    _max_items: usize,
    _window_wait_ms: u32,
) -> UiPilotResult<(Snapshot, Arc<dyn ActionDriver>)> {
    Err(UiPilotError::Scan(
        "desktop accessibility scanning is only available on Windows".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn requests_are_served_on_the_owning_thread() {
        let (driver, requests) = ThreadBoundDriver::channel();

        let worker = std::thread::spawn(move || {
            // Non-Send state stays on this thread, exactly as the live COM
            // handles do in the Windows backend.
            let log = Rc::new(RefCell::new(Vec::new()));
            let served = log.clone();
            serve_requests(requests, move |item_id, action| {
                served.borrow_mut().push(format!("{}:{}", item_id, action.name()));
                if item_id == "missing" {
                    return Err(UiPilotError::Dispatch("no live element".into()));
                }
                Ok(())
            });
            Rc::try_unwrap(log).unwrap().into_inner()
        });

        assert!(driver.perform("btn_1", &UiAction::Invoke).is_ok());
        let err = driver.perform("missing", &UiAction::Toggle).unwrap_err();
        assert!(err.to_string().contains("no live element"));

        // Dropping the driver is what lets the owning thread (and with it the
        // apartment) shut down — not the other way around.
        drop(driver);
        let log = worker.join().unwrap();
        assert_eq!(log, vec!["btn_1:Invoke", "missing:Toggle"]);
    }

    #[test]
    fn perform_after_thread_exit_is_a_dispatch_error() {
        let (driver, requests) = ThreadBoundDriver::channel();
        drop(requests);
        let err = driver.perform("btn_1", &UiAction::Invoke).unwrap_err();
        assert!(matches!(err, UiPilotError::Dispatch(_)));
    }
}
