//! Depth-first accessibility tree walk.
//!
//! The walk is deliberately forgiving: any element that cannot be read simply
//! ends its branch, and only an unreadable desktop root degrades the whole
//! scan — to a single placeholder node with an empty index, never to an error
//! returned to the caller.

use std::collections::BTreeSet;
use std::collections::HashMap;

use crate::errors::UiPilotResult;
use crate::snapshot::item::{Classification, Facet, IndexEntry, Item, Pattern, Snapshot, SnapshotIndex};

/// Attributes and capability flags of one live element, read exactly once.
#[derive(Debug, Clone, Default)]
pub struct ElementFacts {
    pub control_type: String,
    pub name: String,
    pub automation_id: String,
    pub class_name: String,
    pub help_text: String,
    pub patterns: BTreeSet<Pattern>,
    pub facets: BTreeSet<Facet>,
}

/// Access to the host's accessibility provider.
///
/// Every method may fail for any individual element at any time; the scanner
/// treats such failures as "this branch ends here". `retain` lets the platform
/// implementation keep the live handle under the issued id for later dispatch.
pub trait TreeProvider {
    type Node;

    fn root(&mut self) -> UiPilotResult<Self::Node>;
    fn first_child(&mut self, node: &Self::Node) -> UiPilotResult<Option<Self::Node>>;
    fn next_sibling(&mut self, node: &Self::Node) -> UiPilotResult<Option<Self::Node>>;
    fn facts(&mut self, node: &Self::Node) -> UiPilotResult<ElementFacts>;

    fn retain(&mut self, _id: &str, _node: &Self::Node) {}
}

/// Per-control-type counters so ids read as `btn_3` / `win_1` rather than
/// opaque numbers. Ids are unique within one snapshot and never reused.
#[derive(Default)]
struct IdAllocator {
    counters: HashMap<&'static str, u32>,
}

impl IdAllocator {
    fn next(&mut self, control_type: &str) -> String {
        let prefix = control_type_prefix(control_type);
        let count = self.counters.entry(prefix).or_insert(0);
        *count += 1;
        format!("{}_{}", prefix, count)
    }
}

fn control_type_prefix(control_type: &str) -> &'static str {
    match control_type {
        "Button" => "btn",
        "CheckBox" => "chk",
        "ComboBox" => "combo",
        "Document" => "doc",
        "Edit" => "edit",
        "Group" => "grp",
        "Hyperlink" => "link",
        "Image" => "img",
        "List" => "list",
        "ListItem" => "li",
        "Menu" | "MenuBar" => "menu",
        "MenuItem" => "mi",
        "Pane" => "pane",
        "RadioButton" => "radio",
        "Tab" => "tabs",
        "TabItem" => "tab",
        "Text" => "txt",
        "TitleBar" => "title",
        "ToolBar" => "tb",
        "Tree" => "tree",
        "TreeItem" => "ti",
        "Window" => "win",
        _ => "elem",
    }
}

/// Walks the provider's tree into an immutable snapshot.
///
/// `max_depth` bounds recursion: elements at the cutoff depth are recorded as
/// leaves without expanding their children. `max_items` is a safety cap on the
/// total number of scanned elements; once reached, open branches end where
/// they stand.
pub fn scan<P: TreeProvider>(provider: &mut P, max_depth: u32, max_items: usize) -> Snapshot {
    let mut ids = IdAllocator::default();
    let mut index = SnapshotIndex::default();

    let root_node = match provider.root() {
        Ok(node) => node,
        Err(e) => {
            tracing::warn!(error = %e, "accessibility root unreachable, producing placeholder");
            return Snapshot { root: error_placeholder(&e.to_string()), index };
        }
    };

    let root = match scan_element(provider, &root_node, 0, max_depth, max_items, &mut ids, &mut index) {
        Some(item) => item,
        None => {
            tracing::warn!("desktop root element could not be read, producing placeholder");
            return Snapshot {
                root: error_placeholder("desktop root element could not be read"),
                index: SnapshotIndex::default(),
            };
        }
    };

    tracing::debug!(indexed = index.len(), nodes = root.node_count(), "accessibility scan complete");
    Snapshot { root, index }
}

/// Reads one element and recurses into its children. Returns `None` when the
/// element itself is unreadable — the caller then simply ends the branch.
fn scan_element<P: TreeProvider>(
    provider: &mut P,
    node: &P::Node,
    depth: u32,
    max_depth: u32,
    max_items: usize,
    ids: &mut IdAllocator,
    index: &mut SnapshotIndex,
) -> Option<Item> {
    if index.len() >= max_items {
        return None;
    }

    let facts = match provider.facts(node) {
        Ok(facts) => facts,
        Err(e) => {
            tracing::trace!(depth, error = %e, "element unreadable, branch ends");
            return None;
        }
    };

    let id = ids.next(&facts.control_type);
    provider.retain(&id, node);
    index.insert(
        id.clone(),
        IndexEntry {
            name: facts.name.clone(),
            control_type: facts.control_type.clone(),
            patterns: facts.patterns.clone(),
        },
    );

    let mut item = Item {
        id,
        control_type: facts.control_type,
        name: facts.name,
        automation_id: facts.automation_id,
        class_name: facts.class_name,
        help_text: facts.help_text,
        patterns: facts.patterns,
        facets: facts.facets,
        classification: Classification::Unknown,
        children: Vec::new(),
    };

    if depth < max_depth {
        scan_children(provider, node, depth, max_depth, max_items, ids, index, &mut item.children);
    }

    Some(item)
}

fn scan_children<P: TreeProvider>(
    provider: &mut P,
    parent: &P::Node,
    depth: u32,
    max_depth: u32,
    max_items: usize,
    ids: &mut IdAllocator,
    index: &mut SnapshotIndex,
    out: &mut Vec<Item>,
) {
    if index.len() >= max_items {
        return;
    }

    let mut current = match provider.first_child(parent) {
        Ok(Some(child)) => child,
        Ok(None) => return,
        Err(e) => {
            tracing::trace!(depth, error = %e, "first child unreadable, branch ends");
            return;
        }
    };

    loop {
        if let Some(item) = scan_element(provider, &current, depth + 1, max_depth, max_items, ids, index) {
            out.push(item);
        }

        // Once the cap is hit, stop issuing provider calls for the rest of
        // the sibling chain too.
        if index.len() >= max_items {
            break;
        }

        current = match provider.next_sibling(&current) {
            Ok(Some(next)) => next,
            Ok(None) => break,
            Err(e) => {
                tracing::trace!(depth, error = %e, "sibling link unreadable, branch ends");
                break;
            }
        };
    }
}

fn error_placeholder(detail: &str) -> Item {
    Item {
        id: "scan_error".to_string(),
        control_type: "ScanError".to_string(),
        name: format!("accessibility scan failed: {detail}"),
        automation_id: String::new(),
        class_name: String::new(),
        help_text: String::new(),
        patterns: BTreeSet::new(),
        facets: BTreeSet::new(),
        classification: Classification::Unknown,
        children: Vec::new(),
    }
}
