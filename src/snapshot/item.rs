use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// Capability patterns an element can expose. Closed set: each pattern gates
/// exactly the actions listed in the capability table (`actions::types`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Pattern {
    ExpandCollapse,
    Invoke,
    Toggle,
    Transform,
    Value,
    Window,
}

impl Pattern {
    pub fn label(&self) -> &'static str {
        match self {
            Pattern::ExpandCollapse => "ExpandCollapse",
            Pattern::Invoke => "Invoke",
            Pattern::Toggle => "Toggle",
            Pattern::Transform => "Transform",
            Pattern::Value => "Value",
            Pattern::Window => "Window",
        }
    }
}

/// Boolean facets read once at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    Content,
    Control,
    Dialog,
    Enabled,
    Offscreen,
}

impl Facet {
    pub fn label(&self) -> &'static str {
        match self {
            Facet::Content => "content",
            Facet::Control => "control",
            Facet::Dialog => "dialog",
            Facet::Enabled => "enabled",
            Facet::Offscreen => "offscreen",
        }
    }
}

/// Level-of-informativeness tag assigned by the classifier.
///
/// The derived order (`Full < Connector < None < Unknown`) is what the
/// classifier's child aggregation relies on: `min` over children picks the most
/// informative classification present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// Carries information on its own (name or capability patterns).
    Full,
    /// Nothing of its own, but needed to reach Full descendants.
    Connector,
    /// Droppable: neither the node nor its subtree carries anything.
    None,
    /// Not yet visited by the classifier.
    #[default]
    Unknown,
}

/// One node of an accessibility snapshot.
///
/// All string attributes are read exactly once from the live element during the
/// scan and never change afterwards. Compacted copies share the `id`; the live
/// platform handle is never stored here — it stays with the scan-time driver,
/// keyed by `id` (see `snapshot::uia`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub control_type: String,
    pub name: String,
    pub automation_id: String,
    pub class_name: String,
    pub help_text: String,
    pub patterns: BTreeSet<Pattern>,
    pub facets: BTreeSet<Facet>,
    pub classification: Classification,
    pub children: Vec<Item>,
}

impl Item {
    /// True when the node is worth showing a model regardless of its subtree.
    pub fn is_self_informative(&self) -> bool {
        !self.name.is_empty() || !self.patterns.is_empty()
    }

    /// Metadata copy with a replacement child list. Used by the compactor;
    /// the `id` is carried over so the copy still resolves through the index.
    pub(crate) fn with_children(&self, children: Vec<Item>) -> Item {
        Item {
            id: self.id.clone(),
            control_type: self.control_type.clone(),
            name: self.name.clone(),
            automation_id: self.automation_id.clone(),
            class_name: self.class_name.clone(),
            help_text: self.help_text.clone(),
            patterns: self.patterns.clone(),
            facets: self.facets.clone(),
            classification: self.classification,
            children,
        }
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Item::node_count).sum::<usize>()
    }
}

/// What the protocol needs to know about a scanned element: enough to validate
/// a requested action and to describe the target to a human.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    pub control_type: String,
    pub patterns: BTreeSet<Pattern>,
}

/// Id-keyed lookup over one snapshot. Rebuilt wholesale on every scan; never
/// partially updated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotIndex {
    entries: HashMap<String, IndexEntry>,
}

impl SnapshotIndex {
    pub fn insert(&mut self, id: String, entry: IndexEntry) {
        self.entries.insert(id, entry);
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One scan's immutable result: the full tree plus its id index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub root: Item,
    pub index: SnapshotIndex,
}
