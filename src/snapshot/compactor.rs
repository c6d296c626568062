//! Tree compaction: drop `None` subtrees, splice `Connector` children upward.
//!
//! Precondition: the tree has been classified. Copies carry metadata only and
//! keep the original ids, so compacted nodes still resolve through the scan
//! index when a command targets them.

use crate::snapshot::item::{Classification, Item};

/// Derives the compact tree. The root is always retained as the single anchor,
/// whatever its own classification; everything below follows the flatten rule.
pub fn compact(root: &Item) -> Item {
    let children = flatten_children(root);
    root.with_children(children)
}

fn flatten_children(node: &Item) -> Vec<Item> {
    let mut out = Vec::new();
    for child in &node.children {
        flatten(child, &mut out);
    }
    out
}

/// Appends the compacted rendering of `node` to `out`, preserving reading
/// order: a Full node contributes itself, a Connector contributes its
/// flattened children in place, a None node contributes nothing.
fn flatten(node: &Item, out: &mut Vec<Item>) {
    match node.classification {
        Classification::None => {}
        Classification::Connector => {
            for child in &node.children {
                flatten(child, out);
            }
        }
        Classification::Full | Classification::Unknown => {
            out.push(node.with_children(flatten_children(node)));
        }
    }
}
