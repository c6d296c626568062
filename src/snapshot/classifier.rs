//! Level-of-informativeness classification, strict post-order.

use crate::snapshot::item::{Classification, Item};

/// Classifies every node of the subtree in place and returns the root's tag.
///
/// Children are always resolved before their parent, and no tag is revisited.
/// Aggregation is `min` over the order `Full < Connector < None`; an empty
/// child set aggregates to `None` (a bare leaf with no name and no patterns is
/// droppable by definition).
pub fn classify(item: &mut Item) -> Classification {
    let mut aggregate = Classification::None;
    for child in &mut item.children {
        aggregate = aggregate.min(classify(child));
    }

    let resolved = if item.is_self_informative() {
        Classification::Full
    } else if aggregate == Classification::Full {
        Classification::Connector
    } else {
        aggregate
    };

    item.classification = resolved;
    resolved
}
