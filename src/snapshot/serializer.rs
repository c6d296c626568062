//! Rendering a snapshot (full or compacted) into model-prompt text.
//!
//! One-way: nothing ever parses this back. Both formats carry the same logical
//! fields (id, controlType, name, automationId, className, availablePatterns,
//! properties, children); the compact format swaps verbose names for
//! single-letter keys and prepends a legend so the model can still read it.
//! Empty fields are omitted outright and set-valued fields render inline, to
//! keep the token count down. Output is byte-stable for identical input: field
//! order is fixed and pattern/facet sets iterate in `BTreeSet` order.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::snapshot::item::Item;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ContextFormat {
    #[default]
    Tagged,
    Compact,
}

const COMPACT_LEGEND: &str =
    "# key: i=id ct=controlType n=name ai=automationId cn=className ap=availablePatterns p=properties c=children\n";

struct FieldNames {
    id: &'static str,
    control_type: &'static str,
    name: &'static str,
    automation_id: &'static str,
    class_name: &'static str,
    patterns: &'static str,
    properties: &'static str,
    children: &'static str,
}

const TAGGED: FieldNames = FieldNames {
    id: "id",
    control_type: "controlType",
    name: "name",
    automation_id: "automationId",
    class_name: "className",
    patterns: "availablePatterns",
    properties: "properties",
    children: "children",
};

const COMPACT: FieldNames = FieldNames {
    id: "i",
    control_type: "ct",
    name: "n",
    automation_id: "ai",
    class_name: "cn",
    patterns: "ap",
    properties: "p",
    children: "c",
};

/// Renders `root` and its whole subtree in the requested format.
pub fn serialize(root: &Item, format: ContextFormat) -> String {
    let (names, mut out) = match format {
        ContextFormat::Tagged => (&TAGGED, String::new()),
        ContextFormat::Compact => (&COMPACT, COMPACT_LEGEND.to_string()),
    };
    write_item(root, names, 0, &mut out);
    out
}

fn write_item(item: &Item, names: &FieldNames, indent: usize, out: &mut String) {
    let pad = " ".repeat(indent);
    let _ = writeln!(out, "{pad}- {}: {}", names.id, scalar(&item.id));

    let field_pad = format!("{pad}  ");
    write_scalar_field(out, &field_pad, names.control_type, &item.control_type);
    write_scalar_field(out, &field_pad, names.name, &item.name);
    write_scalar_field(out, &field_pad, names.automation_id, &item.automation_id);
    write_scalar_field(out, &field_pad, names.class_name, &item.class_name);

    if !item.patterns.is_empty() {
        let tags: Vec<&str> = item.patterns.iter().map(|p| p.label()).collect();
        let _ = writeln!(out, "{field_pad}{}: [{}]", names.patterns, tags.join(", "));
    }
    if !item.facets.is_empty() {
        let tags: Vec<&str> = item.facets.iter().map(|f| f.label()).collect();
        let _ = writeln!(out, "{field_pad}{}: [{}]", names.properties, tags.join(", "));
    }

    if !item.children.is_empty() {
        let _ = writeln!(out, "{field_pad}{}:", names.children);
        for child in &item.children {
            write_item(child, names, indent + 4, out);
        }
    }
}

fn write_scalar_field(out: &mut String, pad: &str, key: &str, value: &str) {
    if !value.is_empty() {
        let _ = writeln!(out, "{pad}{key}: {}", scalar(value));
    }
}

/// Quotes a scalar only when it would otherwise be ambiguous to read back
/// visually (structural punctuation, line breaks, edge whitespace).
fn scalar(value: &str) -> String {
    let needs_quoting = value.starts_with(char::is_whitespace)
        || value.ends_with(char::is_whitespace)
        || value.contains(['\n', '\r', ':', '#', '"', '[', ']', '{', '}', ',']);
    if !needs_quoting {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\r', "")
        .replace('\n', "\\n");
    format!("\"{escaped}\"")
}
