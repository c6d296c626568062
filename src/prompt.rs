//! Prompt assembly for the model call.
//!
//! The instruction preamble enumerates the capability table verbatim so the
//! model only ever requests actions the protocol can validate.

use crate::actions::types::ACTION_TABLE;

/// Fixed preamble: available actions, their parameters, and the exact reply
/// shape the action protocol parses.
pub fn instruction_preamble() -> String {
    let mut out = String::from(
        "You control on-screen elements of a desktop session. Each element below \
         carries an id and the capability patterns it exposes. Reply with ONLY a \
         JSON object of this exact shape:\n\n\
         { \"actions\": [ { \"id\": \"<element id>\", \"action\": \"<name>\", \"params\": [\"...\"] } ] }\n\n\
         Available actions:\n",
    );

    for spec in ACTION_TABLE {
        out.push_str(&format!(
            "- {} (requires the {} pattern, {} parameter{})",
            spec.name,
            spec.pattern.label(),
            spec.param_count,
            if spec.param_count == 1 { "" } else { "s" },
        ));
        if !spec.vocabulary.is_empty() {
            out.push_str(&format!("; parameter must be one of: {}", spec.vocabulary.join(", ")));
        } else if spec.name == "SetValue" {
            out.push_str("; parameter is the free text to set");
        }
        out.push('\n');
    }

    out.push_str(
        "\nOnly target elements whose listed patterns include the one an action \
         requires. Omit \"params\" for parameterless actions.\n",
    );
    out
}

/// Full prompt: preamble, serialized element context, user instruction.
pub fn build_prompt(context: &str, instruction: &str) -> String {
    format!(
        "{}\n# Current screen elements\n\n{}\n# User instruction\n\n{}\n",
        instruction_preamble(),
        context,
        instruction,
    )
}
