//! Turn parsed members into directive-ready prototypes.

use crate::model::{CompoundDocument, MemberDecl, Prototype};

/// Namespace every exported symbol is expected to live in.
pub const DEFAULT_NAMESPACE: &str = "avx::";

/// Build one prototype per member, sections in document order.
pub fn extract(doc: &CompoundDocument, namespace: &str) -> Vec<Prototype> {
    doc.sections
        .iter()
        .flat_map(|section| &section.members)
        .map(|member| normalize(member, namespace))
        .collect()
}

pub fn normalize(member: &MemberDecl, namespace: &str) -> Prototype {
    let name = &member.definition[name_start(&member.definition, namespace)..];
    if !member.definition.contains(namespace) {
        tracing::warn!(
            definition = %member.definition,
            namespace,
            "namespace prefix not found, keeping last character"
        );
    }
    let arguments = &member.argsstring[..signature_end(&member.argsstring)];
    Prototype {
        name: name.to_string(),
        arguments: arguments.to_string(),
    }
}

/// Byte offset where the qualified name begins.
///
/// When `namespace` does not occur, this falls back to the offset of the
/// last character, so the name collapses to that single character (or to
/// nothing for an empty definition). Existing output depends on this; change
/// it only together with `unmatched_namespace_keeps_last_char`.
pub fn name_start(definition: &str, namespace: &str) -> usize {
    definition
        .find(namespace)
        .unwrap_or_else(|| definition.char_indices().last().map_or(0, |(i, _)| i))
}

/// Byte offset just past the first `)`, or 0 when there is none.
pub fn signature_end(argsstring: &str) -> usize {
    argsstring.find(')').map_or(0, |i| i + 1)
}
