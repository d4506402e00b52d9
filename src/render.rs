//! Breathe reStructuredText output.

use crate::model::Prototype;
use std::io::{self, Write};

/// Breathe project the directives point at unless overridden.
pub const DEFAULT_PROJECT: &str = "AVX_CPP";

const DIRECTIVE: &str = ".. doxygenfunction::";

/// Format one prototype as a two-line `doxygenfunction` block.
///
/// The argument list is appended only when it is more than `()`, so Breathe
/// resolves unambiguous names without a signature.
pub fn directive(proto: &Prototype, project: &str) -> String {
    let signature = if proto.arguments.chars().count() > 2 {
        proto.arguments.as_str()
    } else {
        ""
    };
    format!("{DIRECTIVE} {}{signature}\n  :project: {project}\n", proto.name)
}

/// Write every directive to `out` in order.
pub fn render<W: Write>(prototypes: &[Prototype], project: &str, out: &mut W) -> io::Result<()> {
    for proto in prototypes {
        out.write_all(directive(proto, project).as_bytes())?;
    }
    out.flush()
}
