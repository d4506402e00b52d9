//! Failures raised while turning a Doxygen XML file into prototypes.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractError {
    /// The input file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// quick-xml rejected the document.
    #[error("{}: XML syntax error at byte {position}: {source}", .path.display())]
    Xml {
        path: PathBuf,
        position: u64,
        source: quick_xml::Error,
    },

    /// The document is syntactically valid so far but not a complete XML tree.
    #[error("{}: malformed document: {reason}", .path.display())]
    Malformed { path: PathBuf, reason: String },

    /// An element the extractor depends on lacks a required field.
    #[error("{}: {element} #{index} has no `{field}`", .path.display())]
    DataShape {
        path: PathBuf,
        element: &'static str,
        index: usize,
        field: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ExtractError>;
