//! Data model for a parsed Doxygen compound file.

/// Section kinds Doxygen emits that this tool knows by name.
pub const RECOGNIZED_KINDS: &[&str] = &[
    "public-type",
    "private-attrib",
    "public-static-attrib",
    "private-static-func",
    "public-func",
    "friend",
];

/// Section kinds exported when no `--kind` is given.
pub const DEFAULT_EXPORTED_KINDS: &[&str] = &["public-func", "friend"];

/// Allow-list of `sectiondef` kinds whose members are exported.
#[derive(Debug, Clone)]
pub struct KindFilter {
    kinds: Vec<String>,
}

impl KindFilter {
    pub fn new<I, S>(kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            kinds: kinds.into_iter().map(Into::into).collect(),
        }
    }

    pub fn allows(&self, kind: &str) -> bool {
        self.kinds.iter().any(|k| k == kind)
    }
}

impl Default for KindFilter {
    fn default() -> Self {
        Self::new(DEFAULT_EXPORTED_KINDS.iter().copied())
    }
}

/// The exported part of one Doxygen XML file.
#[derive(Debug, Default)]
pub struct CompoundDocument {
    /// Allow-listed sections across all compound definitions, in document order.
    pub sections: Vec<Section>,
}

impl CompoundDocument {
    pub fn member_count(&self) -> usize {
        self.sections.iter().map(|s| s.members.len()).sum()
    }
}

/// A `sectiondef` element.
#[derive(Debug)]
pub struct Section {
    pub kind: String,
    pub members: Vec<MemberDecl>,
}

/// A `memberdef` whose `definition` and `argsstring` were both present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDecl {
    /// e.g. "avx::Int256 avx::Int256::operator+"
    pub definition: String,
    /// e.g. "(const Int256 &other) const noexcept"
    pub argsstring: String,
}

/// A function reference ready to be written as a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prototype {
    /// Qualified name, starting at the namespace prefix.
    pub name: String,
    /// Parameter list up to and including the first `)`.
    pub arguments: String,
}
