//! Doxygen compound XML reader.
//!
//! Walks the quick-xml event stream once, tracking the open-element path, and
//! keeps only what the extractor needs: the `definition` and `argsstring` of
//! every `memberdef` under an allow-listed
//! `<root>/compounddef/sectiondef[@kind]`. Members are validated as they close,
//! so a missing field fails here rather than later during normalization.

use crate::error::{ExtractError, Result};
use crate::model::{CompoundDocument, KindFilter, MemberDecl, Section};
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::{Path, PathBuf};

// Depth of each element of interest, counting the root as 1.
const COMPOUND_DEPTH: usize = 2;
const SECTION_DEPTH: usize = 3;
const MEMBER_DEPTH: usize = 4;
const FIELD_DEPTH: usize = 5;

/// Read and parse a Doxygen XML file.
pub fn parse_file(path: &Path, filter: &KindFilter) -> Result<CompoundDocument> {
    let content = fs::read_to_string(path).map_err(|source| ExtractError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content, path, filter)
}

/// Parse Doxygen XML already held in memory. `path` is only used in errors.
pub fn parse_str(content: &str, path: &Path, filter: &KindFilter) -> Result<CompoundDocument> {
    let mut reader = Reader::from_str(content);
    let mut walker = Walker::new(path, filter);

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(source) => {
                return Err(ExtractError::Xml {
                    path: path.to_path_buf(),
                    position: reader.buffer_position() as u64,
                    source,
                })
            }
        };

        match event {
            Event::Start(ref e) => walker.open(e)?,
            Event::Empty(ref e) => {
                walker.open(e)?;
                walker.close()?;
            }
            Event::End(_) => walker.close()?,
            Event::Text(ref t) => {
                let text = walker.utf8(t)?;
                walker.text(text)?;
            }
            Event::CData(ref t) => {
                let text = walker.utf8(t)?;
                walker.text(text)?;
            }
            Event::GeneralRef(ref r) => {
                let resolved = walker.resolve(r)?;
                walker.text(&resolved)?;
            }
            Event::Eof => break,
            _ => {}
        }
    }

    walker.finish()
}

#[derive(Clone, Copy, Debug)]
enum Field {
    Definition,
    Argsstring,
}

impl Field {
    fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"definition" => Some(Field::Definition),
            b"argsstring" => Some(Field::Argsstring),
            _ => None,
        }
    }
}

#[derive(Default)]
struct PendingMember {
    definition: Option<String>,
    argsstring: Option<String>,
}

struct Walker<'a> {
    path: PathBuf,
    filter: &'a KindFilter,
    stack: Vec<Vec<u8>>,
    seen_root: bool,
    doc: CompoundDocument,
    section: Option<Section>,
    member: Option<PendingMember>,
    field: Option<(Field, String)>,
    sections_seen: usize,
    members_seen: usize,
}

impl<'a> Walker<'a> {
    fn new(path: &Path, filter: &'a KindFilter) -> Self {
        Self {
            path: path.to_path_buf(),
            filter,
            stack: Vec::new(),
            seen_root: false,
            doc: CompoundDocument::default(),
            section: None,
            member: None,
            field: None,
            sections_seen: 0,
            members_seen: 0,
        }
    }

    fn malformed(&self, reason: impl Into<String>) -> ExtractError {
        ExtractError::Malformed {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn parent_is(&self, tag: &[u8]) -> bool {
        self.stack.last().is_some_and(|top| top.as_slice() == tag)
    }

    fn open(&mut self, e: &BytesStart) -> Result<()> {
        let name = e.name();
        let tag = name.as_ref();
        let depth = self.stack.len() + 1;

        if depth == 1 {
            if self.seen_root {
                return Err(self.malformed("more than one root element"));
            }
            self.seen_root = true;
        } else if depth == SECTION_DEPTH && tag == b"sectiondef" && self.parent_is(b"compounddef")
        {
            self.open_section(e)?;
        } else if depth == MEMBER_DEPTH && tag == b"memberdef" && self.section.is_some() {
            self.member = Some(PendingMember::default());
        } else if depth == FIELD_DEPTH && self.member.is_some() {
            // Only the first occurrence of each field counts.
            if let Some(field) = Field::from_tag(tag) {
                let taken = match (field, &self.member) {
                    (Field::Definition, Some(m)) => m.definition.is_some(),
                    (Field::Argsstring, Some(m)) => m.argsstring.is_some(),
                    _ => true,
                };
                if !taken {
                    self.field = Some((field, String::new()));
                }
            }
        }

        self.stack.push(tag.to_vec());
        Ok(())
    }

    fn open_section(&mut self, e: &BytesStart) -> Result<()> {
        let index = self.sections_seen;
        self.sections_seen += 1;

        let attr = e
            .try_get_attribute("kind")
            .map_err(|err| self.malformed(format!("bad sectiondef attribute: {err}")))?;
        let Some(attr) = attr else {
            return Err(ExtractError::DataShape {
                path: self.path.clone(),
                element: "sectiondef",
                index,
                field: "kind",
            });
        };
        let kind = std::str::from_utf8(&attr.value)
            .map_err(|err| self.malformed(format!("sectiondef kind is not UTF-8: {err}")))?
            .to_string();

        if self.filter.allows(&kind) {
            tracing::debug!(kind = %kind, "exporting section");
            self.section = Some(Section {
                kind,
                members: Vec::new(),
            });
        } else {
            tracing::debug!(kind = %kind, "skipping section");
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let Some(tag) = self.stack.pop() else {
            return Err(self.malformed("end tag without a matching start tag"));
        };
        let depth = self.stack.len() + 1;

        match depth {
            FIELD_DEPTH => {
                if let (Some((field, text)), Some(member)) = (self.field.take(), self.member.as_mut())
                {
                    match field {
                        Field::Definition => member.definition = Some(text),
                        Field::Argsstring => member.argsstring = Some(text),
                    }
                }
            }
            MEMBER_DEPTH if tag == b"memberdef" => {
                if let Some(pending) = self.member.take() {
                    let decl = self.validate(pending)?;
                    if let Some(section) = self.section.as_mut() {
                        section.members.push(decl);
                    }
                }
            }
            SECTION_DEPTH if tag == b"sectiondef" => {
                if let Some(section) = self.section.take() {
                    tracing::debug!(
                        kind = %section.kind,
                        members = section.members.len(),
                        "section done"
                    );
                    self.doc.sections.push(section);
                }
            }
            COMPOUND_DEPTH if tag == b"compounddef" => {
                tracing::trace!("compounddef done");
            }
            _ => {}
        }
        Ok(())
    }

    fn validate(&mut self, pending: PendingMember) -> Result<MemberDecl> {
        let index = self.members_seen;
        self.members_seen += 1;

        let missing = |field| ExtractError::DataShape {
            path: self.path.clone(),
            element: "memberdef",
            index,
            field,
        };
        let definition = pending.definition.ok_or_else(|| missing("definition"))?;
        let argsstring = pending.argsstring.ok_or_else(|| missing("argsstring"))?;
        Ok(MemberDecl {
            definition,
            argsstring,
        })
    }

    fn text(&mut self, text: &str) -> Result<()> {
        if self.stack.is_empty() {
            if !text.trim().is_empty() {
                return Err(self.malformed("text outside the root element"));
            }
            return Ok(());
        }
        if self.stack.len() == FIELD_DEPTH {
            if let Some((_, buf)) = self.field.as_mut() {
                buf.push_str(text);
            }
        }
        Ok(())
    }

    fn utf8<'b>(&self, bytes: &'b [u8]) -> Result<&'b str> {
        std::str::from_utf8(bytes).map_err(|err| self.malformed(format!("invalid UTF-8: {err}")))
    }

    /// Resolve `&name;` to its text. Only the predefined XML entities and
    /// numeric character references are known.
    fn resolve(&self, r: &BytesRef) -> Result<String> {
        let name = self.utf8(r)?;
        resolve_reference(name).ok_or_else(|| self.malformed(format!("undefined entity &{name};")))
    }

    fn finish(self) -> Result<CompoundDocument> {
        if let Some(open) = self.stack.last() {
            let open = String::from_utf8_lossy(open).into_owned();
            return Err(self.malformed(format!("unexpected end of input inside <{open}>")));
        }
        if !self.seen_root {
            return Err(self.malformed("no root element"));
        }
        Ok(self.doc)
    }
}

fn resolve_reference(name: &str) -> Option<String> {
    if let Some(number) = name.strip_prefix('#') {
        let code = match number.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    quick_xml::escape::resolve_predefined_entity(name).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(xml: &str) -> Result<CompoundDocument> {
        parse_str(xml, Path::new("test.xml"), &KindFilter::default())
    }

    const TWO_SECTIONS: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='no'?>
<doxygen version="1.9.8">
  <compounddef id="classavx_1_1Int256" kind="class" language="C++" prot="public">
    <compoundname>avx::Int256</compoundname>
    <sectiondef kind="private-attrib">
      <memberdef kind="variable" id="a1">
        <definition>__m256i avx::Int256::v</definition>
        <argsstring></argsstring>
      </memberdef>
    </sectiondef>
    <sectiondef kind="public-func">
      <memberdef kind="function" id="a2">
        <type>int</type>
        <definition>int avx::Int256::sum</definition>
        <argsstring>() const noexcept</argsstring>
        <name>sum</name>
      </memberdef>
      <memberdef kind="function" id="a3">
        <definition>avx::Int256 avx::Int256::operator+</definition>
        <argsstring>(const Int256 &amp;other) const</argsstring>
      </memberdef>
    </sectiondef>
  </compounddef>
</doxygen>
"#;

    #[test]
    fn keeps_only_allowed_sections() {
        let doc = parse(TWO_SECTIONS).unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].kind, "public-func");
        assert_eq!(doc.member_count(), 2);
    }

    #[test]
    fn reads_fields_and_resolves_entities() {
        let doc = parse(TWO_SECTIONS).unwrap();
        let member = &doc.sections[0].members[1];
        assert_eq!(member.definition, "avx::Int256 avx::Int256::operator+");
        assert_eq!(member.argsstring, "(const Int256 &other) const");
    }

    #[test]
    fn custom_filter_selects_other_kinds() {
        let filter = KindFilter::new(["private-attrib"]);
        let doc = parse_str(TWO_SECTIONS, Path::new("t.xml"), &filter).unwrap();
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.sections[0].members[0].argsstring, "");
    }

    #[test]
    fn empty_field_is_empty_string() {
        let xml = r#"<doxygen><compounddef><sectiondef kind="friend">
            <memberdef><definition>friend class avx::Helper</definition><argsstring/></memberdef>
        </sectiondef></compounddef></doxygen>"#;
        let doc = parse(xml).unwrap();
        assert_eq!(doc.sections[0].members[0].argsstring, "");
    }

    #[test]
    fn missing_argsstring_is_data_shape_error() {
        let xml = r#"<doxygen><compounddef><sectiondef kind="public-func">
            <memberdef><definition>void avx::foo</definition></memberdef>
        </sectiondef></compounddef></doxygen>"#;
        let err = parse(xml).unwrap_err();
        assert!(
            matches!(err, ExtractError::DataShape { field: "argsstring", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn missing_field_in_skipped_section_is_ignored() {
        let xml = r#"<doxygen><compounddef><sectiondef kind="public-type">
            <memberdef><name>T</name></memberdef>
        </sectiondef></compounddef></doxygen>"#;
        assert_eq!(parse(xml).unwrap().member_count(), 0);
    }

    #[test]
    fn section_without_kind_is_data_shape_error() {
        let xml = "<doxygen><compounddef><sectiondef/></compounddef></doxygen>";
        let err = parse(xml).unwrap_err();
        assert!(matches!(err, ExtractError::DataShape { field: "kind", .. }));
    }

    #[test]
    fn nested_sectiondef_is_not_a_section() {
        let xml = r#"<doxygen><compounddef><detaileddescription>
            <sectiondef kind="public-func"><memberdef/></sectiondef>
        </detaileddescription></compounddef></doxygen>"#;
        assert_eq!(parse(xml).unwrap().sections.len(), 0);
    }

    #[test]
    fn sections_from_every_compounddef() {
        let xml = r#"<doxygen>
            <compounddef><sectiondef kind="public-func">
                <memberdef><definition>void avx::a</definition><argsstring>()</argsstring></memberdef>
            </sectiondef></compounddef>
            <compounddef><sectiondef kind="friend">
                <memberdef><definition>void avx::b</definition><argsstring>()</argsstring></memberdef>
            </sectiondef></compounddef>
        </doxygen>"#;
        let doc = parse(xml).unwrap();
        let defs: Vec<_> = doc
            .sections
            .iter()
            .flat_map(|s| &s.members)
            .map(|m| m.definition.as_str())
            .collect();
        assert_eq!(defs, ["void avx::a", "void avx::b"]);
    }

    #[test]
    fn truncated_document_fails() {
        let cut = &TWO_SECTIONS[..TWO_SECTIONS.len() / 2];
        assert!(parse(cut).is_err());
    }

    #[test]
    fn empty_document_fails() {
        let err = parse("").unwrap_err();
        assert!(matches!(err, ExtractError::Malformed { .. }));
    }

    #[test]
    fn mismatched_end_tag_fails() {
        assert!(parse("<doxygen><compounddef></sectiondef></doxygen>").is_err());
    }

    #[test]
    fn unknown_entity_fails() {
        let xml = r#"<doxygen><compounddef><sectiondef kind="public-func">
            <memberdef><definition>&bogus;</definition><argsstring>()</argsstring></memberdef>
        </sectiondef></compounddef></doxygen>"#;
        assert!(parse(xml).is_err());
    }

    #[test]
    fn missing_file_is_read_error() {
        let err = parse_file(Path::new("/nonexistent/file.xml"), &KindFilter::default())
            .unwrap_err();
        assert!(matches!(err, ExtractError::Read { .. }));
    }

    #[test]
    fn numeric_references() {
        assert_eq!(resolve_reference("#60").as_deref(), Some("<"));
        assert_eq!(resolve_reference("#x3E").as_deref(), Some(">"));
        assert_eq!(resolve_reference("amp").as_deref(), Some("&"));
        assert_eq!(resolve_reference("nbsp"), None);
    }
}
