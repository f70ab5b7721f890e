//! Read-only extraction of package metadata from the fixed on-disk files.
//!
//! A package directory may carry:
//! - `MODS.xml`: descriptive metadata; title and issue date come from here.
//! - `cmodel.txt`: content model override for this one object.
//! - `foxml.xml`: object properties (owner, label, state) that win over
//!   command-level defaults and the MODS title.
//! - `relationships.json`: extra relationships appended after ingest.
//!
//! Nothing here touches the network, and a missing or unreadable file is
//! always reported as "absent" rather than an error.

use std::path::{Path, PathBuf};

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

use crate::contract::ObjectState;
use crate::relationship::{Relationship, RelationshipsFile};

pub const MODS_FILE: &str = "MODS.xml";
pub const CMODEL_FILE: &str = "cmodel.txt";
pub const FOXML_FILE: &str = "foxml.xml";
pub const RELATIONSHIPS_FILE: &str = "relationships.json";

/// Object properties carried in `foxml.xml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectProperties {
    pub owner: Option<String>,
    pub label: Option<String>,
    pub state: Option<ObjectState>,
}

/// Everything extractable from one package directory.
#[derive(Debug, Clone, Default)]
pub struct PackageMetadata {
    pub dir: PathBuf,
    pub title: Option<String>,
    pub date_issued: Option<String>,
    pub content_model_override: Option<String>,
    pub properties: ObjectProperties,
    pub relationships: Vec<Relationship>,
}

impl PackageMetadata {
    /// Read every metadata file present in `dir`.
    pub fn extract(dir: &Path) -> Self {
        let mods_path = dir.join(MODS_FILE);
        PackageMetadata {
            dir: dir.to_path_buf(),
            title: mods_value(&mods_path, &["titleInfo", "title"]),
            date_issued: mods_value(&mods_path, &["originInfo", "dateIssued"]),
            content_model_override: content_model_from_file(dir),
            properties: properties_from_foxml(&dir.join(FOXML_FILE)),
            relationships: relationships_from_file(&dir.join(RELATIONSHIPS_FILE)),
        }
    }

    /// Label precedence: foxml label, then MODS title.
    pub fn label(&self) -> Option<&str> {
        self.properties
            .label
            .as_deref()
            .or(self.title.as_deref())
    }
}

/// Text of the first element whose trailing ancestry matches `path` by
/// local name, like the XPath `//a/b`. Namespace prefixes are ignored.
pub fn first_text_at(xml: &str, path: &[&str]) -> Result<Option<String>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut collecting = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                stack.push(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
                if !collecting && ends_with_names(&stack, path) {
                    collecting = true;
                    text.clear();
                }
            }
            Event::End(_) => {
                if collecting && ends_with_names(&stack, path) {
                    let value = text.trim();
                    if !value.is_empty() {
                        return Ok(Some(value.to_string()));
                    }
                    collecting = false;
                }
                stack.pop();
            }
            Event::Text(t) if collecting => text.push_str(&t.unescape()?),
            Event::CData(c) if collecting => {
                text.push_str(&String::from_utf8_lossy(&c.into_inner()))
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn ends_with_names(stack: &[String], path: &[&str]) -> bool {
    stack.len() >= path.len()
        && stack[stack.len() - path.len()..]
            .iter()
            .zip(path)
            .all(|(have, want)| have == want)
}

/// Read `mods_path` and extract the value at `path`; absent on any failure.
pub fn mods_value(mods_path: &Path, path: &[&str]) -> Option<String> {
    let xml = match std::fs::read_to_string(mods_path) {
        Ok(xml) => xml,
        Err(e) => {
            debug!(path = %mods_path.display(), error = %e, "No readable MODS file");
            return None;
        }
    };
    match first_text_at(&xml, path) {
        Ok(value) => value,
        Err(e) => {
            warn!(path = %mods_path.display(), error = %e, "Could not parse MODS file");
            None
        }
    }
}

/// First non-empty line of `cmodel.txt`, if present.
pub fn content_model_from_file(dir: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(dir.join(CMODEL_FILE)).ok()?;
    raw.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// Owner, label and state from `foxml:objectProperties`.
pub fn properties_from_foxml(foxml_path: &Path) -> ObjectProperties {
    let Ok(xml) = std::fs::read_to_string(foxml_path) else {
        return ObjectProperties::default();
    };
    match parse_foxml_properties(&xml) {
        Ok(props) => props,
        Err(e) => {
            warn!(path = %foxml_path.display(), error = %e, "Could not parse FOXML properties");
            ObjectProperties::default()
        }
    }
}

pub fn parse_foxml_properties(xml: &str) -> Result<ObjectProperties, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut props = ObjectProperties::default();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"property" => {
                let mut name = None;
                let mut value = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"NAME" => name = Some(attr.unescape_value()?.into_owned()),
                        b"VALUE" => value = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                let (Some(name), Some(value)) = (name, value) else {
                    continue;
                };
                let value = value.trim().to_string();
                if value.is_empty() {
                    continue;
                }
                match name.rsplit('#').next() {
                    Some("ownerId") => props.owner = Some(value),
                    Some("label") => props.label = Some(value),
                    Some("state") => match value.parse::<ObjectState>() {
                        Ok(state) => props.state = Some(state),
                        Err(e) => warn!(error = %e, "Ignoring FOXML state"),
                    },
                    _ => {}
                }
            }
            Event::Eof => return Ok(props),
            _ => {}
        }
    }
}

/// Relationships listed in `relationships.json`; empty when absent or invalid.
pub fn relationships_from_file(path: &Path) -> Vec<Relationship> {
    let Ok(raw) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    match serde_json::from_str::<RelationshipsFile>(&raw) {
        Ok(file) => file.relationships,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unparseable relationships file");
            Vec::new()
        }
    }
}

/// `Page N` for a page directory named `N`.
pub fn page_label(dir: &Path) -> String {
    let name = dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("Page {name}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<mods xmlns="http://www.loc.gov/mods/v3" xmlns:mods="http://www.loc.gov/mods/v3">
  <name><namePart>Not a title</namePart></name>
  <titleInfo>
    <mods:title>Sample title</mods:title>
    <subTitle>ignored</subTitle>
  </titleInfo>
  <titleInfo type="alternative"><title>Second title</title></titleInfo>
  <originInfo><dateIssued encoding="w3cdtf">1907-03-14</dateIssued></originInfo>
</mods>"#;

    #[test]
    fn finds_first_title_regardless_of_prefix() {
        assert_eq!(
            first_text_at(MODS, &["titleInfo", "title"]).unwrap().as_deref(),
            Some("Sample title")
        );
        assert_eq!(
            first_text_at(MODS, &["originInfo", "dateIssued"]).unwrap().as_deref(),
            Some("1907-03-14")
        );
    }

    #[test]
    fn missing_element_is_none() {
        assert_eq!(first_text_at(MODS, &["relatedItem", "title"]).unwrap(), None);
        let blank = "<mods><titleInfo><title>  </title></titleInfo></mods>";
        assert_eq!(first_text_at(blank, &["titleInfo", "title"]).unwrap(), None);
    }

    #[test]
    fn unescapes_entities() {
        let xml = "<mods><titleInfo><title>Fish &amp; Chips</title></titleInfo></mods>";
        assert_eq!(
            first_text_at(xml, &["titleInfo", "title"]).unwrap().as_deref(),
            Some("Fish & Chips")
        );
    }

    #[test]
    fn parses_foxml_object_properties() {
        let foxml = r#"<?xml version="1.0" encoding="UTF-8"?>
<foxml:digitalObject VERSION="1.1" PID="test:1" xmlns:foxml="info:fedora/fedora-system:def/foxml#">
  <foxml:objectProperties>
    <foxml:property NAME="info:fedora/fedora-system:def/model#state" VALUE="Inactive"/>
    <foxml:property NAME="info:fedora/fedora-system:def/model#label" VALUE="A label"/>
    <foxml:property NAME="info:fedora/fedora-system:def/model#ownerId" VALUE="admin"/>
    <foxml:property NAME="info:fedora/fedora-system:def/model#createdDate" VALUE="2016-01-01T00:00:00.000Z"/>
  </foxml:objectProperties>
</foxml:digitalObject>"#;
        let props = parse_foxml_properties(foxml).unwrap();
        assert_eq!(props.owner.as_deref(), Some("admin"));
        assert_eq!(props.label.as_deref(), Some("A label"));
        assert_eq!(props.state, Some(ObjectState::Inactive));
    }

    #[test]
    fn page_label_uses_directory_name() {
        assert_eq!(page_label(Path::new("/tmp/book/3")), "Page 3");
    }
}
