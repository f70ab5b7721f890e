//! RELS-EXT relationship vocabulary and the fire-and-forget writer.

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::contract::RepositoryApi;

pub const FEDORA_MODEL: &str = "info:fedora/fedora-system:def/model#";
pub const RELS_EXT: &str = "info:fedora/fedora-system:def/relations-external#";
pub const ISLANDORA_RELS_EXT: &str = "http://islandora.ca/ontology/relsext#";

/// How the relationship's object value is typed in RELS-EXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipType {
    /// Resource reference (`rdf:resource`).
    #[default]
    Uri,
    /// Plain literal.
    #[serde(alias = "string")]
    Literal,
    /// Untyped value.
    None,
}

impl RelationshipType {
    /// Value of the `type` form field.
    pub fn as_param(self) -> &'static str {
        match self {
            RelationshipType::Uri => "uri",
            RelationshipType::Literal => "string",
            RelationshipType::None => "none",
        }
    }
}

fn default_uri() -> String {
    RELS_EXT.to_string()
}

/// One predicate/object assertion about an object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default = "default_uri")]
    pub uri: String,
    pub predicate: String,
    pub object: String,
    #[serde(rename = "type", default)]
    pub kind: RelationshipType,
}

impl Relationship {
    pub fn new(
        uri: &str,
        predicate: impl Into<String>,
        object: impl Into<String>,
        kind: RelationshipType,
    ) -> Self {
        Relationship {
            uri: uri.to_string(),
            predicate: predicate.into(),
            object: object.into(),
            kind,
        }
    }

    /// `fedora-model:hasModel`
    pub fn has_model(content_model: &str) -> Self {
        Self::new(FEDORA_MODEL, "hasModel", content_model, RelationshipType::Uri)
    }

    /// A relations-external link to another object (`isMemberOfCollection`,
    /// `isMemberOf`, `isConstituentOf`, ...).
    pub fn external(predicate: &str, object_pid: &str) -> Self {
        Self::new(RELS_EXT, predicate, object_pid, RelationshipType::Uri)
    }

    /// `islandora:isPageOf`
    pub fn is_page_of(book_pid: &str) -> Self {
        Self::new(ISLANDORA_RELS_EXT, "isPageOf", book_pid, RelationshipType::Uri)
    }

    /// An untyped value in the Islandora namespace (sequence numbers, dates).
    pub fn islandora_value(predicate: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(ISLANDORA_RELS_EXT, predicate, value, RelationshipType::None)
    }

    /// The five relationships every paged child carries.
    pub fn page_set(parent_pid: &str, sequence: &str) -> Vec<Relationship> {
        vec![
            Self::external("isMemberOf", parent_pid),
            Self::is_page_of(parent_pid),
            Self::islandora_value("isSequenceNumber", sequence),
            Self::islandora_value("isPageNumber", sequence),
            Self::islandora_value("isSection", "1"),
        ]
    }
}

/// `relationships.json` document.
#[derive(Debug, Default, Deserialize)]
pub struct RelationshipsFile {
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

/// Append `rel` to `pid`. Failures are logged and reported as `false`; they
/// never abort the caller.
pub async fn add_relationship(api: &dyn RepositoryApi, pid: &str, rel: &Relationship) -> bool {
    match api.add_relationship(pid, rel).await {
        Ok(()) => {
            debug!(
                pid,
                predicate = %rel.predicate,
                object = %rel.object,
                "[RELATIONSHIP] Added"
            );
            true
        }
        Err(e) => {
            error!(
                pid,
                uri = %rel.uri,
                predicate = %rel.predicate,
                object = %rel.object,
                error = %e,
                "[RELATIONSHIP] Failed to add relationship"
            );
            false
        }
    }
}

/// Append every relationship in order; returns how many failed.
pub async fn add_relationships(api: &dyn RepositoryApi, pid: &str, rels: &[Relationship]) -> usize {
    let mut failed = 0;
    for rel in rels {
        if !add_relationship(api, pid, rel).await {
            failed += 1;
        }
    }
    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockRepositoryApi;
    use crate::error::ApiError;

    #[test]
    fn page_set_uses_fixed_vocabulary() {
        let rels = Relationship::page_set("book:1", "3");
        let predicates: Vec<_> = rels.iter().map(|r| r.predicate.as_str()).collect();
        assert_eq!(
            predicates,
            ["isMemberOf", "isPageOf", "isSequenceNumber", "isPageNumber", "isSection"]
        );
        assert_eq!(rels[2].object, "3");
        assert_eq!(rels[4].object, "1");
        assert_eq!(rels[2].kind, RelationshipType::None);
        assert_eq!(rels[1].kind, RelationshipType::Uri);
    }

    #[test]
    fn relationships_file_applies_defaults() {
        let parsed: RelationshipsFile = serde_json::from_str(
            r#"{"relationships": [
                {"predicate": "isMemberOfCollection", "object": "col:2"},
                {"uri": "http://islandora.ca/ontology/relsext#", "predicate": "note", "object": "x", "type": "string"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(parsed.relationships.len(), 2);
        assert_eq!(parsed.relationships[0].uri, RELS_EXT);
        assert_eq!(parsed.relationships[0].kind, RelationshipType::Uri);
        assert_eq!(parsed.relationships[1].kind, RelationshipType::Literal);
    }

    #[tokio::test]
    async fn failed_relationship_is_reported_not_raised() {
        let mut api = MockRepositoryApi::new();
        api.expect_add_relationship().times(2).returning(|pid, _| {
            if pid.ends_with(":1") {
                Err(ApiError::Status {
                    method: "POST".into(),
                    url: "http://x/object/a:1/relationship".into(),
                    status: 500,
                    body: String::new(),
                })
            } else {
                Ok(())
            }
        });

        let rel = Relationship::has_model("islandora:sp_pdf");
        assert!(!add_relationship(&api, "a:1", &rel).await);
        assert!(add_relationship(&api, "a:2", &rel).await);
    }
}
