use std::path::{Path, PathBuf};

use rest_ingester_core::checksum::ChecksumType;
use rest_ingester_core::contract::ObjectState;
use rest_ingester_core::metadata::{PackageMetadata, MODS_FILE};
use rest_ingester_core::pid::is_valid_pid;
use rest_ingester_core::relationship::{RelationshipType, RELS_EXT};

fn fixture() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/sample_object")
}

#[test]
fn extracts_every_metadata_file_from_fixture() {
    let meta = PackageMetadata::extract(&fixture());

    assert_eq!(meta.title.as_deref(), Some("Sample title"));
    assert_eq!(meta.date_issued.as_deref(), Some("1910-07-01"));
    assert_eq!(meta.content_model_override.as_deref(), Some("foo:bar"));
    assert_eq!(meta.properties.owner.as_deref(), Some("admin"));
    assert_eq!(meta.properties.state, Some(ObjectState::Active));
    assert_eq!(meta.label(), Some("Sample label"));

    assert_eq!(meta.relationships.len(), 2);
    assert_eq!(meta.relationships[0].uri, RELS_EXT);
    assert_eq!(meta.relationships[0].object, "islandora:extra");
    assert_eq!(meta.relationships[1].kind, RelationshipType::Literal);
}

#[test]
fn empty_directory_yields_no_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let meta = PackageMetadata::extract(dir.path());

    assert_eq!(meta.title, None);
    assert_eq!(meta.date_issued, None);
    assert_eq!(meta.content_model_override, None);
    assert_eq!(meta.properties.owner, None);
    assert!(meta.relationships.is_empty());
    assert_eq!(meta.label(), None);
}

#[test]
fn malformed_mods_counts_as_absent() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(MODS_FILE), "<mods><titleInfo><title>Broken</mods>").unwrap();

    assert_eq!(PackageMetadata::extract(dir.path()).title, None);
}

#[test]
fn fixture_content_checksum() {
    let digest = ChecksumType::Sha1
        .local_checksum(&fixture().join("OBJ.txt"))
        .unwrap();
    assert_eq!(
        digest.as_deref(),
        Some("a9993e364706816aba3e25717850c26c9cd0d89d")
    );
    assert_eq!(ChecksumType::None.local_checksum(&fixture().join("OBJ.txt")).unwrap(), None);
}

#[test]
fn pid_validation() {
    assert!(is_valid_pid("islandora:100"));
    assert!(!is_valid_pid("islandora100"));
}
