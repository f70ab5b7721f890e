mod common;

use common::{config, package, Call, FakeRepository};
use rest_ingester_core::checksum::ChecksumType;
use rest_ingester_core::contract::UploadMode;
use rest_ingester_core::datastream::DatastreamSynchronizer;

#[tokio::test]
async fn second_run_replaces_instead_of_creating() {
    let dir = tempfile::tempdir().unwrap();
    package(
        dir.path(),
        &[("MODS.xml", b"<mods/>"), ("OBJ.jpg", b"jpeg"), ("cmodel.txt", b"foo:bar")],
    );
    let api = FakeRepository::new();
    let config = config("islandora:sp_basic_image");
    let sync = DatastreamSynchronizer::new(&api, &config);

    let first = sync.sync("test:1", dir.path(), None).await;
    assert_eq!(first.created, ["MODS", "OBJ"]);
    assert!(first.replaced.is_empty());

    let second = sync.sync("test:1", dir.path(), None).await;
    assert!(second.created.is_empty());
    assert_eq!(second.replaced, ["MODS", "OBJ"]);

    let modes: Vec<_> = api.uploads().into_iter().map(|(_, _, mode)| mode).collect();
    assert_eq!(
        modes,
        [UploadMode::Create, UploadMode::Create, UploadMode::Replace, UploadMode::Replace]
    );
    assert_eq!(api.datastream("test:1", "OBJ").as_deref(), Some(&b"jpeg"[..]));
    assert_eq!(api.datastream("test:1", "cmodel"), None);
}

#[tokio::test]
async fn oversized_file_is_skipped_without_upload() {
    let dir = tempfile::tempdir().unwrap();
    let big = vec![0u8; 1024 * 1024 + 1];
    package(dir.path(), &[("OBJ.tif", &big), ("MODS.xml", b"<mods/>")]);
    let api = FakeRepository::new();
    let mut config = config("islandora:sp_large_image_cmodel");
    config.max_datastream_size_mib = 1;

    let report = DatastreamSynchronizer::new(&api, &config)
        .sync("test:2", dir.path(), None)
        .await;

    assert_eq!(report.created, ["MODS"]);
    assert_eq!(report.skipped, [dir.path().join("OBJ.tif")]);
    assert!(api
        .calls()
        .iter()
        .all(|c| !matches!(c, Call::ProbeDatastream(_, dsid) if dsid == "OBJ")));
    assert_eq!(api.uploads().len(), 1);
}

#[tokio::test]
async fn checksum_mismatch_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    package(dir.path(), &[("OBJ.pdf", b"%PDF-1.4")]);
    let api = FakeRepository::new().with_corrupt_checksums();
    let config = config("islandora:sp_pdf");

    let report = DatastreamSynchronizer::new(&api, &config)
        .sync("test:3", dir.path(), None)
        .await;

    assert_eq!(report.created, ["OBJ"]);
    assert_eq!(report.checksum_mismatches, ["OBJ"]);
}

#[tokio::test]
async fn disabled_checksum_is_sent_and_not_verified() {
    let dir = tempfile::tempdir().unwrap();
    package(dir.path(), &[("OBJ.pdf", b"%PDF-1.4")]);
    let api = FakeRepository::new().with_corrupt_checksums();
    let mut config = config("islandora:sp_pdf");
    config.checksum_type = ChecksumType::None;

    let report = DatastreamSynchronizer::new(&api, &config)
        .sync("test:4", dir.path(), None)
        .await;

    assert!(report.checksum_mismatches.is_empty());
    assert!(api.calls().iter().any(|c| matches!(
        c,
        Call::Upload { checksum_type: ChecksumType::None, .. }
    )));
}

#[tokio::test]
async fn explicit_dsid_for_single_file() {
    let dir = tempfile::tempdir().unwrap();
    package(dir.path(), &[("thumb.jpg", b"tn")]);
    let api = FakeRepository::new();
    let config = config("islandora:sp_basic_image");

    let report = DatastreamSynchronizer::new(&api, &config)
        .sync("test:5", &dir.path().join("thumb.jpg"), Some("TN"))
        .await;

    assert_eq!(report.created, ["TN"]);
    assert_eq!(api.datastream("test:5", "TN").as_deref(), Some(&b"tn"[..]));
}

#[tokio::test]
async fn failed_existence_probe_skips_the_file() {
    let dir = tempfile::tempdir().unwrap();
    package(dir.path(), &[("OBJ.jpg", b"jpeg")]);
    let api = FakeRepository::new().with_failing_datastream_probes();
    let config = config("islandora:sp_basic_image");

    let report = DatastreamSynchronizer::new(&api, &config)
        .sync("test:6", dir.path(), None)
        .await;

    assert_eq!(report.skipped, [dir.path().join("OBJ.jpg")]);
    assert_eq!(report.uploaded(), 0);
    assert!(report.failed.is_empty());
    assert!(api.uploads().is_empty());
    assert_eq!(api.datastream("test:6", "OBJ"), None);
}
