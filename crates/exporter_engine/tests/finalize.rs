mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use exporter_core::{ExportItem, ExportMode};
use exporter_engine::{
    build_manifest, zip_archive_factory, FinalOutput, FinalizeError, FinalizeOptions, Finalizer,
    MANIFEST_FILENAME,
};
use pretty_assertions::assert_eq;

fn items() -> Vec<ExportItem> {
    vec![
        ExportItem::new("Alpha_a.md", "# Alpha"),
        ExportItem::new("ERROR_b.txt", "Failed"),
        ExportItem::new("Alpha_a.md", "# Alpha again"),
    ]
}

fn options(include_manifest: bool) -> FinalizeOptions {
    FinalizeOptions {
        archive_name: "Export_2024-05-01.zip".to_string(),
        include_manifest,
        exported_at: "2024-05-01 12:00:00".to_string(),
    }
}

#[tokio::test(start_paused = true)]
async fn archive_holds_every_item_under_a_unique_name() {
    init_logging();
    let downloads = Arc::new(RecordingDownloads::new());
    let finalizer = Finalizer::new(
        downloads.clone(),
        zip_archive_factory(),
        Duration::from_millis(300),
    );
    let mut progress = Vec::new();

    let output = finalizer
        .finalize(items(), ExportMode::Archive, &options(false), &mut |p| {
            progress.push(p)
        })
        .await
        .unwrap();

    assert!(matches!(output, FinalOutput::Archive { files: 3, .. }));
    let blob = downloads.content("Export_2024-05-01.zip").unwrap();
    let mut names = zip_names(&blob);
    names.sort();
    assert_eq!(names, vec!["Alpha_a.md", "Alpha_a_2.md", "ERROR_b.txt"]);
    assert_eq!(zip_entry(&blob, "Alpha_a_2.md"), "# Alpha again");
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
}

#[tokio::test(start_paused = true)]
async fn manifest_lists_status_of_each_file() {
    init_logging();
    let downloads = Arc::new(RecordingDownloads::new());
    let finalizer = Finalizer::new(
        downloads.clone(),
        zip_archive_factory(),
        Duration::from_millis(300),
    );

    finalizer
        .finalize(items(), ExportMode::Archive, &options(true), &mut |_| {})
        .await
        .unwrap();

    let blob = downloads.content("Export_2024-05-01.zip").unwrap();
    let manifest: serde_json::Value =
        serde_json::from_str(&zip_entry(&blob, MANIFEST_FILENAME)).unwrap();
    assert_eq!(manifest["exported_at"], "2024-05-01 12:00:00");
    assert_eq!(manifest["item_count"], 3);
    assert_eq!(manifest["failed_count"], 1);
    assert_eq!(manifest["files"][1]["status"], "error");
    assert_eq!(manifest["files"][0]["bytes"], 7);
}

#[test]
fn manifest_of_empty_run_is_valid_json() {
    let manifest: serde_json::Value =
        serde_json::from_str(&build_manifest(&[], "now")).unwrap();
    assert_eq!(manifest["item_count"], 0);
    assert_eq!(manifest["files"].as_array().map(Vec::len), Some(0));
}

#[tokio::test(start_paused = true)]
async fn individual_downloads_are_staggered() {
    init_logging();
    let downloads = Arc::new(RecordingDownloads::new());
    let finalizer = Finalizer::new(
        downloads.clone(),
        zip_archive_factory(),
        Duration::from_millis(250),
    );

    let output = finalizer
        .finalize(items(), ExportMode::Individual, &options(true), &mut |_| {})
        .await
        .unwrap();

    let FinalOutput::Individual(pending) = output else {
        panic!("expected individual downloads");
    };
    assert_eq!(pending.wait().await, 3);
    assert_eq!(
        downloads.names(),
        vec!["Alpha_a.md", "ERROR_b.txt", "Alpha_a.md"]
    );
    let times = downloads.times();
    assert!(times[1] - times[0] >= Duration::from_millis(250));
    assert!(times[2] - times[1] >= Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn fallback_with_no_working_downloads_fails() {
    init_logging();
    let downloads = Arc::new(RecordingDownloads::failing());
    let finalizer = Finalizer::new(
        downloads.clone(),
        zip_archive_factory(),
        Duration::from_millis(300),
    );

    let err = finalizer
        .finalize(items(), ExportMode::Archive, &options(false), &mut |_| {})
        .await
        .unwrap_err();

    match err {
        FinalizeError::NothingSaved { reason, count } => {
            assert_eq!(count, 3);
            assert!(reason.contains("downloads disabled"));
        }
    }
}
