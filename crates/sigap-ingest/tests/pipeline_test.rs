//! Upload pipeline tests with an in-process importer.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use sigap_core::{Error, GeometryImporter, LayerName, Result};
use sigap_ingest::{IngestConfig, IngestPipeline, UploadWorkspace};

/// Records every import call; optionally fails.
#[derive(Default)]
struct RecordingImporter {
    calls: Mutex<Vec<(PathBuf, String, i32, bool)>>,
    fail_with: Option<String>,
}

#[async_trait]
impl GeometryImporter for RecordingImporter {
    async fn import(&self, source: &Path, table: &LayerName, srid: i32) -> Result<()> {
        self.calls.lock().unwrap().push((
            source.to_path_buf(),
            table.to_string(),
            srid,
            source.is_file(),
        ));
        match &self.fail_with {
            Some(msg) => Err(Error::LoadFailed(msg.clone())),
            None => Ok(()),
        }
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn write_zip(path: &Path, names: &[&str]) {
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    for name in names {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(b"payload").unwrap();
    }
    zip.finish().unwrap();
}

fn pipeline(root: &Path, importer: Arc<RecordingImporter>) -> IngestPipeline {
    IngestPipeline::new(
        importer,
        IngestConfig {
            upload_dir: root.to_path_buf(),
            ..Default::default()
        },
    )
}

fn residue(root: &Path) -> usize {
    std::fs::read_dir(root).unwrap().count()
}

#[tokio::test]
async fn test_ingest_derives_table_and_imports() {
    let root = tempfile::tempdir().unwrap();
    let importer = Arc::new(RecordingImporter::default());
    let pipeline = pipeline(root.path(), importer.clone());

    let workspace = pipeline.allocate_workspace().await.unwrap();
    write_zip(
        workspace.archive_path(),
        &["Parcels-2025.shp", "Parcels-2025.dbf", "Parcels-2025.shx"],
    );
    let workspace = Arc::new(workspace);

    let outcome = pipeline.ingest(workspace.clone()).await.unwrap();
    assert_eq!(outcome.table.as_str(), "parcels_2025");
    assert_eq!(outcome.source_file, "Parcels-2025.shp");

    let calls = importer.calls.lock().unwrap().clone();
    assert_eq!(calls.len(), 1);
    let (source, table, srid, existed) = &calls[0];
    assert_eq!(source, &workspace.dir().join("Parcels-2025.shp"));
    assert_eq!(table, "parcels_2025");
    assert_eq!(*srid, 4326);
    assert!(existed, "geometry file must exist while importing");

    drop(workspace);
    assert_eq!(residue(root.path()), 0);
}

#[tokio::test]
async fn test_archive_without_geometry_leaves_no_residue() {
    let root = tempfile::tempdir().unwrap();
    let importer = Arc::new(RecordingImporter::default());
    let pipeline = pipeline(root.path(), importer.clone());

    let workspace = pipeline.allocate_workspace().await.unwrap();
    write_zip(workspace.archive_path(), &["notes.txt", "table.dbf"]);

    let err = pipeline.ingest(Arc::new(workspace)).await.unwrap_err();
    assert!(matches!(err, Error::ArchiveInvalid(_)), "got {:?}", err);
    assert!(importer.calls.lock().unwrap().is_empty());
    assert_eq!(residue(root.path()), 0);
}

#[tokio::test]
async fn test_corrupt_archive_leaves_no_residue() {
    let root = tempfile::tempdir().unwrap();
    let importer = Arc::new(RecordingImporter::default());
    let pipeline = pipeline(root.path(), importer.clone());

    let workspace = pipeline.allocate_workspace().await.unwrap();
    std::fs::write(workspace.archive_path(), b"PK\x03\x04 truncated").unwrap();

    let err = pipeline.ingest(Arc::new(workspace)).await.unwrap_err();
    assert!(matches!(err, Error::ArchiveCorrupt(_)), "got {:?}", err);
    assert_eq!(residue(root.path()), 0);
}

#[tokio::test]
async fn test_import_failure_propagates_and_cleans_up() {
    let root = tempfile::tempdir().unwrap();
    let importer = Arc::new(RecordingImporter {
        fail_with: Some("ogr2ogr exited with code 1".to_string()),
        ..Default::default()
    });
    let pipeline = pipeline(root.path(), importer.clone());

    let workspace = pipeline.allocate_workspace().await.unwrap();
    write_zip(workspace.archive_path(), &["parcels.shp"]);

    let err = pipeline.ingest(Arc::new(workspace)).await.unwrap_err();
    match err {
        Error::LoadFailed(msg) => assert!(msg.contains("exited with code 1")),
        other => panic!("Expected LoadFailed, got {:?}", other),
    }
    assert_eq!(residue(root.path()), 0);
}

#[tokio::test]
async fn test_overlong_stem_is_rejected_before_import() {
    let root = tempfile::tempdir().unwrap();
    let importer = Arc::new(RecordingImporter::default());
    let pipeline = pipeline(root.path(), importer.clone());

    let long_name = format!("{}.shp", "a".repeat(80));
    let workspace = pipeline.allocate_workspace().await.unwrap();
    write_zip(workspace.archive_path(), &[long_name.as_str()]);

    let err = pipeline.ingest(Arc::new(workspace)).await.unwrap_err();
    assert!(matches!(err, Error::InvalidIdentifier(_)));
    assert!(importer.calls.lock().unwrap().is_empty());
    assert_eq!(residue(root.path()), 0);
}

#[tokio::test]
async fn test_dropped_workspace_without_ingest_is_cleaned() {
    let root = tempfile::tempdir().unwrap();
    let workspace = UploadWorkspace::allocate(root.path()).await.unwrap();
    write_zip(workspace.archive_path(), &["parcels.shp"]);
    assert_eq!(residue(root.path()), 2);

    drop(workspace);
    assert_eq!(residue(root.path()), 0);
}
