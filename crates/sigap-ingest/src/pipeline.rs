//! Upload pipeline: unpack → derive table name → import.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use sigap_core::defaults::{MAX_EXTRACTED_BYTES, TARGET_SRID, UPLOAD_DIR};
use sigap_core::{Error, GeometryImporter, LayerName, Result};

use crate::archive::unpack_archive;
use crate::workspace::UploadWorkspace;

/// Settings for the upload pipeline.
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Root under which per-request workspaces are allocated.
    pub upload_dir: PathBuf,
    /// Cap on total decompressed archive size.
    pub max_extracted_bytes: u64,
    /// Reference system stamped on imported layers.
    pub srid: i32,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from(UPLOAD_DIR),
            max_extracted_bytes: MAX_EXTRACTED_BYTES,
            srid: TARGET_SRID,
        }
    }
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestOutcome {
    /// Table the geometry now lives in.
    pub table: LayerName,
    /// Name of the geometry file found inside the archive.
    pub source_file: String,
}

/// Orchestrates one upload from archive bytes on disk to a stored layer.
pub struct IngestPipeline {
    importer: Arc<dyn GeometryImporter>,
    config: IngestConfig,
}

impl IngestPipeline {
    pub fn new(importer: Arc<dyn GeometryImporter>, config: IngestConfig) -> Self {
        Self { importer, config }
    }

    pub fn importer(&self) -> &dyn GeometryImporter {
        self.importer.as_ref()
    }

    /// Allocate a workspace for a new upload.
    pub async fn allocate_workspace(&self) -> Result<UploadWorkspace> {
        UploadWorkspace::allocate(&self.config.upload_dir).await
    }

    /// Import the archive already written to `workspace.archive_path()`.
    ///
    /// The workspace is shared with the extraction task, so cleanup waits
    /// for extraction to finish even when the caller is cancelled.
    pub async fn ingest(&self, workspace: Arc<UploadWorkspace>) -> Result<IngestOutcome> {
        let start = Instant::now();
        let max_bytes = self.config.max_extracted_bytes;

        let extraction = Arc::clone(&workspace);
        let geometry_file = tokio::task::spawn_blocking(move || {
            unpack_archive(extraction.archive_path(), extraction.dir(), max_bytes)
        })
        .await
        .map_err(|e| Error::Internal(format!("extraction task failed: {}", e)))??;

        let source_file = geometry_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = geometry_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let table = LayerName::sanitize(&stem)?;

        self.importer
            .import(&geometry_file, &table, self.config.srid)
            .await?;

        info!(
            subsystem = "ingest",
            component = "pipeline",
            op = "ingest",
            workspace_id = %workspace.id(),
            source_file = %source_file,
            db_table = %table,
            importer = self.importer.name(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Imported {} -> {}",
            source_file,
            table
        );

        Ok(IngestOutcome { table, source_file })
    }
}
