//! Per-upload scratch space with guaranteed cleanup.

use std::io;
use std::path::{Path, PathBuf};

use tokio::runtime::RuntimeFlavor;
use tracing::{debug, warn};
use uuid::Uuid;

use sigap_core::Result;

/// Isolated directory plus archive path for one upload request.
///
/// Layout under the upload root:
///
/// ```text
/// <root>/<uuid>.zip   uploaded bytes
/// <root>/<uuid>/      extraction directory
/// ```
///
/// Both are removed when the guard drops, whichever way the request ends
/// (success, error, or the handler future being cancelled). Removal failures
/// are logged and never propagated.
#[derive(Debug)]
pub struct UploadWorkspace {
    id: Uuid,
    dir: PathBuf,
    archive_path: PathBuf,
}

impl UploadWorkspace {
    /// Create a fresh, uniquely named extraction directory under `root`.
    pub async fn allocate(root: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(root).await?;

        let id = Uuid::new_v4();
        let dir = root.join(id.to_string());
        // create_dir (not _all) so an existing directory is an error, never reused.
        tokio::fs::create_dir(&dir).await?;
        let archive_path = root.join(format!("{}.zip", id));

        debug!(
            subsystem = "ingest",
            component = "workspace",
            op = "allocate",
            workspace_id = %id,
            dir = %dir.display(),
            "Allocated upload workspace"
        );
        Ok(Self {
            id,
            dir,
            archive_path,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Extraction directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Where the uploaded archive bytes are written.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }
}

impl Drop for UploadWorkspace {
    fn drop(&mut self) {
        let remove = || {
            report_cleanup(&self.archive_path, std::fs::remove_file(&self.archive_path));
            report_cleanup(&self.dir, std::fs::remove_dir_all(&self.dir));
        };
        // Removal stays synchronous so the paths are gone once the guard is.
        // On a multi-threaded runtime the worker's other tasks are moved off
        // first so a large extraction tree does not stall them.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(remove)
            }
            _ => remove(),
        }
        debug!(
            subsystem = "ingest",
            component = "workspace",
            op = "cleanup",
            workspace_id = %self.id,
            "Released upload workspace"
        );
    }
}

fn report_cleanup(path: &Path, outcome: io::Result<()>) {
    match outcome {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            subsystem = "ingest",
            component = "workspace",
            op = "cleanup",
            path = %path.display(),
            error = %e,
            "Failed to remove upload artifact"
        ),
    }
}
