//! [`GeometryImporter`] backed by GDAL's `ogr2ogr`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use sigap_core::defaults::{FID_COLUMN, GEOMETRY_COLUMN, IMPORT_TIMEOUT_SECS, OGR2OGR_BIN};
use sigap_core::{Error, GeometryImporter, LayerName, Result};
use sigap_db::ConnectionConfig;

/// Upper bound on the `--version` run behind [`GeometryImporter::health_check`].
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Imports shapefiles into PostGIS by shelling out to `ogr2ogr`.
pub struct Ogr2OgrImporter {
    program: PathBuf,
    datasource: String,
    password: String,
    timeout: Duration,
}

impl Ogr2OgrImporter {
    pub fn new(connection: &ConnectionConfig) -> Self {
        Self {
            program: PathBuf::from(OGR2OGR_BIN),
            datasource: connection.ogr_datasource(),
            password: connection.password.clone(),
            timeout: Duration::from_secs(IMPORT_TIMEOUT_SECS),
        }
    }

    /// Use a different converter executable.
    pub fn with_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.program = program.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// `ogr2ogr -f PostgreSQL PG:... <source> -nln <table> ... -overwrite`
    pub(crate) fn build_args(&self, source: &Path, table: &LayerName, srid: i32) -> Vec<OsString> {
        vec![
            "-f".into(),
            "PostgreSQL".into(),
            self.datasource.clone().into(),
            source.as_os_str().to_owned(),
            "-nln".into(),
            table.as_str().into(),
            "-lco".into(),
            format!("GEOMETRY_NAME={}", GEOMETRY_COLUMN).into(),
            "-lco".into(),
            format!("FID={}", FID_COLUMN).into(),
            "-nlt".into(),
            "PROMOTE_TO_MULTI".into(),
            "-a_srs".into(),
            format!("EPSG:{}", srid).into(),
            "-overwrite".into(),
        ]
    }

    fn label(&self) -> String {
        self.program.display().to_string()
    }
}

/// Run a command with a timeout, returning its output on a clean exit.
///
/// The child is spawned with `kill_on_drop`, so a timeout (or the caller's
/// future being dropped) terminates it instead of leaving it orphaned.
pub(crate) async fn run_cmd_with_timeout(
    cmd: &mut Command,
    timeout: Duration,
    label: &str,
) -> Result<Output> {
    let child = cmd
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::LoadFailed(format!("failed to launch {}: {}", label, e)))?;

    let output = tokio::time::timeout(timeout, child.wait_with_output())
        .await
        .map_err(|_| {
            Error::LoadFailed(format!(
                "{} timed out after {}s",
                label,
                timeout.as_secs_f64()
            ))
        })?
        .map_err(|e| Error::LoadFailed(format!("failed to wait for {}: {}", label, e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::LoadFailed(format!(
            "{} exited with {}: {}",
            label,
            output.status,
            stderr.trim()
        )));
    }

    Ok(output)
}

#[async_trait]
impl GeometryImporter for Ogr2OgrImporter {
    async fn import(&self, source: &Path, table: &LayerName, srid: i32) -> Result<()> {
        let start = Instant::now();
        let label = self.label();

        debug!(
            subsystem = "ingest",
            component = "ogr2ogr",
            op = "import",
            source = %source.display(),
            db_table = %table,
            srid,
            "Launching converter"
        );

        let result = run_cmd_with_timeout(
            Command::new(&self.program)
                .args(self.build_args(source, table, srid))
                .env("PGPASSWORD", &self.password),
            self.timeout,
            &label,
        )
        .await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    subsystem = "ingest",
                    component = "ogr2ogr",
                    op = "import",
                    db_table = %table,
                    duration_ms = start.elapsed().as_millis() as u64,
                    error = %e,
                    "Converter failed"
                );
                return Err(e);
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(component = "ogr2ogr", db_table = %table, "{}", line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            warn!(component = "ogr2ogr", db_table = %table, "{}", line);
        }

        info!(
            subsystem = "ingest",
            component = "ogr2ogr",
            op = "import",
            db_table = %table,
            duration_ms = start.elapsed().as_millis() as u64,
            "Geometry imported"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let version = run_cmd_with_timeout(
            Command::new(&self.program).arg("--version"),
            self.timeout.min(HEALTH_CHECK_TIMEOUT),
            &self.label(),
        )
        .await;
        match version {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(component = "ogr2ogr", error = %e, "Converter version check failed");
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "ogr2ogr"
    }
}
