//! Centralized default constants for sigap.
//!
//! Environment-driven configuration falls back to these values.

// =============================================================================
// SPATIAL STORE
// =============================================================================

/// Reference system stamped on imported layers and bbox envelopes (WGS84).
pub const TARGET_SRID: i32 = 4326;

/// Geometry column name of every imported layer.
pub const GEOMETRY_COLUMN: &str = "geom";

/// Feature id column name of every imported layer.
pub const FID_COLUMN: &str = "id";

/// PostgreSQL truncates identifiers beyond this many bytes.
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Default store connection parameters.
pub const PG_HOST: &str = "localhost";
pub const PG_PORT: u16 = 5432;
pub const PG_USER: &str = "postgres";
pub const PG_PASSWORD: &str = "postgres";
pub const PG_DATABASE: &str = "sigap2025";

// =============================================================================
// OVERLAP
// =============================================================================

/// Fallback for an omitted `layer1`.
pub const DEFAULT_LAYER1: &str = "pippib_ar_250k_2025_1";

/// Fallback for an omitted `layer2`.
pub const DEFAULT_LAYER2: &str = "kwshutan_overlap";

// =============================================================================
// UPLOAD
// =============================================================================

/// Extension of the primary geometry file inside an uploaded archive.
pub const PRIMARY_GEOMETRY_EXTENSION: &str = "shp";

/// Root directory for per-request upload workspaces.
pub const UPLOAD_DIR: &str = "uploads";

/// Request body cap for uploads (256 MiB).
pub const MAX_UPLOAD_BYTES: usize = 256 * 1024 * 1024;

/// Cap on total decompressed archive size (2 GiB).
pub const MAX_EXTRACTED_BYTES: u64 = 2 * 1024 * 1024 * 1024;

/// Converter executable.
pub const OGR2OGR_BIN: &str = "ogr2ogr";

/// Bounded wait for the external import process.
pub const IMPORT_TIMEOUT_SECS: u64 = 300;

// =============================================================================
// SERVER
// =============================================================================

pub const HOST: &str = "0.0.0.0";
pub const PORT: u16 = 3000;
