//! # sigap-ingest
//!
//! Shapefile upload pipeline for sigap:
//!
//! - [`UploadWorkspace`]: per-request scratch directory, removed on drop
//! - [`archive`]: confined ZIP extraction and `.shp` discovery
//! - [`Ogr2OgrImporter`]: the `ogr2ogr`-backed [`sigap_core::GeometryImporter`]
//! - [`IngestPipeline`]: ties the three together

pub mod archive;
pub mod importer;
pub mod pipeline;
pub mod workspace;

pub use archive::{extract_archive, locate_primary_geometry, unpack_archive};
pub use importer::Ogr2OgrImporter;
pub use pipeline::{IngestConfig, IngestOutcome, IngestPipeline};
pub use workspace::UploadWorkspace;
