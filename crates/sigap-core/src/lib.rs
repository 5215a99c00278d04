//! # sigap-core
//!
//! Core types, identifier rules, and capability traits for sigap, the
//! shapefile ingestion and layer-overlap service.
//!
//! This crate has no I/O of its own; `sigap-db` and `sigap-ingest` provide
//! the concrete [`SpatialStore`] and [`GeometryImporter`] backends.

pub mod defaults;
pub mod error;
pub mod identifier;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use identifier::{is_valid_identifier, sanitize_identifier, LayerName};
pub use models::*;
pub use traits::*;
