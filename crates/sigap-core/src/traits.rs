//! Capability traits at the two external seams: the spatial store and the
//! geometry importer. Concrete backends live in `sigap-db` and
//! `sigap-ingest`; handlers and the upload pipeline depend only on these.

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::identifier::LayerName;
use crate::models::{OverlapRequest, OverlapRow};

/// A store able to answer geometric predicate and measurement queries.
#[async_trait]
pub trait SpatialStore: Send + Sync {
    /// Every pair `(a, b)` with `a` from `layer1` and `b` from `layer2` whose
    /// geometries intersect, narrowed to `a` intersecting the bbox if one is
    /// given. Ordered by `(id1, id2)`. All or nothing: no partial results.
    async fn overlap_pairs(&self, request: &OverlapRequest) -> Result<Vec<OverlapRow>>;

    /// Number of features stored in `layer`.
    async fn feature_count(&self, layer: &LayerName) -> Result<i64>;

    /// Cheap round-trip used by health checks.
    async fn ping(&self) -> Result<()>;
}

/// Materializes a geometry file as a table in the spatial store.
///
/// Implementations must: use the fixed geometry/feature-id column names,
/// promote geometries to their multi-part form, stamp `srid` without
/// reprojecting, and replace any existing table of the same name.
#[async_trait]
pub trait GeometryImporter: Send + Sync {
    async fn import(&self, source: &Path, table: &LayerName, srid: i32) -> Result<()>;

    /// Whether the importer can run at all (binary present, service reachable).
    async fn health_check(&self) -> Result<bool>;

    fn name(&self) -> &str;
}
