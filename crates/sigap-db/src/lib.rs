//! # sigap-db
//!
//! PostgreSQL + PostGIS layer for sigap.
//!
//! This crate provides:
//! - Environment-driven connection configuration
//! - Connection pool management
//! - [`PgSpatialStore`], the PostGIS [`sigap_core::SpatialStore`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use sigap_db::{ConnectionConfig, Database};
//! use sigap_core::{OverlapDefaults, OverlapRequest, SpatialStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect(&ConnectionConfig::from_env(), 4326).await?;
//!     let request = OverlapRequest::resolve(
//!         Some("parcels"), Some("forest"), None, &OverlapDefaults::default(),
//!     )?;
//!     let rows = db.spatial.overlap_pairs(&request).await?;
//!     println!("{} intersecting pairs", rows.len());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod pool;
pub mod spatial;

// Test fixtures for integration tests
pub mod test_fixtures;

pub use config::ConnectionConfig;
pub use pool::{create_pool, log_pool_metrics, PoolConfig};
pub use spatial::PgSpatialStore;

use sqlx::PgPool;

use sigap_core::Result;

/// Process-scoped handle to the spatial store, shared by every request.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: PgPool,
    /// Overlap and layer queries.
    pub spatial: PgSpatialStore,
}

impl Database {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool, srid: i32) -> Self {
        Self {
            spatial: PgSpatialStore::new(pool.clone(), srid),
            pool,
        }
    }

    /// Connect using `config`; `srid` is stamped on bbox envelopes.
    pub async fn connect(config: &ConnectionConfig, srid: i32) -> Result<Self> {
        let pool = create_pool(config.connect_options(), config.pool_config()).await?;
        Ok(Self::new(pool, srid))
    }
}
