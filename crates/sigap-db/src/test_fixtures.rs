//! Test fixtures for PostGIS-backed integration tests.
//!
//! Connection parameters come from the usual `PG*` variables (a `.env` file
//! is honoured). Tests using these fixtures are `#[ignore]`d by default; run
//! them with `cargo test -- --ignored` against a database with PostGIS.
//!
//! ```rust,ignore
//! let test_db = TestDatabase::connect().await;
//! let layer = test_db
//!     .create_layer("parcels", &["POLYGON((0 0,1 0,1 1,0 1,0 0))"])
//!     .await;
//! // ...
//! test_db.drop_layer(&layer).await;
//! ```

use sigap_core::defaults::{FID_COLUMN, GEOMETRY_COLUMN, TARGET_SRID};
use sigap_core::LayerName;

use crate::{ConnectionConfig, Database};

/// Database connection for a single test.
pub struct TestDatabase {
    pub db: Database,
}

impl TestDatabase {
    /// Connect with `PG*` environment configuration.
    pub async fn connect() -> Self {
        dotenv_if_present();
        let config = ConnectionConfig::from_env();
        let db = Database::connect(&config, TARGET_SRID)
            .await
            .expect("Failed to connect to test database");
        sqlx::query("CREATE EXTENSION IF NOT EXISTS postgis")
            .execute(&db.pool)
            .await
            .expect("PostGIS extension is required");
        Self { db }
    }

    /// Create a layer shaped like an importer-produced table, one feature per
    /// WKT polygon. Ids are assigned 1, 2, ... in input order.
    pub async fn create_layer(&self, prefix: &str, wkts: &[&str]) -> LayerName {
        let name = unique_layer_name(prefix);
        sqlx::query(&format!(
            "CREATE TABLE {} ({} serial PRIMARY KEY, {} geometry(MultiPolygon, {}))",
            name.quoted(),
            FID_COLUMN,
            GEOMETRY_COLUMN,
            TARGET_SRID
        ))
        .execute(&self.db.pool)
        .await
        .expect("Failed to create test layer");

        for wkt in wkts {
            sqlx::query(&format!(
                "INSERT INTO {} ({}) VALUES (ST_Multi(ST_GeomFromText($1, $2)))",
                name.quoted(),
                GEOMETRY_COLUMN
            ))
            .bind(*wkt)
            .bind(TARGET_SRID)
            .execute(&self.db.pool)
            .await
            .expect("Failed to insert test feature");
        }
        name
    }

    /// Geodesic area of one feature, for comparisons.
    pub async fn feature_area(&self, layer: &LayerName, id: i64) -> f64 {
        sqlx::query_scalar(&format!(
            "SELECT ST_Area({}::geography) FROM {} WHERE {} = $1",
            GEOMETRY_COLUMN,
            layer.quoted(),
            FID_COLUMN
        ))
        .bind(id as i32)
        .fetch_one(&self.db.pool)
        .await
        .expect("Failed to compute feature area")
    }

    pub async fn drop_layer(&self, layer: &LayerName) {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", layer.quoted()))
            .execute(&self.db.pool)
            .await
            .expect("Failed to drop test layer");
    }
}

/// `<prefix>_<nanos>` sanitized into a valid layer name.
pub fn unique_layer_name(prefix: &str) -> LayerName {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let counter = NEXT_ID.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
    LayerName::sanitize(&format!("test_{}_{}_{}", prefix, nanos, counter))
        .expect("test layer name must be valid")
}

static NEXT_ID: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

fn dotenv_if_present() {
    let _ = dotenvy::dotenv();
}
