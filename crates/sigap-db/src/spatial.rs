//! PostGIS implementation of [`SpatialStore`].
//!
//! Geometry work (intersection, geodesic area, GeoJSON rendering) is done by
//! the store. Layer names occupy the only non-parameterized positions and are
//! accepted exclusively as validated [`LayerName`]s; bbox values and the SRID
//! are bound parameters.

use std::time::Instant;

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::{debug, info};

use sigap_core::defaults::{FID_COLUMN, GEOMETRY_COLUMN};
use sigap_core::{Error, LayerName, OverlapRequest, OverlapRow, Result, SpatialStore};

use crate::pool::log_pool_metrics;

/// PostgreSQL + PostGIS spatial store.
#[derive(Clone)]
pub struct PgSpatialStore {
    pool: Pool<Postgres>,
    srid: i32,
}

impl PgSpatialStore {
    /// Create a store; `srid` is used for bbox envelopes.
    pub fn new(pool: Pool<Postgres>, srid: i32) -> Self {
        Self { pool, srid }
    }
}

/// Build the pairwise intersection join.
///
/// With `with_bbox`, expects binds `$1..$4` = minx, miny, maxx, maxy and
/// `$5` = SRID.
pub(crate) fn overlap_sql(layer1: &LayerName, layer2: &LayerName, with_bbox: bool) -> String {
    let geom = GEOMETRY_COLUMN;
    let fid = FID_COLUMN;
    let mut sql = format!(
        r#"
        SELECT
            a.{fid}::bigint AS id1,
            b.{fid}::bigint AS id2,
            ST_Area(i.geom::geography) AS area_m2,
            CASE WHEN ST_IsEmpty(i.geom) THEN NULL ELSE ST_AsGeoJSON(i.geom) END AS geom_json
        FROM {l1} a
        JOIN {l2} b ON ST_Intersects(a.{geom}, b.{geom})
        CROSS JOIN LATERAL (SELECT ST_Intersection(a.{geom}, b.{geom}) AS geom) i
        "#,
        l1 = layer1.quoted(),
        l2 = layer2.quoted(),
    );
    if with_bbox {
        sql.push_str(&format!(
            "WHERE ST_Intersects(a.{geom}, ST_MakeEnvelope($1, $2, $3, $4, $5))\n        "
        ));
    }
    sql.push_str(&format!("ORDER BY a.{fid}, b.{fid}"));
    sql
}

pub(crate) fn feature_count_sql(layer: &LayerName) -> String {
    format!("SELECT COUNT(*) FROM {}", layer.quoted())
}

#[async_trait]
impl SpatialStore for PgSpatialStore {
    async fn overlap_pairs(&self, request: &OverlapRequest) -> Result<Vec<OverlapRow>> {
        let start = Instant::now();
        let sql = overlap_sql(&request.layer1, &request.layer2, request.bbox.is_some());

        debug!(
            subsystem = "database",
            component = "spatial",
            op = "overlap_pairs",
            layer1 = %request.layer1,
            layer2 = %request.layer2,
            bbox = ?request.bbox,
            "Executing overlap join"
        );

        let mut query = sqlx::query(&sql);
        if let Some(bbox) = request.bbox {
            query = query
                .bind(bbox.min_x)
                .bind(bbox.min_y)
                .bind(bbox.max_x)
                .bind(bbox.max_y)
                .bind(self.srid);
        }

        let rows = query.fetch_all(&self.pool).await.map_err(Error::from)?;

        let pairs = rows
            .iter()
            .map(|row| -> std::result::Result<OverlapRow, sqlx::Error> {
                Ok(OverlapRow {
                    id1: row.try_get("id1")?,
                    id2: row.try_get("id2")?,
                    area_m2: row.try_get("area_m2")?,
                    geometry_json: row.try_get("geom_json")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)?;

        info!(
            subsystem = "database",
            component = "spatial",
            op = "overlap_pairs",
            layer1 = %request.layer1,
            layer2 = %request.layer2,
            result_count = pairs.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Overlap query complete"
        );
        Ok(pairs)
    }

    async fn feature_count(&self, layer: &LayerName) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(&feature_count_sql(layer))
            .fetch_one(&self.pool)
            .await
            .map_err(Error::from)?;
        debug!(
            subsystem = "database",
            component = "spatial",
            op = "feature_count",
            db_table = %layer,
            count,
            "Counted layer features"
        );
        Ok(count)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(Error::from)?;
        log_pool_metrics(&self.pool);
        Ok(())
    }
}
