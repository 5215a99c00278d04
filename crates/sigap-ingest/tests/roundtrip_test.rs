//! End-to-end import through the real `ogr2ogr` into PostGIS.
//!
//! Requires `ogr2ogr` on PATH and a PostGIS database (`PG*` env); run with
//! `cargo test -p sigap-ingest -- --ignored`.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use sigap_core::{FeatureCollection, OverlapDefaults, OverlapRequest, SpatialStore};
use sigap_db::test_fixtures::{unique_layer_name, TestDatabase};
use sigap_db::ConnectionConfig;
use sigap_ingest::{IngestConfig, IngestPipeline, Ogr2OgrImporter};

const PARCELS_GEOJSON: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"name": "a"},
     "geometry": {"type": "Polygon", "coordinates": [[[106.80,-6.20],[106.81,-6.20],[106.81,-6.19],[106.80,-6.19],[106.80,-6.20]]]}},
    {"type": "Feature", "properties": {"name": "b"},
     "geometry": {"type": "Polygon", "coordinates": [[[106.82,-6.20],[106.83,-6.20],[106.83,-6.19],[106.82,-6.19],[106.82,-6.20]]]}},
    {"type": "Feature", "properties": {"name": "c"},
     "geometry": {"type": "MultiPolygon", "coordinates": [[[[106.84,-6.20],[106.85,-6.20],[106.85,-6.19],[106.84,-6.19],[106.84,-6.20]]]]}}
  ]
}"#;

/// Convert GeoJSON to a shapefile set with ogr2ogr and zip it.
fn build_shapefile_zip(dir: &Path, stem: &str) -> std::path::PathBuf {
    let geojson = dir.join("source.geojson");
    std::fs::write(&geojson, PARCELS_GEOJSON).unwrap();
    let shp = dir.join(format!("{}.shp", stem));
    let status = std::process::Command::new("ogr2ogr")
        .args(["-f", "ESRI Shapefile", "-nlt", "PROMOTE_TO_MULTI"])
        .arg(&shp)
        .arg(&geojson)
        .status()
        .expect("ogr2ogr must be installed");
    assert!(status.success());

    let zip_path = dir.join("upload.zip");
    let mut zip = ZipWriter::new(File::create(&zip_path).unwrap());
    for ext in ["shp", "shx", "dbf", "prj"] {
        let path = dir.join(format!("{}.{}", stem, ext));
        if let Ok(bytes) = std::fs::read(&path) {
            zip.start_file(format!("{}.{}", stem, ext), SimpleFileOptions::default())
                .unwrap();
            zip.write_all(&bytes).unwrap();
        }
    }
    zip.finish().unwrap();
    zip_path
}

#[tokio::test]
#[ignore = "requires ogr2ogr and PostGIS"]
async fn test_upload_roundtrip_feature_count_and_self_overlap() {
    let test_db = TestDatabase::connect().await;
    let scratch = tempfile::tempdir().unwrap();
    let uploads = tempfile::tempdir().unwrap();

    let expected_table = unique_layer_name("rt");
    let zip_path = build_shapefile_zip(scratch.path(), expected_table.as_str());

    let importer = Arc::new(Ogr2OgrImporter::new(&ConnectionConfig::from_env()));
    let pipeline = IngestPipeline::new(
        importer,
        IngestConfig {
            upload_dir: uploads.path().to_path_buf(),
            ..Default::default()
        },
    );

    let workspace = pipeline.allocate_workspace().await.unwrap();
    std::fs::copy(&zip_path, workspace.archive_path()).unwrap();
    let outcome = pipeline.ingest(Arc::new(workspace)).await.unwrap();
    assert_eq!(outcome.table, expected_table);
    assert_eq!(std::fs::read_dir(uploads.path()).unwrap().count(), 0);

    let store = &test_db.db.spatial;
    assert_eq!(store.feature_count(&outcome.table).await.unwrap(), 3);

    let request = OverlapRequest::resolve(
        Some(outcome.table.as_str()),
        Some(outcome.table.as_str()),
        None,
        &OverlapDefaults::default(),
    )
    .unwrap();
    let fc = FeatureCollection::from_rows(store.overlap_pairs(&request).await.unwrap());
    let self_pairs: Vec<_> = fc
        .features
        .iter()
        .filter(|f| f.properties.id1 == f.properties.id2)
        .collect();
    assert_eq!(self_pairs.len(), 3);
    for feature in self_pairs {
        let own = test_db
            .feature_area(&outcome.table, feature.properties.id1)
            .await;
        let diff = (feature.properties.luas_overlap_m2 - own).abs();
        assert!(diff <= own * 1e-6, "id {}: diff {}", feature.properties.id1, diff);
    }

    // Re-import overwrites rather than appends.
    let workspace = pipeline.allocate_workspace().await.unwrap();
    std::fs::copy(&zip_path, workspace.archive_path()).unwrap();
    pipeline.ingest(Arc::new(workspace)).await.unwrap();
    assert_eq!(store.feature_count(&outcome.table).await.unwrap(), 3);

    test_db.drop_layer(&outcome.table).await;
}
