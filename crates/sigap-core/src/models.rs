//! Data model for overlap requests and GeoJSON-shaped results.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::warn;

use crate::defaults::{DEFAULT_LAYER1, DEFAULT_LAYER2};
use crate::error::Result;
use crate::identifier::LayerName;

// =============================================================================
// REQUEST
// =============================================================================

/// Axis-aligned region `minx,miny,maxx,maxy` in the target reference system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Parse `"minx,miny,maxx,maxy"`.
    ///
    /// Returns `None` unless there are exactly four finite numbers with
    /// `minx <= maxx` and `miny <= maxy`. Callers treat `None` as "no filter".
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<f64> = raw
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        let [min_x, min_y, max_x, max_y] = parts.as_slice() else {
            return None;
        };
        let bbox = Self {
            min_x: *min_x,
            min_y: *min_y,
            max_x: *max_x,
            max_y: *max_y,
        };
        bbox.is_well_formed().then_some(bbox)
    }

    fn is_well_formed(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }
}

/// Fallback layers used when a request omits `layer1` / `layer2`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapDefaults {
    pub layer1: String,
    pub layer2: String,
}

impl Default for OverlapDefaults {
    fn default() -> Self {
        Self {
            layer1: DEFAULT_LAYER1.to_string(),
            layer2: DEFAULT_LAYER2.to_string(),
        }
    }
}

/// A resolved overlap query: two validated layers and an optional region.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRequest {
    pub layer1: LayerName,
    pub layer2: LayerName,
    pub bbox: Option<BoundingBox>,
}

impl OverlapRequest {
    /// Resolve raw query parameters.
    ///
    /// Omitted or empty layers fall back to `defaults`; both layers are then
    /// sanitized and validated. A malformed `bbox` is dropped, not rejected.
    pub fn resolve(
        layer1: Option<&str>,
        layer2: Option<&str>,
        bbox: Option<&str>,
        defaults: &OverlapDefaults,
    ) -> Result<Self> {
        let pick = |raw: Option<&str>, fallback: &str| match raw {
            Some(s) if !s.is_empty() => LayerName::sanitize(s),
            _ => LayerName::sanitize(fallback),
        };
        let layer1 = pick(layer1, &defaults.layer1)?;
        let layer2 = pick(layer2, &defaults.layer2)?;

        let bbox = match bbox {
            Some(raw) if !raw.is_empty() => {
                let parsed = BoundingBox::parse(raw);
                if parsed.is_none() {
                    warn!(
                        subsystem = "core",
                        component = "overlap",
                        bbox = raw,
                        "Ignoring malformed bbox, querying without region filter"
                    );
                }
                parsed
            }
            _ => None,
        };

        Ok(Self {
            layer1,
            layer2,
            bbox,
        })
    }
}

// =============================================================================
// RESULT
// =============================================================================

/// One matched pair as returned by a spatial store.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlapRow {
    pub id1: i64,
    pub id2: i64,
    /// Geodesic intersection area in square meters.
    pub area_m2: Option<f64>,
    /// Intersection geometry as GeoJSON text; `None` when empty.
    pub geometry_json: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapProperties {
    pub id1: i64,
    pub id2: i64,
    pub luas_overlap_m2: f64,
}

/// GeoJSON `Feature` for one intersecting pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverlapFeature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Option<JsonValue>,
    pub properties: OverlapProperties,
}

impl OverlapFeature {
    pub fn from_row(row: OverlapRow) -> Self {
        let geometry = row.geometry_json.as_deref().and_then(|text| {
            match serde_json::from_str::<JsonValue>(text) {
                Ok(value) if is_geojson_geometry(&value) => Some(value),
                Ok(_) => {
                    warn!(
                        subsystem = "core",
                        component = "overlap",
                        id1 = row.id1,
                        id2 = row.id2,
                        "Intersection is not a GeoJSON geometry, emitting null"
                    );
                    None
                }
                Err(e) => {
                    warn!(
                        subsystem = "core",
                        component = "overlap",
                        id1 = row.id1,
                        id2 = row.id2,
                        error = %e,
                        "Unparseable intersection GeoJSON, emitting null"
                    );
                    None
                }
            }
        });

        Self {
            kind: "Feature".to_string(),
            geometry,
            properties: OverlapProperties {
                id1: row.id1,
                id2: row.id2,
                // f64::max discards NaN
                luas_overlap_m2: row.area_m2.unwrap_or(0.0).max(0.0),
            },
        }
    }
}

fn is_geojson_geometry(value: &JsonValue) -> bool {
    value.get("type").is_some_and(JsonValue::is_string)
}

/// GeoJSON `FeatureCollection` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    pub features: Vec<OverlapFeature>,
}

impl FeatureCollection {
    pub fn from_rows(rows: Vec<OverlapRow>) -> Self {
        Self {
            kind: "FeatureCollection".to_string(),
            features: rows.into_iter().map(OverlapFeature::from_row).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    #[test]
    fn test_bbox_parse_valid() {
        let bbox = BoundingBox::parse("106.5,-6.5,107.0,-6.0").unwrap();
        assert_eq!(bbox.min_x, 106.5);
        assert_eq!(bbox.min_y, -6.5);
        assert_eq!(bbox.max_x, 107.0);
        assert_eq!(bbox.max_y, -6.0);
    }

    #[test]
    fn test_bbox_parse_tolerates_whitespace() {
        assert!(BoundingBox::parse(" 1, 2 ,3 ,4 ").is_some());
    }

    #[test]
    fn test_bbox_parse_rejects_wrong_arity() {
        assert!(BoundingBox::parse("1,2,3").is_none());
        assert!(BoundingBox::parse("1,2,3,4,5").is_none());
        assert!(BoundingBox::parse("").is_none());
    }

    #[test]
    fn test_bbox_parse_rejects_non_numeric_and_non_finite() {
        assert!(BoundingBox::parse("a,b,c,d").is_none());
        assert!(BoundingBox::parse("1,2,3,x").is_none());
        assert!(BoundingBox::parse("NaN,0,1,1").is_none());
        assert!(BoundingBox::parse("0,0,inf,1").is_none());
    }

    #[test]
    fn test_bbox_parse_rejects_inverted() {
        assert!(BoundingBox::parse("10,0,5,1").is_none());
        assert!(BoundingBox::parse("0,10,1,5").is_none());
        // Degenerate (zero-area) boxes are allowed.
        assert!(BoundingBox::parse("1,1,1,1").is_some());
    }

    #[test]
    fn test_resolve_uses_defaults_when_omitted_or_empty() {
        let defaults = OverlapDefaults::default();
        let req = OverlapRequest::resolve(None, Some(""), None, &defaults).unwrap();
        assert_eq!(req.layer1.as_str(), DEFAULT_LAYER1);
        assert_eq!(req.layer2.as_str(), DEFAULT_LAYER2);
        assert!(req.bbox.is_none());
    }

    #[test]
    fn test_resolve_sanitizes_layers() {
        let defaults = OverlapDefaults::default();
        let req =
            OverlapRequest::resolve(Some("Parcels-A"), Some("hutan lindung"), None, &defaults)
                .unwrap();
        assert_eq!(req.layer1.as_str(), "parcels_a");
        assert_eq!(req.layer2.as_str(), "hutan_lindung");
    }

    #[test]
    fn test_resolve_rejects_overlong_layer() {
        let defaults = OverlapDefaults::default();
        let long = "a".repeat(100);
        let err = OverlapRequest::resolve(Some(&long), None, None, &defaults).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier(_)));
    }

    #[test]
    fn test_resolve_malformed_bbox_equals_absent_bbox() {
        let defaults = OverlapDefaults::default();
        let without = OverlapRequest::resolve(Some("a"), Some("b"), None, &defaults).unwrap();
        for raw in ["1,2,3", "x,y,z,w", "1,2,3,4,5", "NaN,1,2,3"] {
            let with = OverlapRequest::resolve(Some("a"), Some("b"), Some(raw), &defaults).unwrap();
            assert_eq!(with, without, "bbox {:?} should be ignored", raw);
        }
    }

    #[test]
    fn test_resolve_keeps_valid_bbox() {
        let defaults = OverlapDefaults::default();
        let req = OverlapRequest::resolve(Some("a"), Some("b"), Some("0,0,1,1"), &defaults)
            .unwrap();
        assert!(req.bbox.is_some());
    }

    #[test]
    fn test_feature_from_row_with_geometry() {
        let row = OverlapRow {
            id1: 1,
            id2: 2,
            area_m2: Some(1234.5),
            geometry_json: Some(
                r#"{"type":"MultiPolygon","coordinates":[[[[0,0],[1,0],[1,1],[0,0]]]]}"#
                    .to_string(),
            ),
        };
        let feature = OverlapFeature::from_row(row);
        assert_eq!(feature.kind, "Feature");
        assert_eq!(feature.geometry.as_ref().unwrap()["type"], "MultiPolygon");
        assert_eq!(feature.properties.id1, 1);
        assert_eq!(feature.properties.id2, 2);
        assert_eq!(feature.properties.luas_overlap_m2, 1234.5);
    }

    #[test]
    fn test_feature_from_row_degenerate_geometry_is_null_not_dropped() {
        let rows = vec![
            OverlapRow {
                id1: 1,
                id2: 1,
                area_m2: Some(0.0),
                geometry_json: None,
            },
            OverlapRow {
                id1: 2,
                id2: 3,
                area_m2: None,
                geometry_json: Some("not json".to_string()),
            },
            OverlapRow {
                id1: 4,
                id2: 5,
                area_m2: Some(f64::NAN),
                geometry_json: Some("[1,2]".to_string()),
            },
        ];
        let fc = FeatureCollection::from_rows(rows);
        assert_eq!(fc.features.len(), 3);
        assert!(fc.features.iter().all(|f| f.geometry.is_none()));
        assert!(fc
            .features
            .iter()
            .all(|f| f.properties.luas_overlap_m2 == 0.0));
    }

    #[test]
    fn test_feature_collection_wire_shape() {
        let fc = FeatureCollection::from_rows(vec![OverlapRow {
            id1: 7,
            id2: 9,
            area_m2: Some(10.0),
            geometry_json: None,
        }]);
        let value = serde_json::to_value(&fc).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "FeatureCollection",
                "features": [{
                    "type": "Feature",
                    "geometry": null,
                    "properties": { "id1": 7, "id2": 9, "luas_overlap_m2": 10.0 }
                }]
            })
        );
    }

    #[test]
    fn test_empty_feature_collection() {
        let value = serde_json::to_value(FeatureCollection::from_rows(vec![])).unwrap();
        assert_eq!(value, json!({ "type": "FeatureCollection", "features": [] }));
    }
}
