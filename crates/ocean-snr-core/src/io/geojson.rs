//! Region polygons from GeoJSON.
//!
//! Each feature of a `FeatureCollection` becomes one [`Region`]. The feature
//! must carry an integer `id` property (falling back to the feature `id`) and
//! may carry a `name`. `Polygon` and `MultiPolygon` geometries are supported.

use crate::errors::{SnrError, SnrResult};
use crate::region::{Polygon, Region, Ring};
use serde_json::Value;
use std::path::Path;

fn parse_ring(value: &Value) -> SnrResult<Ring> {
    let points = value
        .as_array()
        .ok_or_else(|| SnrError::parse("GeoJSON ring", "expected an array of positions"))?;
    points
        .iter()
        .map(|p| {
            let lon = p.get(0).and_then(Value::as_f64);
            let lat = p.get(1).and_then(Value::as_f64);
            match (lon, lat) {
                (Some(lon), Some(lat)) => Ok((lon, lat)),
                _ => Err(SnrError::parse("GeoJSON position", p)),
            }
        })
        .collect()
}

fn parse_polygon(value: &Value) -> SnrResult<Polygon> {
    let rings = value
        .as_array()
        .ok_or_else(|| SnrError::parse("GeoJSON polygon", "expected an array of rings"))?;
    let mut rings = rings.iter().map(parse_ring);
    let exterior = rings
        .next()
        .ok_or_else(|| SnrError::parse("GeoJSON polygon", "no exterior ring"))??;
    let holes = rings.collect::<SnrResult<Vec<_>>>()?;
    Ok(Polygon::with_holes(exterior, holes))
}

fn parse_geometry(geometry: &Value) -> SnrResult<Vec<Polygon>> {
    let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("");
    let coordinates = geometry
        .get("coordinates")
        .ok_or_else(|| SnrError::parse("GeoJSON geometry", "missing coordinates"))?;
    match kind {
        "Polygon" => Ok(vec![parse_polygon(coordinates)?]),
        "MultiPolygon" => coordinates
            .as_array()
            .ok_or_else(|| SnrError::parse("GeoJSON multipolygon", "expected an array"))?
            .iter()
            .map(parse_polygon)
            .collect(),
        other => Err(SnrError::parse(
            "GeoJSON geometry",
            format!("unsupported geometry type `{}`", other),
        )),
    }
}

fn parse_feature(feature: &Value, index: usize) -> SnrResult<Region> {
    let properties = feature.get("properties");
    let id = properties
        .and_then(|p| p.get("id"))
        .or_else(|| feature.get("id"))
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            SnrError::parse(
                format!("GeoJSON feature {}", index),
                "missing integer `id` property",
            )
        })?;
    let name = properties
        .and_then(|p| p.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Region {}", id));
    let geometry = feature.get("geometry").ok_or_else(|| {
        SnrError::parse(format!("GeoJSON feature {}", index), "missing geometry")
    })?;
    Ok(Region::new(id, &name, parse_geometry(geometry)?))
}

/// Parse regions from GeoJSON text.
pub fn parse_regions(text: &str) -> SnrResult<Vec<Region>> {
    let doc: Value = serde_json::from_str(text)?;
    let features = doc
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| SnrError::parse("GeoJSON", "expected a FeatureCollection"))?;
    features
        .iter()
        .enumerate()
        .map(|(i, f)| parse_feature(f, i))
        .collect()
}

/// Read regions from a GeoJSON file.
pub fn read_regions<P: AsRef<Path>>(path: P) -> SnrResult<Vec<Region>> {
    let text = std::fs::read_to_string(path.as_ref())?;
    parse_regions(&text)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGIONS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"id": 1, "name": "Tropical Atlantic"},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [
                        [[-60, -20], [10, -20], [10, 20], [-60, 20], [-60, -20]],
                        [[-30, -5], [-20, -5], [-20, 5], [-30, 5], [-30, -5]]
                    ]
                }
            },
            {
                "type": "Feature",
                "id": 2,
                "properties": {},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [
                        [[[100, 0], [110, 0], [110, 10], [100, 0]]],
                        [[[120, 0], [130, 0], [130, 10], [120, 0]]]
                    ]
                }
            }
        ]
    }"#;

    #[test]
    fn parses_polygons_and_multipolygons() {
        let regions = parse_regions(REGIONS).unwrap();
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].id, 1);
        assert_eq!(regions[0].name, "Tropical Atlantic");
        assert_eq!(regions[0].parts[0].holes.len(), 1);
        assert!(regions[0].contains(0.0, 0.0));
        assert!(!regions[0].contains(-25.0, 0.0));

        assert_eq!(regions[1].id, 2);
        assert_eq!(regions[1].name, "Region 2");
        assert_eq!(regions[1].parts.len(), 2);
    }

    #[test]
    fn missing_id_is_error() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
        ]}"#;
        assert!(matches!(parse_regions(text), Err(SnrError::Parse { .. })));
    }

    #[test]
    fn unsupported_geometry_is_error() {
        let text = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"id": 3},
             "geometry": {"type": "Point", "coordinates": [0, 0]}}
        ]}"#;
        assert!(matches!(parse_regions(text), Err(SnrError::Parse { .. })));
    }

    #[test]
    fn invalid_json_is_json_error() {
        assert!(matches!(parse_regions("{"), Err(SnrError::Json(_))));
    }
}
