//! Parcel GeoJSON parsing and on-disk registry
//!
//! Parcels arrive as GeoJSON: a bare Polygon geometry, a Feature, or a
//! FeatureCollection (first feature wins). MultiPolygon input keeps the
//! largest exterior ring. The registry stores one GeoJSON file per
//! parcel under a root directory.

use crate::core::geometry::{self, validate_ring};
use crate::types::{HealthError, HealthResult, Parcel};
use chrono::{DateTime, Utc};
use geo::Coord;
use geojson::{Feature, FeatureCollection, GeoJson, Geometry, Value};
use serde_json::{Map, Number};
use std::path::{Path, PathBuf};

/// Parse a parcel from a GeoJSON string.
///
/// `fallback_id` is used when the properties carry no id.
pub fn parcel_from_geojson(input: &str, fallback_id: u64) -> HealthResult<Parcel> {
    let geojson: GeoJson = input.parse()?;

    let (geometry, properties) = match &geojson {
        GeoJson::Geometry(g) => (g, None),
        GeoJson::Feature(f) => match &f.geometry {
            Some(g) => (g, f.properties.as_ref()),
            None => {
                return Err(HealthError::InvalidGeometry(
                    "feature carries no geometry".to_string(),
                ));
            }
        },
        GeoJson::FeatureCollection(fc) => match fc.features.first() {
            Some(f) => match &f.geometry {
                Some(g) => (g, f.properties.as_ref()),
                None => {
                    return Err(HealthError::InvalidGeometry(
                        "first feature carries no geometry".to_string(),
                    ));
                }
            },
            None => {
                return Err(HealthError::InvalidGeometry(
                    "empty feature collection".to_string(),
                ));
            }
        },
    };

    let ring = exterior_ring(geometry)?;

    let coords: Vec<Coord<f64>> = ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect();
    validate_ring(&coords)?;

    let mut parcel = Parcel::new(fallback_id, "unnamed parcel", ring);

    if let Some(props) = properties {
        if let Some(id) = props.get("id").and_then(|v| v.as_u64()) {
            parcel.id = id;
        }
        if let Some(name) = props.get("name").and_then(|v| v.as_str()) {
            parcel.name = name.to_string();
        }
        if let Some(desc) = props.get("description").and_then(|v| v.as_str()) {
            parcel.description = desc.to_string();
        }
        if let Some(created) = props
            .get("created_at")
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp)
        {
            parcel.created_at = created;
        }
        parcel.last_computed_at = props
            .get("last_computed_at")
            .and_then(|v| v.as_str())
            .and_then(parse_timestamp);
    }

    Ok(parcel)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Extract the exterior ring from a (Multi)Polygon geometry.
fn exterior_ring(geometry: &Geometry) -> HealthResult<Vec<[f64; 2]>> {
    match &geometry.value {
        Value::Polygon(rings) => {
            let exterior = rings.first().ok_or_else(|| {
                HealthError::InvalidGeometry("polygon carries no rings".to_string())
            })?;
            positions_to_ring(exterior)
        }
        Value::MultiPolygon(polygons) => {
            // Keep the largest exterior ring
            let mut best: Option<(f64, Vec<[f64; 2]>)> = None;
            for polygon in polygons {
                let exterior = match polygon.first() {
                    Some(r) => r,
                    None => continue,
                };
                let ring = positions_to_ring(exterior)?;
                let coords: Vec<Coord<f64>> =
                    ring.iter().map(|p| Coord { x: p[0], y: p[1] }).collect();
                let area = geometry::ring_area_hectares(&coords);
                if best.as_ref().map_or(true, |(a, _)| area > *a) {
                    best = Some((area, ring));
                }
            }
            best.map(|(_, ring)| ring).ok_or_else(|| {
                HealthError::InvalidGeometry("multipolygon carries no rings".to_string())
            })
        }
        _ => Err(HealthError::InvalidGeometry(
            "geometry must be Polygon or MultiPolygon".to_string(),
        )),
    }
}

fn positions_to_ring(positions: &[Vec<f64>]) -> HealthResult<Vec<[f64; 2]>> {
    positions
        .iter()
        .map(|p| {
            if p.len() < 2 {
                Err(HealthError::InvalidGeometry(
                    "position carries fewer than two coordinates".to_string(),
                ))
            } else {
                Ok([p[0], p[1]])
            }
        })
        .collect()
}

/// Serialize a parcel to a GeoJSON Feature.
pub fn parcel_to_feature(parcel: &Parcel) -> Feature {
    let positions: Vec<Vec<f64>> = parcel.ring.iter().map(|p| vec![p[0], p[1]]).collect();

    let mut properties = Map::new();
    properties.insert(
        "id".to_string(),
        serde_json::Value::Number(Number::from(parcel.id)),
    );
    properties.insert(
        "name".to_string(),
        serde_json::Value::String(parcel.name.clone()),
    );
    properties.insert(
        "description".to_string(),
        serde_json::Value::String(parcel.description.clone()),
    );
    properties.insert(
        "created_at".to_string(),
        serde_json::Value::String(parcel.created_at.to_rfc3339()),
    );
    if let Some(computed) = parcel.last_computed_at {
        properties.insert(
            "last_computed_at".to_string(),
            serde_json::Value::String(computed.to_rfc3339()),
        );
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Polygon(vec![positions]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Serialize parcels to a FeatureCollection.
pub fn parcels_to_collection(parcels: &[Parcel]) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features: parcels.iter().map(parcel_to_feature).collect(),
        foreign_members: None,
    }
}

/// Directory-backed parcel registry: one GeoJSON file per parcel.
pub struct ParcelStore {
    root: PathBuf,
}

impl ParcelStore {
    /// Open (creating if needed) a registry rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> HealthResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: u64) -> PathBuf {
        self.root.join(format!("{}.geojson", id))
    }

    /// Persist a parcel, overwriting any previous version.
    pub fn save(&self, parcel: &Parcel) -> HealthResult<PathBuf> {
        let feature = parcel_to_feature(parcel);
        let path = self.path_for(parcel.id);
        std::fs::write(&path, serde_json::to_string_pretty(&feature)?)?;
        log::debug!("Saved parcel {} to {}", parcel.id, path.display());
        Ok(path)
    }

    /// Load one parcel by id.
    pub fn load(&self, id: u64) -> HealthResult<Parcel> {
        let content = std::fs::read_to_string(self.path_for(id))?;
        parcel_from_geojson(&content, id)
    }

    /// Load every parcel in the registry, ordered by id.
    pub fn list(&self) -> HealthResult<Vec<Parcel>> {
        let mut parcels = Vec::new();

        for entry in std::fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("geojson") {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            match parcel_from_geojson(&content, 0) {
                Ok(parcel) => parcels.push(parcel),
                Err(e) => {
                    log::warn!("Skipping unreadable parcel file {}: {}", path.display(), e);
                }
            }
        }

        parcels.sort_by_key(|p| p.id);
        Ok(parcels)
    }

    /// Remove one parcel by id.
    pub fn remove(&self, id: u64) -> HealthResult<()> {
        std::fs::remove_file(self.path_for(id))?;
        log::debug!("Removed parcel {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLYGON: &str = r#"{
        "type": "Polygon",
        "coordinates": [[[10.0, 45.0], [10.1, 45.0], [10.1, 45.1], [10.0, 45.1], [10.0, 45.0]]]
    }"#;

    #[test]
    fn test_parse_bare_polygon() {
        let parcel = parcel_from_geojson(POLYGON, 3).unwrap();
        assert_eq!(parcel.id, 3);
        assert_eq!(parcel.name, "unnamed parcel");
        assert_eq!(parcel.ring.len(), 5);
        assert_eq!(parcel.ring[0], [10.0, 45.0]);
    }

    #[test]
    fn test_parse_feature_with_properties() {
        let input = format!(
            r#"{{"type": "Feature", "geometry": {}, "properties": {{
                "id": 12, "name": "South Field", "description": "barley"
            }}}}"#,
            POLYGON
        );
        let parcel = parcel_from_geojson(&input, 0).unwrap();
        assert_eq!(parcel.id, 12);
        assert_eq!(parcel.name, "South Field");
        assert_eq!(parcel.description, "barley");
    }

    #[test]
    fn test_parse_multipolygon_keeps_largest_ring() {
        let input = r#"{
            "type": "MultiPolygon",
            "coordinates": [
                [[[0.0, 0.0], [0.01, 0.0], [0.01, 0.01], [0.0, 0.0]]],
                [[[5.0, 5.0], [6.0, 5.0], [6.0, 6.0], [5.0, 6.0], [5.0, 5.0]]]
            ]
        }"#;
        let parcel = parcel_from_geojson(input, 1).unwrap();
        assert_eq!(parcel.ring[0], [5.0, 5.0]);
        assert_eq!(parcel.ring.len(), 5);
    }

    #[test]
    fn test_reject_point_geometry() {
        let input = r#"{"type": "Point", "coordinates": [10.0, 45.0]}"#;
        let err = parcel_from_geojson(input, 1).unwrap_err();
        assert!(err.to_string().contains("Polygon or MultiPolygon"));
    }

    #[test]
    fn test_reject_unclosed_ring() {
        let input = r#"{
            "type": "Polygon",
            "coordinates": [[[10.0, 45.0], [10.1, 45.0], [10.1, 45.1], [10.0, 45.1]]]
        }"#;
        assert!(parcel_from_geojson(input, 1).is_err());
    }

    #[test]
    fn test_feature_round_trip() {
        let mut parcel = parcel_from_geojson(POLYGON, 42).unwrap();
        parcel.name = "West Field".to_string();
        parcel.last_computed_at = Some(Utc::now());

        let feature = parcel_to_feature(&parcel);
        let serialized = serde_json::to_string(&feature).unwrap();
        let restored = parcel_from_geojson(&serialized, 0).unwrap();

        assert_eq!(restored.id, 42);
        assert_eq!(restored.name, "West Field");
        assert_eq!(restored.ring, parcel.ring);
        assert!(restored.last_computed_at.is_some());
    }
}
