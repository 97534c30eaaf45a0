//! Polygon ring utilities for parcel geometry
//!
//! All operations work on a closed exterior ring of lon/lat coordinates.
//! Clipping uses Sutherland-Hodgman against an axis-aligned cell rectangle.

use crate::types::{BoundingBox, HealthError, HealthResult};
use geo::Coord;

/// Mean meters per degree of latitude
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Validate a parcel exterior ring.
///
/// A ring must carry at least four positions, be explicitly closed, and
/// stay within lon/lat bounds. Non-finite coordinates are rejected.
pub fn validate_ring(ring: &[Coord<f64>]) -> HealthResult<()> {
    if ring.len() < 4 {
        return Err(HealthError::InvalidGeometry(format!(
            "ring has {} positions, need at least 4",
            ring.len()
        )));
    }

    let first = ring[0];
    let last = ring[ring.len() - 1];
    if first != last {
        return Err(HealthError::InvalidGeometry(
            "ring is not closed (first and last positions differ)".to_string(),
        ));
    }

    for (i, c) in ring.iter().enumerate() {
        if !c.x.is_finite() || !c.y.is_finite() {
            return Err(HealthError::InvalidGeometry(format!(
                "non-finite coordinate at position {}",
                i
            )));
        }
        if c.x < -180.0 || c.x > 180.0 || c.y < -90.0 || c.y > 90.0 {
            return Err(HealthError::InvalidGeometry(format!(
                "position {} ({}, {}) outside lon/lat range",
                i, c.x, c.y
            )));
        }
    }

    Ok(())
}

/// Bounding box of a ring.
pub fn bounding_box(ring: &[Coord<f64>]) -> HealthResult<BoundingBox> {
    if ring.is_empty() {
        return Err(HealthError::InvalidGeometry("empty ring".to_string()));
    }

    let mut bbox = BoundingBox {
        min_lon: f64::INFINITY,
        max_lon: f64::NEG_INFINITY,
        min_lat: f64::INFINITY,
        max_lat: f64::NEG_INFINITY,
    };

    for c in ring {
        bbox.min_lon = bbox.min_lon.min(c.x);
        bbox.max_lon = bbox.max_lon.max(c.x);
        bbox.min_lat = bbox.min_lat.min(c.y);
        bbox.max_lat = bbox.max_lat.max(c.y);
    }

    Ok(bbox)
}

/// Even-odd point-in-polygon test against the exterior ring.
///
/// Points exactly on an edge may land on either side; the gridding
/// resolution makes this immaterial for cell membership.
pub fn point_in_ring(ring: &[Coord<f64>], lon: f64, lat: f64) -> bool {
    let n = ring.len();
    if n < 4 {
        return false;
    }

    let mut inside = false;
    // Skip the closing vertex so each edge is visited once
    let mut j = n - 2;
    for i in 0..n - 1 {
        let pi = ring[i];
        let pj = ring[j];
        if (pi.y > lat) != (pj.y > lat) {
            let x_cross = pj.x + (lat - pj.y) / (pi.y - pj.y) * (pi.x - pj.x);
            if lon < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }

    inside
}

/// One side of the clip rectangle
#[derive(Debug, Clone, Copy)]
enum ClipEdge {
    West,
    East,
    South,
    North,
}

impl ClipEdge {
    fn keeps(&self, p: Coord<f64>, b: &BoundingBox) -> bool {
        match self {
            ClipEdge::West => p.x >= b.min_lon,
            ClipEdge::East => p.x <= b.max_lon,
            ClipEdge::South => p.y >= b.min_lat,
            ClipEdge::North => p.y <= b.max_lat,
        }
    }

    fn crossing(&self, p: Coord<f64>, q: Coord<f64>, b: &BoundingBox) -> Coord<f64> {
        let dx = q.x - p.x;
        let dy = q.y - p.y;
        match self {
            ClipEdge::West => {
                let t = (b.min_lon - p.x) / dx;
                Coord { x: b.min_lon, y: p.y + t * dy }
            }
            ClipEdge::East => {
                let t = (b.max_lon - p.x) / dx;
                Coord { x: b.max_lon, y: p.y + t * dy }
            }
            ClipEdge::South => {
                let t = (b.min_lat - p.y) / dy;
                Coord { x: p.x + t * dx, y: b.min_lat }
            }
            ClipEdge::North => {
                let t = (b.max_lat - p.y) / dy;
                Coord { x: p.x + t * dx, y: b.max_lat }
            }
        }
    }
}

fn clip_against_edge(vertices: &[Coord<f64>], edge: ClipEdge, b: &BoundingBox) -> Vec<Coord<f64>> {
    let n = vertices.len();
    let mut output = Vec::with_capacity(n + 4);

    for i in 0..n {
        let current = vertices[i];
        let next = vertices[(i + 1) % n];
        let current_in = edge.keeps(current, b);
        let next_in = edge.keeps(next, b);

        match (current_in, next_in) {
            (true, true) => output.push(next),
            (true, false) => output.push(edge.crossing(current, next, b)),
            (false, true) => {
                output.push(edge.crossing(current, next, b));
                output.push(next);
            }
            (false, false) => {}
        }
    }

    output
}

/// Clip the parcel ring against one heatmap cell rectangle.
///
/// Returns the closed clipped ring, or None when the ring lies entirely
/// outside the cell.
pub fn clip_ring_to_bounds(ring: &[Coord<f64>], bounds: &BoundingBox) -> Option<Vec<Coord<f64>>> {
    if ring.len() < 4 {
        return None;
    }

    // Open the ring for the clip loop
    let mut vertices: Vec<Coord<f64>> = ring[..ring.len() - 1].to_vec();

    for edge in [ClipEdge::West, ClipEdge::East, ClipEdge::South, ClipEdge::North] {
        vertices = clip_against_edge(&vertices, edge, bounds);
        if vertices.is_empty() {
            return None;
        }
    }

    if vertices.len() < 3 {
        return None;
    }

    // Re-close
    vertices.push(vertices[0]);
    Some(vertices)
}

/// Signed shoelace area of an open or closed ring, in squared degrees.
fn shoelace(ring: &[Coord<f64>]) -> f64 {
    let n = ring.len();
    if n < 3 {
        return 0.0;
    }
    let last = if ring[0] == ring[n - 1] { n - 1 } else { n };

    let mut sum = 0.0;
    for i in 0..last {
        let p = ring[i];
        let q = ring[(i + 1) % last];
        sum += p.x * q.y - q.x * p.y;
    }
    sum / 2.0
}

/// Ring area in hectares.
///
/// Planar approximation: squared degrees scaled by meters-per-degree,
/// with the meridian convergence corrected by cos(mean latitude).
/// Adequate for parcel-sized polygons away from the poles.
pub fn ring_area_hectares(ring: &[Coord<f64>]) -> f64 {
    let area_deg2 = shoelace(ring).abs();
    if area_deg2 == 0.0 {
        return 0.0;
    }

    let mean_lat = ring.iter().map(|c| c.y).sum::<f64>() / ring.len() as f64;
    let lat_scale = METERS_PER_DEGREE;
    let lon_scale = METERS_PER_DEGREE * mean_lat.to_radians().cos();

    let area_m2 = area_deg2 * lat_scale * lon_scale;
    area_m2 / 10_000.0
}

/// Vertex-mean centroid of a ring (closing vertex excluded).
pub fn ring_centroid(ring: &[Coord<f64>]) -> Coord<f64> {
    let n = ring.len();
    if n == 0 {
        return Coord { x: 0.0, y: 0.0 };
    }
    let last = if n > 1 && ring[0] == ring[n - 1] { n - 1 } else { n };

    let mut cx = 0.0;
    let mut cy = 0.0;
    for c in &ring[..last] {
        cx += c.x;
        cy += c.y;
    }
    Coord { x: cx / last as f64, y: cy / last as f64 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(min: f64, max: f64) -> Vec<Coord<f64>> {
        vec![
            Coord { x: min, y: min },
            Coord { x: max, y: min },
            Coord { x: max, y: max },
            Coord { x: min, y: max },
            Coord { x: min, y: min },
        ]
    }

    #[test]
    fn test_validate_ring_accepts_square() {
        assert!(validate_ring(&square(0.0, 1.0)).is_ok());
    }

    #[test]
    fn test_validate_ring_rejects_open_ring() {
        let mut ring = square(0.0, 1.0);
        ring.pop();
        assert!(validate_ring(&ring).is_err());
    }

    #[test]
    fn test_validate_ring_rejects_out_of_range() {
        let ring = vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 200.0, y: 0.0 },
            Coord { x: 200.0, y: 1.0 },
            Coord { x: 0.0, y: 0.0 },
        ];
        assert!(validate_ring(&ring).is_err());
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box(&square(2.0, 5.0)).unwrap();
        assert_eq!(bbox.min_lon, 2.0);
        assert_eq!(bbox.max_lon, 5.0);
        assert_eq!(bbox.min_lat, 2.0);
        assert_eq!(bbox.max_lat, 5.0);
    }

    #[test]
    fn test_point_in_ring() {
        let ring = square(0.0, 1.0);
        assert!(point_in_ring(&ring, 0.5, 0.5));
        assert!(!point_in_ring(&ring, 1.5, 0.5));
        assert!(!point_in_ring(&ring, 0.5, -0.5));
    }

    #[test]
    fn test_clip_fully_inside() {
        let ring = square(0.25, 0.75);
        let bounds = BoundingBox {
            min_lon: 0.0,
            max_lon: 1.0,
            min_lat: 0.0,
            max_lat: 1.0,
        };
        let clipped = clip_ring_to_bounds(&ring, &bounds).unwrap();
        // Same area survives
        assert_relative_eq!(shoelace(&clipped).abs(), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_clip_partial_overlap() {
        // Unit square clipped to its right half
        let ring = square(0.0, 1.0);
        let bounds = BoundingBox {
            min_lon: 0.5,
            max_lon: 2.0,
            min_lat: 0.0,
            max_lat: 1.0,
        };
        let clipped = clip_ring_to_bounds(&ring, &bounds).unwrap();
        assert_relative_eq!(shoelace(&clipped).abs(), 0.5, epsilon = 1e-12);
        assert_eq!(clipped.first(), clipped.last());
    }

    #[test]
    fn test_clip_disjoint() {
        let ring = square(0.0, 1.0);
        let bounds = BoundingBox {
            min_lon: 2.0,
            max_lon: 3.0,
            min_lat: 2.0,
            max_lat: 3.0,
        };
        assert!(clip_ring_to_bounds(&ring, &bounds).is_none());
    }

    #[test]
    fn test_area_one_degree_cell_at_equator() {
        let ring = square(0.0, 1.0);
        let area = ring_area_hectares(&ring);
        // ~111.32 km per degree at the equator, mean latitude 0.4 deg
        let expected = 111_320.0 * 111_320.0 * (0.4f64).to_radians().cos() / 10_000.0;
        assert_relative_eq!(area, expected, max_relative = 1e-6);
    }

    #[test]
    fn test_area_shrinks_with_latitude() {
        let equator = ring_area_hectares(&square(0.0, 0.1));
        let ring_north: Vec<Coord<f64>> = square(0.0, 0.1)
            .into_iter()
            .map(|c| Coord { x: c.x, y: c.y + 60.0 })
            .collect();
        let north = ring_area_hectares(&ring_north);
        assert!(north < equator * 0.6);
    }

    #[test]
    fn test_centroid() {
        let c = ring_centroid(&square(0.0, 1.0));
        assert_relative_eq!(c.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.y, 0.5, epsilon = 1e-12);
    }
}
