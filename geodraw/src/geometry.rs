use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A WGS84 position in degrees.
///
/// Serialized the GeoJSON way, as a `[longitude, latitude]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub longitude: f64,
    pub latitude: f64,
}

impl Coordinate {
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// True when both components are finite and inside the WGS84 ranges
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && (-180.0..=180.0).contains(&self.longitude)
            && (-90.0..=90.0).contains(&self.latitude)
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from(pair: [f64; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(coord: Coordinate) -> Self {
        [coord.longitude, coord.latitude]
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.longitude, self.latitude)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryError {
    #[error("coordinate out of range: lon={longitude}, lat={latitude}")]
    InvalidCoordinate { longitude: f64, latitude: f64 },

    #[error("{kind} needs at least {required} coordinates, got {actual}")]
    TooFewCoordinates {
        kind: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("polygon must have exactly one ring, got {0}")]
    RingCount(usize),

    #[error("polygon ring is not closed")]
    UnclosedRing,
}

/// GeoJSON-compatible geometry: `{"type": "...", "coordinates": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Coordinate),
    LineString(Vec<Coordinate>),
    Polygon(Vec<Vec<Coordinate>>),
}

impl Geometry {
    /// Build a single-ring polygon, appending a copy of the first vertex to close it.
    pub fn polygon_from_vertices(vertices: &[Coordinate]) -> Self {
        let mut ring = vertices.to_vec();
        if let Some(first) = vertices.first() {
            ring.push(*first);
        }
        Geometry::Polygon(vec![ring])
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::LineString(_) => "LineString",
            Geometry::Polygon(_) => "Polygon",
        }
    }

    /// Total number of coordinates, closing vertex included
    pub fn coordinate_count(&self) -> usize {
        match self {
            Geometry::Point(_) => 1,
            Geometry::LineString(coords) => coords.len(),
            Geometry::Polygon(rings) => rings.iter().map(Vec::len).sum(),
        }
    }

    /// Check the structural rules this system stores geometries under.
    ///
    /// A line string needs two coordinates. A polygon has exactly one ring of
    /// at least four coordinates whose first and last entries are equal.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match self {
            Geometry::Point(coord) => check_coordinates(std::slice::from_ref(coord)),
            Geometry::LineString(coords) => {
                if coords.len() < 2 {
                    return Err(GeometryError::TooFewCoordinates {
                        kind: self.kind(),
                        required: 2,
                        actual: coords.len(),
                    });
                }
                check_coordinates(coords)
            }
            Geometry::Polygon(rings) => {
                let [ring] = rings.as_slice() else {
                    return Err(GeometryError::RingCount(rings.len()));
                };
                if ring.len() < 4 {
                    return Err(GeometryError::TooFewCoordinates {
                        kind: self.kind(),
                        required: 4,
                        actual: ring.len(),
                    });
                }
                if ring.first() != ring.last() {
                    return Err(GeometryError::UnclosedRing);
                }
                check_coordinates(ring)
            }
        }
    }

    /// Well-known text, longitude first: `LINESTRING(-122 37, -122 37.001)`
    pub fn to_wkt(&self) -> String {
        self.to_string()
    }
}

fn check_coordinates(coords: &[Coordinate]) -> Result<(), GeometryError> {
    match coords.iter().find(|c| !c.is_valid()) {
        Some(bad) => Err(GeometryError::InvalidCoordinate {
            longitude: bad.longitude,
            latitude: bad.latitude,
        }),
        None => Ok(()),
    }
}

fn write_coordinate_list(f: &mut fmt::Formatter<'_>, coords: &[Coordinate]) -> fmt::Result {
    write!(f, "(")?;
    for (i, coord) in coords.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", coord)?;
    }
    write!(f, ")")
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(coord) => write!(f, "POINT({})", coord),
            Geometry::LineString(coords) => {
                write!(f, "LINESTRING")?;
                write_coordinate_list(f, coords)
            }
            Geometry::Polygon(rings) => {
                write!(f, "POLYGON(")?;
                for (i, ring) in rings.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_coordinate_list(f, ring)?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Coordinate> {
        vec![
            Coordinate::new(-122.0, 37.0),
            Coordinate::new(-121.999, 37.0),
            Coordinate::new(-121.999, 37.001),
        ]
    }

    #[test]
    fn test_point_serializes_as_geojson() {
        let point = Geometry::Point(Coordinate::new(-122.5, 37.25));
        let json = serde_json::to_value(&point).unwrap();
        assert_eq!(json, serde_json::json!({"type": "Point", "coordinates": [-122.5, 37.25]}));
    }

    #[test]
    fn test_polygon_deserializes_from_geojson() {
        let json = r#"{"type":"Polygon","coordinates":[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]}"#;
        let geometry: Geometry = serde_json::from_str(json).unwrap();
        match &geometry {
            Geometry::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0][1], Coordinate::new(1.0, 0.0));
            }
            other => panic!("unexpected geometry {:?}", other),
        }
        assert!(geometry.validate().is_ok());
    }

    #[test]
    fn test_polygon_from_vertices_closes_ring() {
        let polygon = Geometry::polygon_from_vertices(&square());
        let Geometry::Polygon(rings) = &polygon else {
            panic!("expected polygon");
        };
        assert_eq!(rings[0].len(), 4);
        assert_eq!(rings[0].first(), rings[0].last());
        assert_eq!(polygon.coordinate_count(), 4);
    }

    #[test]
    fn test_validate_line_string_needs_two_points() {
        let line = Geometry::LineString(vec![Coordinate::new(0.0, 0.0)]);
        assert_eq!(
            line.validate(),
            Err(GeometryError::TooFewCoordinates { kind: "LineString", required: 2, actual: 1 })
        );
    }

    #[test]
    fn test_validate_rejects_open_ring() {
        let mut ring = square();
        ring.push(Coordinate::new(-122.0, 37.001));
        let polygon = Geometry::Polygon(vec![ring]);
        assert_eq!(polygon.validate(), Err(GeometryError::UnclosedRing));
    }

    #[test]
    fn test_validate_rejects_holes() {
        let Geometry::Polygon(rings) = Geometry::polygon_from_vertices(&square()) else {
            panic!("expected polygon");
        };
        let polygon = Geometry::Polygon(vec![rings[0].clone(), rings[0].clone()]);
        assert_eq!(polygon.validate(), Err(GeometryError::RingCount(2)));
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        let point = Geometry::Point(Coordinate::new(200.0, 10.0));
        assert!(matches!(point.validate(), Err(GeometryError::InvalidCoordinate { .. })));

        let nan = Geometry::Point(Coordinate::new(0.0, f64::NAN));
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_wkt() {
        assert_eq!(Geometry::Point(Coordinate::new(-122.0, 37.5)).to_wkt(), "POINT(-122 37.5)");

        let line = Geometry::LineString(vec![Coordinate::new(-122.0, 37.0), Coordinate::new(-122.0, 37.001)]);
        assert_eq!(line.to_wkt(), "LINESTRING(-122 37, -122 37.001)");

        let polygon = Geometry::polygon_from_vertices(&[
            Coordinate::new(0.0, 0.0),
            Coordinate::new(1.0, 0.0),
            Coordinate::new(1.0, 1.0),
        ]);
        assert_eq!(polygon.to_wkt(), "POLYGON((0 0, 1 0, 1 1, 0 0))");
    }
}
