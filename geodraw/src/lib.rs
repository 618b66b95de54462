//! Geometry toolkit for field missions
//!
//! This library holds the pieces of the mission service that need no I/O:
//! - GeoJSON-compatible geometry types with validation and WKT output
//! - Haversine distance between WGS84 positions
//! - An interactive drawing session that builds points, lines and polygons from map taps
//!
//! # Example
//!
//! ```
//! use geodraw::{Coordinate, DrawingMode, DrawingSession, Geometry};
//!
//! let mut session = DrawingSession::new(DrawingMode::Polygon);
//! session.add_point(Coordinate::new(-122.0, 37.0));
//! session.add_point(Coordinate::new(-121.999, 37.0));
//! session.add_point(Coordinate::new(-121.999, 37.001));
//!
//! let polygon = session.finish().unwrap();
//! assert!(matches!(polygon, Geometry::Polygon(_)));
//! assert!(polygon.validate().is_ok());
//! ```

pub mod drawing;
pub mod geodesic;
pub mod geometry;

// Re-export commonly used types
pub use drawing::{DrawingMode, DrawingSession, DrawingState};
pub use geodesic::{distance_between, haversine_distance_m, path_length_m, EARTH_RADIUS_M};
pub use geometry::{Coordinate, Geometry, GeometryError};
