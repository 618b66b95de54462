use geodraw::{Coordinate, haversine_distance_m};
use serde::{Deserialize, Serialize};

/// One raw GPS reading as delivered by the device location service.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,  // degrees, WGS84
    pub longitude: f64, // degrees, WGS84
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>, // meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>, // meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>, // m/s
    pub timestamp: i64, // milliseconds since epoch
}

impl LocationSample {
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy: None,
            altitude: None,
            speed: None,
            timestamp,
        }
    }

    /// The sample as a `[longitude, latitude]` geometry coordinate
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.longitude, self.latitude)
    }

    /// Finite and inside the WGS84 latitude/longitude ranges
    pub fn is_valid(&self) -> bool {
        self.coordinate().is_valid()
    }

    pub fn distance_to(&self, other: &LocationSample) -> f64 {
        haversine_distance_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Total distance along a trail, in meters
pub fn track_distance_m(samples: &[LocationSample]) -> f64 {
    samples
        .windows(2)
        .map(|leg| leg[0].distance_to(&leg[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_optional_fields_absent() {
        let sample: LocationSample =
            serde_json::from_str(r#"{"latitude": 37.0, "longitude": -122.0, "timestamp": 1000}"#).unwrap();
        assert_eq!(sample, LocationSample::new(37.0, -122.0, 1000));

        let json = serde_json::to_string(&sample).unwrap();
        assert!(!json.contains("accuracy"));
        assert!(!json.contains("speed"));
    }

    #[test]
    fn test_optional_fields_present() {
        let sample: LocationSample = serde_json::from_str(
            r#"{"latitude": 37.0, "longitude": -122.0, "accuracy": 4.5, "altitude": 12.0, "speed": 1.2, "timestamp": 5}"#,
        )
        .unwrap();
        assert_eq!(sample.accuracy, Some(4.5));
        assert_eq!(sample.altitude, Some(12.0));
        assert_eq!(sample.speed, Some(1.2));
    }

    #[test]
    fn test_coordinate_is_longitude_first() {
        let sample = LocationSample::new(37.5, -122.25, 0);
        assert_eq!(sample.coordinate(), Coordinate::new(-122.25, 37.5));
    }

    #[test]
    fn test_track_distance() {
        assert_eq!(track_distance_m(&[]), 0.0);

        let trail = [
            LocationSample::new(37.0, -122.0, 0),
            LocationSample::new(37.001, -122.0, 5000),
            LocationSample::new(37.001, -122.0, 10000),
        ];
        assert_abs_diff_eq!(track_distance_m(&trail), 111.19, epsilon = 0.01);
    }

    #[test]
    fn test_is_valid() {
        assert!(LocationSample::new(37.0, -122.0, 0).is_valid());
        assert!(LocationSample::new(-90.0, 180.0, 0).is_valid());
        assert!(!LocationSample::new(137.0, -122.0, 0).is_valid());
        assert!(!LocationSample::new(37.0, -190.0, 0).is_valid());
        assert!(!LocationSample::new(f64::INFINITY, 0.0, 0).is_valid());
    }
}
