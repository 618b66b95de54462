//! Great-circle distance on a spherical Earth.

use crate::geometry::Coordinate;

/// Mean Earth radius used by the Haversine formula, in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters between two positions given in degrees.
pub fn haversine_distance_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let lat1 = lat1_deg.to_radians();
    let lat2 = lat2_deg.to_radians();
    let delta_lat = (lat2_deg - lat1_deg).to_radians();
    let delta_lon = (lon2_deg - lon1_deg).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (delta_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

pub fn distance_between(from: &Coordinate, to: &Coordinate) -> f64 {
    haversine_distance_m(from.latitude, from.longitude, to.latitude, to.longitude)
}

/// Sum of the legs between consecutive coordinates; 0 for fewer than two.
pub fn path_length_m(coords: &[Coordinate]) -> f64 {
    coords
        .windows(2)
        .map(|leg| distance_between(&leg[0], &leg[1]))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_thousandth_of_latitude() {
        let d = haversine_distance_m(37.0, -122.0, 37.001, -122.0);
        assert_abs_diff_eq!(d, 111.19, epsilon = 0.01);
    }

    #[test]
    fn test_equator_longitude() {
        // ~111 meters at the equator
        let d = distance_between(&Coordinate::new(0.0, 0.0), &Coordinate::new(0.001, 0.0));
        assert!(d > 100.0 && d < 120.0);
    }

    #[test]
    fn test_same_location() {
        let here = Coordinate::new(-122.0, 45.0);
        assert_abs_diff_eq!(distance_between(&here, &here), 0.0);
    }

    #[test]
    fn test_symmetric() {
        let a = Coordinate::new(2.35, 48.85);
        let b = Coordinate::new(-0.12, 51.5);
        assert_abs_diff_eq!(distance_between(&a, &b), distance_between(&b, &a), epsilon = 1e-6);
        // Paris to London is roughly 344 km
        assert_abs_diff_eq!(distance_between(&a, &b) / 1000.0, 344.0, epsilon = 5.0);
    }

    #[test]
    fn test_path_length() {
        assert_eq!(path_length_m(&[]), 0.0);
        assert_eq!(path_length_m(&[Coordinate::new(1.0, 1.0)]), 0.0);

        let path = [
            Coordinate::new(-122.0, 37.0),
            Coordinate::new(-122.0, 37.001),
            Coordinate::new(-122.0, 37.002),
        ];
        let expected = distance_between(&path[0], &path[1]) + distance_between(&path[1], &path[2]);
        assert_abs_diff_eq!(path_length_m(&path), expected, epsilon = 1e-9);
    }
}
