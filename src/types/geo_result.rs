//! Coordinate types produced by the resolver and merged into the enriched table.

use std::fmt;

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
/// Both values are represented as `f64`.
///
/// # Examples
///
/// ```
/// use aqi_geo::LatLon;
///
/// let springfield = LatLon(39.7990, -89.6440);
/// assert_eq!(springfield.0, 39.7990); // Latitude
/// assert_eq!(springfield.1, -89.6440); // Longitude
/// assert!(springfield.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLon(pub f64, pub f64);

impl LatLon {
    /// Returns `true` when both components are finite and inside the WGS84 ranges.
    pub fn is_valid(&self) -> bool {
        self.0.is_finite()
            && self.1.is_finite()
            && (-90.0..=90.0).contains(&self.0)
            && (-180.0..=180.0).contains(&self.1)
    }
}

impl fmt::Display for LatLon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.5}, {:.5})", self.0, self.1)
    }
}

/// The result of geocoding a single place name.
///
/// A coordinate pair is either present as a whole or absent as a whole, so a row
/// can never end up with a latitude but no longitude.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum GeoResult {
    /// The service returned a usable match.
    Found(LatLon),
    /// No usable match. Both coordinates are empty in the output table.
    #[default]
    Miss,
}

impl GeoResult {
    pub fn latitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.0)
    }

    pub fn longitude(&self) -> Option<f64> {
        self.coordinates().map(|c| c.1)
    }

    pub fn coordinates(&self) -> Option<LatLon> {
        match self {
            GeoResult::Found(lat_lon) => Some(*lat_lon),
            GeoResult::Miss => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, GeoResult::Found(_))
    }
}

impl From<Option<LatLon>> for GeoResult {
    fn from(value: Option<LatLon>) -> Self {
        value.map_or(GeoResult::Miss, GeoResult::Found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_miss_has_no_coordinates() {
        let miss = GeoResult::Miss;
        assert_eq!(miss.latitude(), None);
        assert_eq!(miss.longitude(), None);
        assert!(!miss.is_found());
    }

    #[test]
    fn test_found_exposes_both_components() {
        let found = GeoResult::Found(LatLon(52.52, 13.405));
        assert_eq!(found.latitude(), Some(52.52));
        assert_eq!(found.longitude(), Some(13.405));
        assert!(found.is_found());
    }

    #[test]
    fn test_lat_lon_validity() {
        assert!(LatLon(0.0, 0.0).is_valid());
        assert!(LatLon(-90.0, 180.0).is_valid());
        assert!(!LatLon(91.0, 0.0).is_valid());
        assert!(!LatLon(0.0, -180.5).is_valid());
        assert!(!LatLon(f64::NAN, 0.0).is_valid());
    }
}
