use serde::{Deserialize, Serialize};

/// Represents a geographical coordinate with latitude and longitude
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    /// Creates a new LatLng coordinate
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl Default for LatLng {
    fn default() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Represents a bounding box of geographical coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    pub fn new(south_west: LatLng, north_east: LatLng) -> Self {
        Self {
            south_west,
            north_east,
        }
    }

    /// Creates bounds from individual coordinates
    pub fn from_coords(south: f64, west: f64, north: f64, east: f64) -> Self {
        Self::new(LatLng::new(south, west), LatLng::new(north, east))
    }

    /// Smallest bounds containing every point, or `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = LatLngBounds::new(first, first);
        for point in points {
            bounds.extend(&point);
        }
        Some(bounds)
    }

    /// Extends the bounds to include a point
    pub fn extend(&mut self, point: &LatLng) {
        self.south_west.lat = self.south_west.lat.min(point.lat);
        self.south_west.lng = self.south_west.lng.min(point.lng);
        self.north_east.lat = self.north_east.lat.max(point.lat);
        self.north_east.lng = self.north_east.lng.max(point.lng);
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}

/// Keeps consecutive track points continuous across the antimeridian.
///
/// Each longitude is compared with the previously emitted one under three
/// candidates (unchanged, +360°, -360°) and the candidate closest to the
/// previous value is emitted. The emitted value becomes the new reference, so
/// points must be fed in visiting order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LngUnwrapper {
    previous: f64,
}

impl LngUnwrapper {
    pub fn new() -> Self {
        Self::seeded(0.0)
    }

    pub fn seeded(previous_lng: f64) -> Self {
        Self {
            previous: previous_lng,
        }
    }

    pub fn previous(&self) -> f64 {
        self.previous
    }

    /// Returns the (possibly shifted) longitude and remembers it.
    pub fn unwrap_lng(&mut self, lng: f64) -> f64 {
        let unchanged = (lng - self.previous).abs();
        let east = (lng + 360.0 - self.previous).abs();
        let west = (lng - 360.0 - self.previous).abs();

        let shifted = if unchanged > east || unchanged > west {
            if unchanged > east {
                lng + 360.0
            } else {
                lng - 360.0
            }
        } else {
            lng
        };

        self.previous = shifted;
        shifted
    }

    pub fn unwrap_point(&mut self, point: LatLng) -> LatLng {
        LatLng::new(point.lat, self.unwrap_lng(point.lng))
    }

    /// Normalizes a whole path in order, continuing from the current reference.
    pub fn unwrap_path(&mut self, points: &[LatLng]) -> Vec<LatLng> {
        points.iter().map(|p| self.unwrap_point(*p)).collect()
    }
}

impl Default for LngUnwrapper {
    fn default() -> Self {
        Self::new()
    }
}
