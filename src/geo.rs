//! Coordinate and bounding-box primitives shared by every module.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A WGS84 position, latitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// `lat,lng` with 6 decimals, the form used in share URLs.
    pub fn to_query_value(&self) -> String {
        format!("{:.6},{:.6}", self.lat, self.lng)
    }

    /// Parses `lat,lng`. Whitespace around either number is tolerated.
    pub fn parse_pair(value: &str) -> Option<Self> {
        let (lat, lng) = value.split_once(',')?;
        let lat = lat.trim().parse::<f64>().ok()?;
        let lng = lng.trim().parse::<f64>().ok()?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Self { lat, lng })
    }

    /// True when both components agree to 6 decimals.
    pub fn same_position(&self, other: &Coordinate) -> bool {
        self.to_query_value() == other.to_query_value()
    }
}

/// Human-readable fallback used wherever an address is unknown.
impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Axis-aligned lat/lng box. Does not handle antimeridian wrap.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn new(south_west: Coordinate, north_east: Coordinate) -> Self {
        Self {
            south: south_west.lat,
            west: south_west.lng,
            north: north_east.lat,
            east: north_east.lng,
        }
    }

    /// Smallest box containing every coordinate, `None` for an empty input.
    pub fn from_coordinates<'a, I>(coordinates: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut iter = coordinates.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::new(*first, *first);
        for coordinate in iter {
            bounds.extend(coordinate);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, coordinate: &Coordinate) {
        self.south = self.south.min(coordinate.lat);
        self.north = self.north.max(coordinate.lat);
        self.west = self.west.min(coordinate.lng);
        self.east = self.east.max(coordinate.lng);
    }

    /// Inclusive on every edge.
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate.lat >= self.south
            && coordinate.lat <= self.north
            && coordinate.lng >= self.west
            && coordinate.lng <= self.east
    }
}
