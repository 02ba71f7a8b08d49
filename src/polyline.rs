//! Polyline representation for route geometries.
//!
//! The Route Engine hands geometry over as decoded coordinates; any compact
//! encoding is the adapter's concern and never reaches this type.

use serde::{Deserialize, Serialize};

use crate::geo::{Bounds, Coordinate};

/// An ordered route geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polyline {
    points: Vec<Coordinate>,
}

impl Polyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points in `[start, end)`, clamped to the geometry. An inverted range
    /// yields an empty slice.
    pub fn segment(&self, start: usize, end: usize) -> &[Coordinate] {
        let end = end.min(self.points.len());
        let start = start.min(end);
        &self.points[start..end]
    }

    pub fn bounds(&self) -> Option<Bounds> {
        Bounds::from_coordinates(&self.points)
    }
}

impl From<Vec<Coordinate>> for Polyline {
    fn from(points: Vec<Coordinate>) -> Self {
        Self::new(points)
    }
}
