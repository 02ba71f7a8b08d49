//! Route Engine input and output types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::Coordinate;
use crate::polyline::Polyline;

/// What gets pushed to the Route Engine.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteRequest {
    /// Resolved waypoints, origin first.
    pub coordinates: Vec<Coordinate>,
    /// Travel profile, e.g. "driving".
    pub profile: String,
    /// Index of the alternative route to return, 0 for the primary one.
    pub alternative: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    /// Meters.
    pub total_distance: f64,
    /// Seconds.
    pub total_duration: f64,
}

/// Where an instruction's wording comes from, fixed when the engine
/// response is ingested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionSource {
    /// Structured maneuver as produced by OSRM-style engines.
    Maneuver {
        kind: String,
        modifier: Option<String>,
        exit: Option<u32>,
    },
    /// Pre-rendered sentence, optionally with a coarse type tag.
    Text { text: String, kind: Option<String> },
}

/// One maneuver as reported by the Route Engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInstruction {
    pub source: InstructionSource,
    pub road: String,
    /// Offset into the route geometry where this maneuver starts.
    pub geometry_index: Option<usize>,
    pub distance: Option<f64>,
    pub duration: Option<f64>,
}

impl RawInstruction {
    pub fn maneuver(kind: &str, modifier: Option<&str>, road: &str, geometry_index: usize) -> Self {
        Self {
            source: InstructionSource::Maneuver {
                kind: kind.to_string(),
                modifier: modifier.map(str::to_string),
                exit: None,
            },
            road: road.to_string(),
            geometry_index: Some(geometry_index),
            distance: None,
            duration: None,
        }
    }

    pub fn with_exit(mut self, exit: u32) -> Self {
        if let InstructionSource::Maneuver { exit: slot, .. } = &mut self.source {
            *slot = Some(exit);
        }
        self
    }

    pub fn with_cost(mut self, distance: f64, duration: f64) -> Self {
        self.distance = Some(distance);
        self.duration = Some(duration);
        self
    }
}

/// A computed route. Replaced wholesale on every successful computation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub geometry: Polyline,
    pub instructions: Vec<RawInstruction>,
    pub summary: RouteSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoutingFailureKind {
    Network,
    NoRoute,
    Other,
}

impl RoutingFailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutingFailureKind::Network => "network",
            RoutingFailureKind::NoRoute => "no-route",
            RoutingFailureKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoutingError {
    #[error("routing backend unreachable: {0}")]
    Network(String),

    #[error("no route between the given waypoints: {0}")]
    NoRoute(String),

    #[error("routing failed: {0}")]
    Other(String),
}

impl RoutingError {
    pub fn kind(&self) -> RoutingFailureKind {
        match self {
            RoutingError::Network(_) => RoutingFailureKind::Network,
            RoutingError::NoRoute(_) => RoutingFailureKind::NoRoute,
            RoutingError::Other(_) => RoutingFailureKind::Other,
        }
    }
}

impl From<reqwest::Error> for RoutingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            RoutingError::Other(format!("malformed response: {err}"))
        } else if err.is_status() {
            RoutingError::Other(err.to_string())
        } else {
            RoutingError::Network(err.to_string())
        }
    }
}
