//! Interfaces of the external collaborators.
//!
//! The planner core never talks HTTP directly; it is handed implementations
//! of these traits. `osrm` and `nominatim` provide the production ones, tests
//! provide in-memory fakes.

use async_trait::async_trait;

use crate::geo::Coordinate;
use crate::geocode::{GeocodeError, GeocodeSuggestion};
use crate::instructions::{CompileError, ManeuverStep};
use crate::route::{RouteRequest, RouteResult, RoutingError};

/// Turns an ordered coordinate list into a route.
#[async_trait]
pub trait RouteEngine: Send + Sync {
    async fn route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError>;
}

/// Address search and reverse lookup.
#[async_trait]
pub trait GeocodingService: Send + Sync {
    /// Ranked candidates for a free-text query, at most `limit`.
    async fn search(&self, query: &str, limit: usize)
    -> Result<Vec<GeocodeSuggestion>, GeocodeError>;

    /// Best display text for a position, `None` when the service knows none.
    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError>;
}

/// Renders a structured maneuver as a sentence in the given language.
pub trait InstructionCompiler: Send + Sync {
    fn compile(&self, language: &str, step: &ManeuverStep<'_>) -> Result<String, CompileError>;
}
