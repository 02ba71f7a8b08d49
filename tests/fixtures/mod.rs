//! Test fixtures for route-planner.
//!
//! Provides:
//! - Real Berlin locations (from OpenStreetMap)
//! - In-memory Route Engine and Geocoding Service fakes with call
//!   counters, scripted responses and scripted latency
//! - Route builders

#![allow(dead_code)]

pub mod berlin_locations;
pub mod osrm_dataset;

pub use berlin_locations::*;

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use route_planner::geo::Coordinate;
use route_planner::geocode::{GeocodeError, GeocodeSuggestion};
use route_planner::polyline::Polyline;
use route_planner::route::{
    RawInstruction, RouteRequest, RouteResult, RouteSummary, RoutingError,
};
use route_planner::traits::{GeocodingService, RouteEngine};

/// `points` evenly spaced positions from `from` to `to`, both included.
pub fn straight_line(from: Coordinate, to: Coordinate, points: usize) -> Vec<Coordinate> {
    let steps = points.saturating_sub(1).max(1) as f64;
    (0..points)
        .map(|i| {
            let t = i as f64 / steps;
            Coordinate::new(
                from.lat + (to.lat - from.lat) * t,
                from.lng + (to.lng - from.lng) * t,
            )
        })
        .collect()
}

/// A route along a straight line with one maneuver per geometry index.
/// The first instruction departs, the last one arrives, the rest turn.
pub fn route_with(
    from: Coordinate,
    to: Coordinate,
    points: usize,
    indices: &[usize],
) -> RouteResult {
    let last = indices.len().saturating_sub(1);
    let instructions = indices
        .iter()
        .enumerate()
        .map(|(position, index)| {
            let (kind, modifier) = match position {
                0 => ("depart", None),
                p if p == last => ("arrive", None),
                _ => ("turn", Some("right")),
            };
            RawInstruction::maneuver(kind, modifier, "Ebertstraße", *index).with_cost(250.0, 40.0)
        })
        .collect();

    RouteResult {
        geometry: Polyline::new(straight_line(from, to, points)),
        instructions,
        summary: RouteSummary {
            total_distance: 1900.0,
            total_duration: 310.0,
        },
    }
}

/// The Alexanderplatz to Brandenburg Gate route: 50 points, maneuvers
/// starting at 0 and 30.
pub fn alexanderplatz_to_gate() -> RouteResult {
    route_with(ALEXANDERPLATZ, BRANDENBURG_GATE, 50, &[0, 30])
}

type Scripted = (Duration, Result<RouteResult, RoutingError>);

#[derive(Default)]
struct EngineInner {
    scripted: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<RouteRequest>>,
}

/// Route Engine fake. Answers scripted results in order, then straight
/// 50-point routes between the first and last requested coordinate.
#[derive(Clone, Default)]
pub struct FakeEngine {
    inner: Arc<EngineInner>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, result: Result<RouteResult, RoutingError>) {
        self.respond_after(Duration::ZERO, result);
    }

    pub fn respond_after(&self, latency: Duration, result: Result<RouteResult, RoutingError>) {
        self.inner.scripted.lock().push_back((latency, result));
    }

    pub fn calls(&self) -> usize {
        self.inner.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<RouteRequest> {
        self.inner.requests.lock().clone()
    }
}

#[async_trait]
impl RouteEngine for FakeEngine {
    async fn route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError> {
        self.inner.requests.lock().push(request.clone());
        let next = self.inner.scripted.lock().pop_front();
        match next {
            Some((latency, result)) => {
                if !latency.is_zero() {
                    tokio::time::sleep(latency).await;
                }
                result
            }
            None => {
                let from = request.coordinates.first().copied().unwrap_or(ALEXANDERPLATZ);
                let to = request.coordinates.last().copied().unwrap_or(BRANDENBURG_GATE);
                Ok(route_with(from, to, 50, &[0, 30]))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReverseReply {
    Name(String),
    Nothing,
    Fail,
}

struct GeocoderInner {
    searches: Mutex<Vec<String>>,
    reverses: Mutex<Vec<Coordinate>>,
    places: Mutex<HashMap<String, Vec<GeocodeSuggestion>>>,
    search_fails: Mutex<bool>,
    reverse_reply: Mutex<ReverseReply>,
    reverse_latency: Mutex<Duration>,
    search_latency: Mutex<Duration>,
}

/// Geocoding Service fake. Unknown queries get seven numbered candidates,
/// regardless of the requested limit.
#[derive(Clone)]
pub struct FakeGeocoder {
    inner: Arc<GeocoderInner>,
}

impl Default for FakeGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(GeocoderInner {
                searches: Mutex::new(Vec::new()),
                reverses: Mutex::new(Vec::new()),
                places: Mutex::new(HashMap::new()),
                search_fails: Mutex::new(false),
                reverse_reply: Mutex::new(ReverseReply::Name("Berlin".to_string())),
                reverse_latency: Mutex::new(Duration::ZERO),
                search_latency: Mutex::new(Duration::ZERO),
            }),
        }
    }

    pub fn with_place(self, query: &str, coordinate: Coordinate, name: &str) -> Self {
        self.inner.places.lock().insert(
            query.to_string(),
            vec![suggestion(coordinate, name, &format!("{query}-0"))],
        );
        self
    }

    pub fn failing_search(self) -> Self {
        *self.inner.search_fails.lock() = true;
        self
    }

    pub fn reverse_reply(self, reply: ReverseReply) -> Self {
        *self.inner.reverse_reply.lock() = reply;
        self
    }

    pub fn reverse_latency(self, latency: Duration) -> Self {
        *self.inner.reverse_latency.lock() = latency;
        self
    }

    pub fn search_latency(self, latency: Duration) -> Self {
        *self.inner.search_latency.lock() = latency;
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.inner.searches.lock().clone()
    }

    pub fn reverse_calls(&self) -> usize {
        self.inner.reverses.lock().len()
    }
}

pub fn suggestion(coordinate: Coordinate, name: &str, id: &str) -> GeocodeSuggestion {
    GeocodeSuggestion {
        coordinate,
        display_text: name.to_string(),
        id: id.to_string(),
    }
}

#[async_trait]
impl GeocodingService for FakeGeocoder {
    async fn search(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<GeocodeSuggestion>, GeocodeError> {
        self.inner.searches.lock().push(query.to_string());
        let latency = *self.inner.search_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        if *self.inner.search_fails.lock() {
            return Err(GeocodeError::Status(503));
        }
        if let Some(places) = self.inner.places.lock().get(query) {
            return Ok(places.clone());
        }
        Ok((0..7)
            .map(|i| {
                suggestion(
                    Coordinate::new(52.5 + i as f64 * 0.001, 13.4),
                    &format!("{query} {i}"),
                    &format!("{query}-{i}"),
                )
            })
            .collect())
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        self.inner.reverses.lock().push(coordinate);
        let latency = *self.inner.reverse_latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let reply = self.inner.reverse_reply.lock().clone();
        match reply {
            ReverseReply::Name(name) => Ok(Some(name)),
            ReverseReply::Nothing => Ok(None),
            ReverseReply::Fail => Err(GeocodeError::Malformed("unexpected token".to_string())),
        }
    }
}
