//! OSRM HTTP adapter for route computation.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::geo::Coordinate;
use crate::polyline::Polyline;
use crate::route::{
    InstructionSource, RawInstruction, RouteRequest, RouteResult, RouteSummary, RoutingError,
};
use crate::traits::RouteEngine;

#[derive(Debug, Clone)]
pub struct OsrmConfig {
    pub base_url: String,
    pub profile: String,
    pub timeout_secs: u64,
}

impl Default for OsrmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            profile: "driving".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OsrmClient {
    config: OsrmConfig,
    client: reqwest::Client,
}

impl OsrmClient {
    pub fn new(config: OsrmConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OsrmConfig {
        &self.config
    }

    /// Asks the `nearest` service about a fixed point with a fixed point in Berlin.
    pub async fn is_available(&self) -> bool {
        let url = format!(
            "{}/nearest/v1/{}/13.388860,52.517037",
            self.config.base_url, self.config.profile
        );

        let response = match self.client.get(url).send().await {
            Ok(response) if response.status().is_success() => response,
            _ => return false,
        };
        match response.json::<OsrmStatus>().await {
            Ok(body) => body.code == "Ok",
            Err(_) => false,
        }
    }
}

#[async_trait]
impl RouteEngine for OsrmClient {
    async fn route(&self, request: &RouteRequest) -> Result<RouteResult, RoutingError> {
        if request.coordinates.len() < 2 {
            return Err(RoutingError::Other(
                "at least two coordinates are required".to_string(),
            ));
        }

        let coords = request
            .coordinates
            .iter()
            .map(|coordinate| format!("{:.6},{:.6}", coordinate.lng, coordinate.lat))
            .collect::<Vec<_>>()
            .join(";");

        let mut url = format!(
            "{}/route/v1/{}/{}?overview=full&geometries=geojson&steps=true",
            self.config.base_url, request.profile, coords
        );
        if request.alternative > 0 {
            url.push_str("&alternatives=true");
        }

        debug!(%url, "requesting route");
        // OSRM reports NoRoute with a 400, so the body is read regardless of
        // status.
        let body = self.client.get(url).send().await?.text().await?;
        parse_route_response(&body, request.alternative)
    }
}

#[derive(Debug, Deserialize)]
struct OsrmStatus {
    code: String,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    legs: Vec<OsrmLeg>,
}

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    steps: Vec<OsrmStep>,
}

#[derive(Debug, Deserialize)]
struct OsrmStep {
    distance: f64,
    duration: f64,
    #[serde(default)]
    name: String,
    geometry: OsrmGeometry,
    maneuver: OsrmManeuver,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmManeuver {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    modifier: Option<String>,
    #[serde(default)]
    exit: Option<u32>,
}

/// Converts an OSRM `route` response body into a `RouteResult`.
///
/// Step geometries are concatenated into one polyline; each instruction
/// points at the offset of its first coordinate. Intermediate arrivals
/// become `via` instructions and the departures that follow them are
/// dropped.
pub fn parse_route_response(body: &str, alternative: usize) -> Result<RouteResult, RoutingError> {
    let response: OsrmRouteResponse = serde_json::from_str(body)
        .map_err(|err| RoutingError::Other(format!("malformed response: {err}")))?;

    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" | "NoSegment" => {
            return Err(RoutingError::NoRoute(
                response.message.unwrap_or(response.code),
            ));
        }
        _ => {
            let message = response.message.unwrap_or_default();
            return Err(RoutingError::Other(format!("{}: {}", response.code, message)));
        }
    }

    let mut routes = response.routes;
    if routes.is_empty() {
        return Err(RoutingError::NoRoute("response contained no routes".to_string()));
    }
    let route = if alternative < routes.len() {
        routes.swap_remove(alternative)
    } else {
        routes.swap_remove(0)
    };

    let mut points: Vec<Coordinate> = Vec::new();
    let mut instructions = Vec::new();
    let leg_count = route.legs.len();

    for (leg_index, leg) in route.legs.into_iter().enumerate() {
        let last_leg = leg_index + 1 == leg_count;
        for step in leg.steps {
            let step_points: Vec<Coordinate> = step
                .geometry
                .coordinates
                .iter()
                .map(|[lng, lat]| Coordinate::new(*lat, *lng))
                .collect();

            let mut start = points.len();
            let mut fresh = step_points.as_slice();
            if let (Some(last), Some(first)) = (points.last(), step_points.first()) {
                if last == first {
                    start -= 1;
                    fresh = &step_points[1..];
                }
            }
            points.extend_from_slice(fresh);

            let kind = match step.maneuver.kind.as_str() {
                "depart" if leg_index > 0 => continue,
                "arrive" if !last_leg => "via".to_string(),
                other => other.to_string(),
            };

            instructions.push(RawInstruction {
                source: InstructionSource::Maneuver {
                    kind,
                    modifier: step.maneuver.modifier,
                    exit: step.maneuver.exit,
                },
                road: step.name,
                geometry_index: Some(start),
                distance: Some(step.distance),
                duration: Some(step.duration),
            });
        }
    }

    Ok(RouteResult {
        geometry: Polyline::new(points),
        instructions,
        summary: RouteSummary {
            total_distance: route.distance,
            total_duration: route.duration,
        },
    })
}
