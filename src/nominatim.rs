//! Nominatim HTTP adapter for address search and reverse lookup.

use async_trait::async_trait;
use serde::Deserialize;

use crate::geo::Coordinate;
use crate::geocode::{GeocodeError, GeocodeSuggestion};
use crate::traits::GeocodingService;

#[derive(Debug, Clone)]
pub struct NominatimConfig {
    pub base_url: String,
    /// Nominatim's usage policy requires an identifying agent.
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for NominatimConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: concat!("route-planner/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NominatimClient {
    config: NominatimConfig,
    client: reqwest::Client,
}

impl NominatimClient {
    pub fn new(config: NominatimConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    async fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String, GeocodeError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl GeocodingService for NominatimClient {
    async fn search(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<GeocodeSuggestion>, GeocodeError> {
        let url = format!("{}/search", self.config.base_url);
        let body = self
            .get_text(
                &url,
                &[
                    ("format", "json".to_string()),
                    ("q", query.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        parse_search(&body)
    }

    async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        let url = format!("{}/reverse", self.config.base_url);
        let body = self
            .get_text(
                &url,
                &[
                    ("format", "json".to_string()),
                    ("lat", coordinate.lat.to_string()),
                    ("lon", coordinate.lng.to_string()),
                    ("zoom", "18".to_string()),
                    ("addressdetails", "1".to_string()),
                ],
            )
            .await?;
        parse_reverse(&body)
    }
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
    display_name: String,
    #[serde(default)]
    place_id: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ReverseHit {
    #[serde(default)]
    display_name: Option<String>,
}

/// Nominatim returns coordinates as strings; hits that fail to parse are
/// skipped rather than failing the whole search.
pub fn parse_search(body: &str) -> Result<Vec<GeocodeSuggestion>, GeocodeError> {
    let hits: Vec<SearchHit> = serde_json::from_str(body)?;
    Ok(hits
        .into_iter()
        .filter_map(|hit| {
            let lat = hit.lat.parse::<f64>().ok()?;
            let lng = hit.lon.parse::<f64>().ok()?;
            let id = match hit.place_id {
                Some(serde_json::Value::String(id)) => id,
                Some(other) => other.to_string(),
                None => String::new(),
            };
            Some(GeocodeSuggestion {
                coordinate: Coordinate::new(lat, lng),
                display_text: hit.display_name,
                id,
            })
        })
        .collect())
}

/// Error responses (`{"error": "Unable to geocode"}`) carry no name and map
/// to `None`.
pub fn parse_reverse(body: &str) -> Result<Option<String>, GeocodeError> {
    let hit: ReverseHit = serde_json::from_str(body)?;
    Ok(hit.display_name.filter(|name| !name.trim().is_empty()))
}
