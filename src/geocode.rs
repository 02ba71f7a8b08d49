//! Geocode Bridge: the planner's only way into the Geocoding Service.
//!
//! Lookups never fail towards the caller. A search that goes wrong yields no
//! suggestions, a reverse lookup that goes wrong yields the coordinates as
//! text.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::Timings;
use crate::geo::Coordinate;
use crate::traits::GeocodingService;

/// Most candidates a search returns.
pub const SEARCH_LIMIT: usize = 5;

/// Queries shorter than this never reach the service.
pub const MIN_QUERY_CHARS: usize = 2;

/// A candidate resolution for a free-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeSuggestion {
    pub coordinate: Coordinate,
    pub display_text: String,
    /// Identifier assigned by the service.
    pub id: String,
}

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("geocoding service answered with status {0}")]
    Status(u16),

    #[error("malformed geocoding response: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for GeocodeError {
    fn from(err: serde_json::Error) -> Self {
        GeocodeError::Malformed(err.to_string())
    }
}

pub struct GeocodeBridge<G> {
    service: G,
    timings: Timings,
}

impl<G: GeocodingService> GeocodeBridge<G> {
    pub fn new(service: G, timings: Timings) -> Self {
        Self { service, timings }
    }

    pub fn service(&self) -> &G {
        &self.service
    }

    /// Up to five ranked candidates for `text`. Not debounced; see
    /// `SearchDebouncer` for keystroke-driven use.
    pub async fn search(&self, text: &str) -> Vec<GeocodeSuggestion> {
        let query = text.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return Vec::new();
        }
        match self.service.search(query, SEARCH_LIMIT).await {
            Ok(mut suggestions) => {
                suggestions.truncate(SEARCH_LIMIT);
                suggestions
            }
            Err(err) => {
                warn!(query, error = %err, "geocoding search failed");
                Vec::new()
            }
        }
    }

    /// Display text for `coordinate`, after the fixed rate-limit pause.
    pub async fn reverse_geocode(&self, coordinate: Coordinate) -> String {
        tokio::time::sleep(self.timings.reverse_delay).await;

        let lookup = self.service.reverse(coordinate);
        match tokio::time::timeout(self.timings.reverse_timeout, lookup).await {
            Ok(Ok(Some(text))) if !text.trim().is_empty() => text,
            Ok(Ok(_)) => {
                debug!(%coordinate, "reverse geocoding found no address");
                coordinate.to_string()
            }
            Ok(Err(err)) => {
                warn!(%coordinate, error = %err, "reverse geocoding failed, using coordinates");
                coordinate.to_string()
            }
            Err(_) => {
                warn!(%coordinate, "reverse geocoding timed out, using coordinates");
                coordinate.to_string()
            }
        }
    }
}

/// Result of one keystroke fed to `SearchDebouncer::input`.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// A newer keystroke arrived for the same slot; ignore this one.
    Superseded,
    /// Same query as the last one issued for the slot; keep what is shown.
    Unchanged,
    /// The input was emptied; hide suggestions.
    Cleared,
    Suggestions(Vec<GeocodeSuggestion>),
}

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    last_query: Option<String>,
}

/// Per-input-slot debounce and coalescing in front of a `GeocodeBridge`.
///
/// Each call to `input` restarts the slot's debounce window. Only the call
/// that is still the latest once the window and the lookup have both
/// completed reports suggestions.
pub struct SearchDebouncer<G> {
    bridge: Arc<GeocodeBridge<G>>,
    slots: Mutex<HashMap<usize, SlotState>>,
}

impl<G: GeocodingService> SearchDebouncer<G> {
    pub fn new(bridge: Arc<GeocodeBridge<G>>) -> Self {
        Self {
            bridge,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub async fn input(&self, slot: usize, text: &str) -> SearchOutcome {
        let query = text.trim().to_string();
        let generation = {
            let mut slots = self.slots.lock();
            let state = slots.entry(slot).or_default();
            state.generation += 1;
            if query.is_empty() {
                state.last_query = None;
                return SearchOutcome::Cleared;
            }
            state.generation
        };

        tokio::time::sleep(self.bridge.timings.debounce).await;

        {
            let mut slots = self.slots.lock();
            let state = slots.entry(slot).or_default();
            if state.generation != generation {
                return SearchOutcome::Superseded;
            }
            if state.last_query.as_deref() == Some(query.as_str()) {
                return SearchOutcome::Unchanged;
            }
            state.last_query = Some(query.clone());
        }

        let suggestions = self.bridge.search(&query).await;

        let current = self
            .slots
            .lock()
            .get(&slot)
            .map(|state| state.generation);
        if current != Some(generation) {
            debug!(slot, query = %query, "discarding suggestions for superseded query");
            return SearchOutcome::Superseded;
        }
        SearchOutcome::Suggestions(suggestions)
    }

    /// Forgets the slot's last query so retyping it searches again.
    pub fn reset(&self, slot: usize) {
        if let Some(state) = self.slots.lock().get_mut(&slot) {
            state.generation += 1;
            state.last_query = None;
        }
    }
}
