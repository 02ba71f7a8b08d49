//! Share-URL encoding of the planner state.
//!
//! Query parameters:
//!
//! - `loc=lat,lng`, repeated, one per resolved waypoint, 6 decimals
//! - `waypoints=lat,lng;lat,lng;...`, legacy, read only
//! - `center=lat,lng` and `z=<int>` (`zoom=<int>` accepted on read)
//! - `hl`, `alt`, `srv`, written only when they differ from the defaults
//!
//! Parameters this module does not own are carried through untouched.

use serde::{Deserialize, Serialize};
use tracing::warn;
use url::form_urlencoded;

use crate::geo::Coordinate;
use crate::store::{MIN_SLOTS, Waypoint};

const LOC: &str = "loc";
const LEGACY_WAYPOINTS: &str = "waypoints";
const CENTER: &str = "center";
const ZOOM: &str = "z";
const LEGACY_ZOOM: &str = "zoom";
const LANGUAGE: &str = "hl";
const ALTERNATIVE: &str = "alt";
const SERVICE: &str = "srv";

const OWNED_KEYS: [&str; 8] = [
    LOC,
    LEGACY_WAYPOINTS,
    CENTER,
    ZOOM,
    LEGACY_ZOOM,
    LANGUAGE,
    ALTERNATIVE,
    SERVICE,
];

/// Zoom assumed when a URL carries a center but no zoom.
pub const DEFAULT_CENTER_ZOOM: u8 = 13;

pub const DEFAULT_LANGUAGE: &str = "en";
pub const DEFAULT_SERVICE: &str = "default";

/// Map camera persisted next to the waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub center: Option<Coordinate>,
    pub zoom: u8,
}

impl ViewState {
    pub fn new(center: Coordinate, zoom: u8) -> Self {
        Self {
            center: Some(center),
            zoom,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocaleSettings {
    pub language: String,
    pub alternative: usize,
    pub service: String,
}

impl Default for LocaleSettings {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
            alternative: 0,
            service: DEFAULT_SERVICE.to_string(),
        }
    }
}

/// Everything recovered from a share URL.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedQuery {
    /// Valid waypoint coordinates in URL order.
    pub coordinates: Vec<Coordinate>,
    pub view: Option<ViewState>,
    pub settings: LocaleSettings,
}

impl DecodedQuery {
    /// Store-ready sequence: one resolved waypoint per coordinate, labelled
    /// by `label`, padded with empty slots up to two.
    pub fn waypoints_with<F>(&self, mut label: F) -> Vec<Waypoint>
    where
        F: FnMut(&Coordinate) -> String,
    {
        let labelled = self
            .coordinates
            .iter()
            .map(|coordinate| Waypoint::resolved(*coordinate, label(coordinate)))
            .collect();
        pad_to_minimum(labelled)
    }

    /// Same as `waypoints_with`, labelling each stop by its coordinates.
    pub fn waypoints(&self) -> Vec<Waypoint> {
        self.waypoints_with(|coordinate| coordinate.to_string())
    }
}

pub fn pad_to_minimum(mut waypoints: Vec<Waypoint>) -> Vec<Waypoint> {
    if waypoints.len() < MIN_SLOTS {
        waypoints.resize_with(MIN_SLOTS, Waypoint::empty);
    }
    waypoints
}

/// Rewrites `existing` so it reflects the given state.
///
/// Keys owned by the planner are stripped and re-emitted, other pairs keep
/// their original text and order. The result carries no leading `?`.
pub fn encode(
    existing: &str,
    waypoints: &[Waypoint],
    view: Option<&ViewState>,
    settings: &LocaleSettings,
) -> String {
    let mut pairs: Vec<String> = split_pairs(existing)
        .filter(|raw| {
            let key = decode_pair(raw).0;
            !OWNED_KEYS.contains(&key.as_str())
        })
        .map(str::to_string)
        .collect();

    pairs.extend(
        waypoints
            .iter()
            .filter_map(|waypoint| waypoint.coordinate)
            .map(|coordinate| format!("{LOC}={}", coordinate.to_query_value())),
    );

    if let Some(view) = view {
        if let Some(center) = view.center {
            pairs.push(format!("{CENTER}={}", center.to_query_value()));
        }
        pairs.push(format!("{ZOOM}={}", view.zoom));
    }

    if settings.language != DEFAULT_LANGUAGE && !settings.language.is_empty() {
        pairs.push(format!("{LANGUAGE}={}", escape(&settings.language)));
    }
    if settings.alternative != 0 {
        pairs.push(format!("{ALTERNATIVE}={}", settings.alternative));
    }
    if settings.service != DEFAULT_SERVICE && !settings.service.is_empty() {
        pairs.push(format!("{SERVICE}={}", escape(&settings.service)));
    }

    pairs.join("&")
}

/// Parses a share URL query, with or without its leading `?`.
///
/// Malformed values drop only the item they belong to.
pub fn decode(query: &str) -> DecodedQuery {
    let pairs: Vec<(String, String)> = split_pairs(query).map(decode_pair).collect();
    let first = |key: &str| {
        pairs
            .iter()
            .find(|(candidate, _)| candidate == key)
            .map(|(_, value)| value.as_str())
    };

    let locs: Vec<&str> = pairs
        .iter()
        .filter(|(key, _)| key == LOC)
        .map(|(_, value)| value.as_str())
        .collect();

    let coordinates = if !locs.is_empty() {
        parse_coordinates(locs)
    } else if let Some(legacy) = first(LEGACY_WAYPOINTS) {
        parse_coordinates(legacy.split(';'))
    } else {
        Vec::new()
    };

    let center = first(CENTER).and_then(|value| {
        let parsed = Coordinate::parse_pair(value);
        if parsed.is_none() {
            warn!(value, "ignoring malformed center in share URL");
        }
        parsed
    });
    let zoom = first(ZOOM).or_else(|| first(LEGACY_ZOOM)).and_then(|value| {
        let parsed = value.trim().parse::<u8>().ok();
        if parsed.is_none() {
            warn!(value, "ignoring malformed zoom in share URL");
        }
        parsed
    });
    let view = match (center, zoom) {
        (None, None) => None,
        (center, zoom) => Some(ViewState {
            center,
            zoom: zoom.unwrap_or(DEFAULT_CENTER_ZOOM),
        }),
    };

    let mut settings = LocaleSettings::default();
    if let Some(language) = first(LANGUAGE).filter(|value| !value.is_empty()) {
        settings.language = language.to_string();
    }
    if let Some(alternative) = first(ALTERNATIVE) {
        settings.alternative = alternative.trim().parse().unwrap_or(0);
    }
    if let Some(service) = first(SERVICE).filter(|value| !value.is_empty()) {
        settings.service = service.to_string();
    }

    DecodedQuery {
        coordinates,
        view,
        settings,
    }
}

fn parse_coordinates<'a, I>(values: I) -> Vec<Coordinate>
where
    I: IntoIterator<Item = &'a str>,
{
    values
        .into_iter()
        .filter_map(|value| {
            let parsed = Coordinate::parse_pair(value);
            if parsed.is_none() {
                warn!(value, "dropping malformed waypoint from share URL");
            }
            parsed
        })
        .collect()
}

fn split_pairs(query: &str) -> impl Iterator<Item = &str> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|raw| !raw.is_empty())
}

fn decode_pair(raw: &str) -> (String, String) {
    form_urlencoded::parse(raw.as_bytes())
        .next()
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .unwrap_or_default()
}

fn escape(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
