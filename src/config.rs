//! Planner configuration: collaborator endpoints and timing constants.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::nominatim::NominatimConfig;
use crate::osrm::OsrmConfig;

/// Artificial delays of the cooperative event model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// How long engine-originated waypoint events are ignored after a push.
    pub settle: Duration,
    /// Pause before every reverse lookup, for third-party rate limits.
    pub reverse_delay: Duration,
    /// Upper bound on a single reverse lookup.
    pub reverse_timeout: Duration,
    /// Quiet period before a keystroke-driven search is issued.
    pub debounce: Duration,
    /// How long a blurred input keeps its suggestions.
    pub blur_grace: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(300),
            reverse_delay: Duration::from_millis(500),
            reverse_timeout: Duration::from_secs(5),
            debounce: Duration::from_millis(300),
            blur_grace: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlannerConfig {
    pub osrm: OsrmConfig,
    pub nominatim: NominatimConfig,
    pub timings: Timings,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be an http(s) URL, got {value:?}")]
    InvalidUrl { name: &'static str, value: String },

    #[error("{name} must not be empty")]
    Empty { name: &'static str },
}

impl PlannerConfig {
    /// Defaults overridden by `OSRM_URL`, `OSRM_PROFILE`, `NOMINATIM_URL`
    /// and `NOMINATIM_USER_AGENT`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup("OSRM_URL") {
            config.osrm.base_url = checked_url("OSRM_URL", value)?;
        }
        if let Some(value) = lookup("OSRM_PROFILE") {
            config.osrm.profile = non_empty("OSRM_PROFILE", value)?;
        }
        if let Some(value) = lookup("NOMINATIM_URL") {
            config.nominatim.base_url = checked_url("NOMINATIM_URL", value)?;
        }
        if let Some(value) = lookup("NOMINATIM_USER_AGENT") {
            config.nominatim.user_agent = non_empty("NOMINATIM_USER_AGENT", value)?;
        }
        Ok(config)
    }

    /// Normalizes and checks values that came from elsewhere, e.g. CLI
    /// flags.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        self.osrm.base_url = checked_url("OSRM_URL", self.osrm.base_url)?;
        self.osrm.profile = non_empty("OSRM_PROFILE", self.osrm.profile)?;
        self.nominatim.base_url = checked_url("NOMINATIM_URL", self.nominatim.base_url)?;
        self.nominatim.user_agent = non_empty("NOMINATIM_USER_AGENT", self.nominatim.user_agent)?;
        Ok(self)
    }
}

pub(crate) fn checked_url(name: &'static str, value: String) -> Result<String, ConfigError> {
    let trimmed = value.trim().trim_end_matches('/');
    match url::Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(trimmed.to_string()),
        _ => Err(ConfigError::InvalidUrl { name, value }),
    }
}

fn non_empty(name: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Empty { name })
    } else {
        Ok(value.trim().to_string())
    }
}
