//! route-planner core
//!
//! Keeps an ordered waypoint list, a routing engine, a share URL and an
//! address panel in agreement without update cycles, and turns routes into
//! turn-by-turn directions.

pub mod config;
pub mod directions;
pub mod entry;
pub mod geo;
pub mod geocode;
pub mod highlight;
pub mod instructions;
pub mod logging;
pub mod nominatim;
pub mod osrm;
pub mod polyline;
pub mod route;
pub mod session;
pub mod store;
pub mod sync;
pub mod traits;
pub mod url_codec;
pub mod view;
