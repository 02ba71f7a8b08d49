//! Camera model shared with the map surface.
//!
//! The planner never moves a map itself. It decides on a `ViewCommand` and
//! hands it to whoever renders.

use serde::{Deserialize, Serialize};

use crate::geo::{Bounds, Coordinate};

/// At or below this zoom the map is considered untouched.
pub const WORLD_VIEW_ZOOM: u8 = 3;

/// Zoom used when centering on a single waypoint.
pub const FOCUS_ZOOM: u8 = 15;

/// Padding in pixels kept around fitted bounds.
pub const FIT_PADDING: u32 = 50;

/// The camera as the map surface currently shows it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub center: Coordinate,
    pub zoom: u8,
    pub bounds: Bounds,
}

impl Viewport {
    /// The initial zoomed-out view of a fresh session.
    pub fn world() -> Self {
        Self {
            center: Coordinate::new(20.0, 0.0),
            zoom: 2,
            bounds: Bounds {
                south: -85.0,
                west: -180.0,
                north: 85.0,
                east: 180.0,
            },
        }
    }

    pub fn is_world_view(&self) -> bool {
        self.zoom <= WORLD_VIEW_ZOOM
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self::world()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ViewCommand {
    Recenter { center: Coordinate, zoom: u8 },
    FitBounds { bounds: Bounds, padding: u32 },
}

/// Decides whether the camera should follow a new set of resolved
/// waypoints.
///
/// A single waypoint is only centered on while the map still shows the
/// world. Several waypoints are fitted when one of them is off screen or
/// the map still shows the world. Otherwise the camera stays put.
pub fn plan_waypoint_view(resolved: &[Coordinate], viewport: &Viewport) -> Option<ViewCommand> {
    match resolved {
        [] => None,
        [single] => viewport.is_world_view().then_some(ViewCommand::Recenter {
            center: *single,
            zoom: FOCUS_ZOOM,
        }),
        many => {
            let off_screen = many
                .iter()
                .any(|coordinate| !viewport.bounds.contains(coordinate));
            if off_screen || viewport.is_world_view() {
                Bounds::from_coordinates(many).map(|bounds| ViewCommand::FitBounds {
                    bounds,
                    padding: FIT_PADDING,
                })
            } else {
                None
            }
        }
    }
}
