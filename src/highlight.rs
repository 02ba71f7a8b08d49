//! Segment Highlighter: at most one emphasized stretch of the route.

use tracing::debug;

use crate::geo::{Bounds, Coordinate};
use crate::route::RouteResult;
use crate::view::{FIT_PADDING, ViewCommand};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum HighlightState {
    #[default]
    Idle,
    Highlighted {
        step: usize,
        /// Overlay path, at least two points.
        path: Vec<Coordinate>,
    },
}

/// Geometry slice `[start, end)` covered by instruction `step`, where
/// `start` is the step's geometry index and `end` is the next step's, or
/// the end of the geometry for the last step.
pub fn step_segment(route: &RouteResult, step: usize) -> Option<&[Coordinate]> {
    let instruction = route.instructions.get(step)?;
    let start = instruction.geometry_index.unwrap_or(0);
    let end = route
        .instructions
        .get(step + 1)
        .and_then(|next| next.geometry_index)
        .unwrap_or(route.geometry.len());
    Some(route.geometry.segment(start, end))
}

#[derive(Debug, Default)]
pub struct SegmentHighlighter {
    state: HighlightState,
}

impl SegmentHighlighter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    pub fn selected(&self) -> Option<usize> {
        match self.state {
            HighlightState::Idle => None,
            HighlightState::Highlighted { step, .. } => Some(step),
        }
    }

    /// Toggles the highlight for `step`.
    ///
    /// Selecting the highlighted step again returns to idle; selecting
    /// another one replaces the highlight in one move. Returns the camera
    /// fit for a newly drawn highlight.
    pub fn select(&mut self, step: usize, route: &RouteResult) -> Option<ViewCommand> {
        if self.selected() == Some(step) {
            self.state = HighlightState::Idle;
            return None;
        }

        let Some(segment) = step_segment(route, step).filter(|segment| segment.len() >= 2) else {
            debug!(step, "no drawable segment for step");
            self.state = HighlightState::Idle;
            return None;
        };

        let path = segment.to_vec();
        let fit = Bounds::from_coordinates(&path).map(|bounds| ViewCommand::FitBounds {
            bounds,
            padding: FIT_PADDING,
        });
        self.state = HighlightState::Highlighted { step, path };
        fit
    }

    pub fn deselect(&mut self) {
        self.state = HighlightState::Idle;
    }
}
