//! Directions Deriver: turns a raw `RouteResult` into display-ready steps.
//!
//! Derivation never fails. Each instruction independently degrades from a
//! compiled sentence, to the engine's own text, to a templated sentence.

use std::panic::{self, AssertUnwindSafe};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::instructions::{EnglishCompiler, ManeuverStep};
use crate::route::{InstructionSource, RawInstruction, RouteResult, RouteSummary};
use crate::traits::InstructionCompiler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    Depart,
    Arrive,
    Continue,
    TurnLeft,
    TurnRight,
    SlightLeft,
    SlightRight,
    SharpLeft,
    SharpRight,
    UTurn,
    Roundabout,
    Merge,
    Fork,
    OffRamp,
    Via,
}

impl StepKind {
    /// Sprite glyph used by the directions list.
    pub fn icon(&self) -> &'static str {
        match self {
            StepKind::Depart => "depart",
            StepKind::Arrive => "arrive",
            StepKind::Continue => "continue",
            StepKind::TurnLeft => "turn-left",
            StepKind::TurnRight => "turn-right",
            StepKind::SlightLeft | StepKind::Fork | StepKind::OffRamp => "bear-left",
            StepKind::SlightRight => "bear-right",
            StepKind::SharpLeft => "sharp-left",
            StepKind::SharpRight => "sharp-right",
            StepKind::UTurn => "u-turn",
            StepKind::Roundabout => "enter-roundabout",
            StepKind::Merge => "turn-right",
            StepKind::Via => "via",
        }
    }
}

/// Lower-cases and drops separators so `"slight left"`, `"SlightLeft"` and
/// `"slight-left"` compare equal.
fn normalize(token: &str) -> String {
    token
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn turn_from_modifier(modifier: Option<&str>) -> StepKind {
    match modifier.map(normalize).as_deref() {
        Some("left") => StepKind::TurnLeft,
        Some("right") => StepKind::TurnRight,
        Some("slightleft") => StepKind::SlightLeft,
        Some("slightright") => StepKind::SlightRight,
        Some("sharpleft") => StepKind::SharpLeft,
        Some("sharpright") => StepKind::SharpRight,
        Some("uturn") => StepKind::UTurn,
        _ => StepKind::Continue,
    }
}

/// Maps a (maneuver kind, modifier) pair onto a `StepKind`.
///
/// Accepts both OSRM maneuver types and the single-token types some
/// engines emit as plain text tags (`"SlightRight"`, `"DestinationReached"`).
pub fn classify(kind: &str, modifier: Option<&str>) -> StepKind {
    match normalize(kind).as_str() {
        "depart" | "head" => StepKind::Depart,
        "arrive" | "destinationreached" => StepKind::Arrive,
        "via" | "waypointreached" => StepKind::Via,
        "roundabout" | "rotary" | "roundaboutturn" | "exitroundabout" | "exitrotary"
        | "enterroundabout" | "enteragainstallowedroundabout" => StepKind::Roundabout,
        "merge" => StepKind::Merge,
        "fork" => StepKind::Fork,
        "offramp" => StepKind::OffRamp,
        "left" => StepKind::TurnLeft,
        "right" => StepKind::TurnRight,
        "slightleft" => StepKind::SlightLeft,
        "slightright" => StepKind::SlightRight,
        "sharpleft" => StepKind::SharpLeft,
        "sharpright" => StepKind::SharpRight,
        "uturn" => StepKind::UTurn,
        _ => turn_from_modifier(modifier),
    }
}

/// Sentence used when nothing better is available.
pub fn template_sentence(
    kind: &str,
    modifier: Option<&str>,
    road: &str,
    exit: Option<u32>,
) -> String {
    let name = if road.trim().is_empty() {
        "the road"
    } else {
        road.trim()
    };
    let modifier = modifier.unwrap_or_default();

    match normalize(kind).as_str() {
        "depart" | "head" if modifier.is_empty() => format!("Head out on {name}"),
        "depart" | "head" => format!("Head {modifier} on {name}"),
        "arrive" | "destinationreached" => "Arrive at your destination".to_string(),
        "via" | "waypointreached" => "Arrive at your waypoint".to_string(),
        "turn" | "newname" | "continue" => {
            let turn = match normalize(modifier).as_str() {
                "straight" => "Continue straight",
                "slightright" => "Turn slightly right",
                "right" => "Turn right",
                "sharpright" => "Turn sharply right",
                "uturn" => "Make a U-turn",
                "sharpleft" => "Turn sharply left",
                "left" => "Turn left",
                "slightleft" => "Turn slightly left",
                _ => "Continue",
            };
            format!("{turn} onto {name}")
        }
        "roundabout" | "rotary" => {
            format!("At the roundabout, take exit {} onto {name}", exit.unwrap_or(1))
        }
        "merge" => format!("Merge onto {name}"),
        _ => format!("Continue on {name}"),
    }
}

/// One display-ready instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirectionStep {
    pub instruction: String,
    /// Meters.
    pub distance: f64,
    /// Seconds.
    pub duration: f64,
    pub road: String,
    pub kind: StepKind,
    /// Where the step starts in the route geometry.
    pub geometry_index: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Directions {
    pub steps: Vec<DirectionStep>,
    pub summary: RouteSummary,
}

pub struct DirectionsDeriver<C = EnglishCompiler> {
    compiler: C,
    language: String,
}

impl Default for DirectionsDeriver {
    fn default() -> Self {
        Self::new(EnglishCompiler, "en")
    }
}

impl<C: InstructionCompiler> DirectionsDeriver<C> {
    pub fn new(compiler: C, language: impl Into<String>) -> Self {
        Self {
            compiler,
            language: language.into(),
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn set_language(&mut self, language: impl Into<String>) {
        self.language = language.into();
    }

    pub fn derive(&self, route: &RouteResult) -> Directions {
        Directions {
            steps: route
                .instructions
                .iter()
                .map(|instruction| self.derive_step(instruction))
                .collect(),
            summary: route.summary,
        }
    }

    fn derive_step(&self, instruction: &RawInstruction) -> DirectionStep {
        let (kind, text) = match &instruction.source {
            InstructionSource::Maneuver {
                kind,
                modifier,
                exit,
            } => {
                let text = match modifier {
                    Some(modifier) => self.compile(&ManeuverStep {
                        kind,
                        modifier: Some(modifier.as_str()),
                        road: &instruction.road,
                        exit: *exit,
                    }),
                    None => None,
                };
                let text = text.unwrap_or_else(|| {
                    template_sentence(kind, modifier.as_deref(), &instruction.road, *exit)
                });
                (classify(kind, modifier.as_deref()), text)
            }
            InstructionSource::Text { text, kind } => {
                let tag = kind.as_deref().unwrap_or_default();
                let text = if text.trim().is_empty() {
                    template_sentence(tag, None, &instruction.road, None)
                } else {
                    text.clone()
                };
                (classify(tag, None), text)
            }
        };

        DirectionStep {
            instruction: text,
            distance: instruction.distance.unwrap_or(0.0),
            duration: instruction.duration.unwrap_or(0.0),
            road: instruction.road.clone(),
            kind,
            geometry_index: instruction.geometry_index.unwrap_or(0),
        }
    }

    /// `None` when the compiler errors, panics, or returns nothing.
    fn compile(&self, step: &ManeuverStep<'_>) -> Option<String> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.compiler.compile(&self.language, step)
        }));
        match outcome {
            Ok(Ok(text)) if !text.trim().is_empty() => Some(text),
            Ok(Ok(_)) => None,
            Ok(Err(err)) => {
                debug!(
                    error = %err,
                    kind = step.kind,
                    "instruction compiler declined, using template"
                );
                None
            }
            Err(_) => {
                debug!(kind = step.kind, "instruction compiler panicked, using template");
                None
            }
        }
    }
}

/// `"0 m"`, `"850 m"`, `"12.3 km"`.
pub fn format_distance(meters: f64) -> String {
    if meters <= 0.0 || !meters.is_finite() {
        "0 m".to_string()
    } else if meters < 1000.0 {
        format!("{} m", meters.round())
    } else {
        format!("{:.1} km", meters / 1000.0)
    }
}

/// `"0 min"`, `"42 min"`, `"1 hr 5 min"`.
pub fn format_duration(seconds: f64) -> String {
    if seconds <= 0.0 || !seconds.is_finite() {
        return "0 min".to_string();
    }
    let total = seconds as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    if hours > 0 {
        format!("{hours} hr {minutes} min")
    } else {
        format!("{minutes} min")
    }
}

/// `"0s"`, `"45s"`, `"3 min"`.
pub fn format_step_duration(seconds: f64) -> String {
    if seconds <= 0.0 || !seconds.is_finite() {
        "0s".to_string()
    } else if seconds < 60.0 {
        format!("{}s", seconds.round())
    } else {
        format!("{} min", (seconds / 60.0).round())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_osrm_pairs() {
        assert_eq!(classify("turn", Some("left")), StepKind::TurnLeft);
        assert_eq!(classify("turn", Some("sharp right")), StepKind::SharpRight);
        assert_eq!(classify("continue", Some("slight left")), StepKind::SlightLeft);
        assert_eq!(classify("new name", Some("straight")), StepKind::Continue);
        assert_eq!(classify("end of road", Some("uturn")), StepKind::UTurn);
        assert_eq!(classify("off ramp", Some("right")), StepKind::OffRamp);
        assert_eq!(classify("rotary", None), StepKind::Roundabout);
        assert_eq!(classify("depart", None), StepKind::Depart);
        assert_eq!(classify("arrive", Some("left")), StepKind::Arrive);
        assert_eq!(classify("via", None), StepKind::Via);
    }

    #[test]
    fn test_classify_text_tags() {
        assert_eq!(classify("SlightRight", None), StepKind::SlightRight);
        assert_eq!(classify("DestinationReached", None), StepKind::Arrive);
        assert_eq!(classify("WaypointReached", None), StepKind::Via);
        assert_eq!(classify("Head", None), StepKind::Depart);
        assert_eq!(classify("", None), StepKind::Continue);
    }

    #[test]
    fn test_template_sentences() {
        assert_eq!(
            template_sentence("turn", Some("right"), "Main St", None),
            "Turn right onto Main St"
        );
        assert_eq!(
            template_sentence("roundabout", Some("right"), "Main St", Some(2)),
            "At the roundabout, take exit 2 onto Main St"
        );
        assert_eq!(template_sentence("fork", None, "", None), "Continue on the road");
        assert_eq!(template_sentence("notification", None, "Elm", None), "Continue on Elm");
    }

    #[test]
    fn test_format_distance() {
        assert_eq!(format_distance(0.0), "0 m");
        assert_eq!(format_distance(849.6), "850 m");
        assert_eq!(format_distance(12_345.0), "12.3 km");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0 min");
        assert_eq!(format_duration(42.0 * 60.0), "42 min");
        assert_eq!(format_duration(3900.0), "1 hr 5 min");
        assert_eq!(format_step_duration(44.6), "45s");
        assert_eq!(format_step_duration(170.0), "3 min");
    }
}
