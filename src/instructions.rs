//! Built-in instruction compiler for OSRM-style maneuvers.
//!
//! Only English is bundled. Any other language reports
//! `CompileError::UnsupportedLanguage` and the directions fall back to
//! templated sentences.

use thiserror::Error;

use crate::traits::InstructionCompiler;

/// Borrowed view of one structured maneuver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManeuverStep<'a> {
    pub kind: &'a str,
    pub modifier: Option<&'a str>,
    pub road: &'a str,
    pub exit: Option<u32>,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CompileError {
    #[error("no instructions available for language {0:?}")]
    UnsupportedLanguage(String),

    #[error("maneuver {kind:?} requires a {field}")]
    MissingField { kind: String, field: &'static str },

    #[error("unknown maneuver type {0:?}")]
    UnknownManeuver(String),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishCompiler;

impl InstructionCompiler for EnglishCompiler {
    fn compile(&self, language: &str, step: &ManeuverStep<'_>) -> Result<String, CompileError> {
        let base = language.split(['-', '_']).next().unwrap_or_default();
        if !base.eq_ignore_ascii_case("en") {
            return Err(CompileError::UnsupportedLanguage(language.to_string()));
        }

        let direction = step.modifier.map(direction_phrase);
        let road = step.road.trim();
        let onto = |sentence: String| {
            if road.is_empty() {
                sentence
            } else {
                format!("{sentence} onto {road}")
            }
        };

        let sentence = match step.kind {
            "depart" => match (direction, road.is_empty()) {
                (Some(direction), false) => format!("Head {direction} on {road}"),
                (Some(direction), true) => format!("Head {direction}"),
                (None, false) => format!("Head out on {road}"),
                (None, true) => "Head out".to_string(),
            },
            "arrive" => match step.modifier {
                Some("left") | Some("slight left") | Some("sharp left") => {
                    "You have arrived at your destination, on the left".to_string()
                }
                Some("right") | Some("slight right") | Some("sharp right") => {
                    "You have arrived at your destination, on the right".to_string()
                }
                _ => "You have arrived at your destination".to_string(),
            },
            "via" => "You have arrived at your waypoint".to_string(),
            "turn" => match step.modifier {
                Some("uturn") => onto("Make a U-turn".to_string()),
                Some("straight") => onto("Go straight".to_string()),
                _ => onto(format!("Turn {}", required(direction, step.kind)?)),
            },
            "new name" => onto(format!("Continue {}", direction.unwrap_or("straight"))),
            "continue" => match step.modifier {
                Some("uturn") => onto("Make a U-turn".to_string()),
                _ => onto(format!("Continue {}", direction.unwrap_or("straight"))),
            },
            "merge" => match direction {
                Some(direction) => onto(format!("Merge {direction}")),
                None => onto("Merge".to_string()),
            },
            "on ramp" => format!("Take the ramp on the {}", required(direction, step.kind)?),
            "off ramp" => format!("Take the exit on the {}", required(direction, step.kind)?),
            "fork" => onto(format!("Keep {} at the fork", required(direction, step.kind)?)),
            "end of road" => {
                let direction = required(direction, step.kind)?;
                onto(format!("Turn {direction} at the end of the road"))
            }
            "use lane" => {
                let direction = required(direction, step.kind)?;
                format!("Keep {direction} to stay on the current road")
            }
            "roundabout" | "rotary" => match step.exit {
                Some(exit) => onto(format!(
                    "Enter the roundabout and take the {} exit",
                    ordinal(exit)
                )),
                None => onto("Enter the roundabout".to_string()),
            },
            "roundabout turn" => {
                let direction = required(direction, step.kind)?;
                onto(format!("At the roundabout, turn {direction}"))
            }
            "exit roundabout" | "exit rotary" => onto("Exit the roundabout".to_string()),
            "notification" => onto(format!("Continue {}", direction.unwrap_or("straight"))),
            other => return Err(CompileError::UnknownManeuver(other.to_string())),
        };
        Ok(sentence)
    }
}

fn required<'a>(modifier: Option<&'a str>, kind: &str) -> Result<&'a str, CompileError> {
    modifier.ok_or_else(|| CompileError::MissingField {
        kind: kind.to_string(),
        field: "modifier",
    })
}

fn direction_phrase(modifier: &str) -> &str {
    match modifier {
        "uturn" => "around",
        "straight" => "straight",
        other => other,
    }
}

fn ordinal(n: u32) -> String {
    let suffix = match (n % 10, n % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{n}{suffix}")
}
