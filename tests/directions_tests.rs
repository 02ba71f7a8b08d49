mod fixtures;

use fixtures::*;
use route_planner::directions::{DirectionsDeriver, StepKind};
use route_planner::highlight::{HighlightState, SegmentHighlighter};
use route_planner::instructions::{CompileError, EnglishCompiler, ManeuverStep};
use route_planner::polyline::Polyline;
use route_planner::route::{InstructionSource, RawInstruction, RouteResult};
use route_planner::traits::InstructionCompiler;
use route_planner::view::ViewCommand;

struct PanickingCompiler;

impl InstructionCompiler for PanickingCompiler {
    fn compile(&self, _language: &str, _step: &ManeuverStep<'_>) -> Result<String, CompileError> {
        panic!("instruction table missing");
    }
}

struct BlankCompiler;

impl InstructionCompiler for BlankCompiler {
    fn compile(&self, _language: &str, _step: &ManeuverStep<'_>) -> Result<String, CompileError> {
        Ok("   ".to_string())
    }
}

fn turning_route() -> RouteResult {
    RouteResult {
        geometry: Polyline::new(straight_line(ALEXANDERPLATZ, BRANDENBURG_GATE, 20)),
        instructions: vec![
            RawInstruction::maneuver("depart", None, "Karl-Liebknecht-Straße", 0),
            RawInstruction::maneuver("turn", Some("right"), "Main St", 5).with_cost(420.0, 61.0),
            RawInstruction::maneuver("roundabout", Some("right"), "Main St", 10).with_exit(2),
            RawInstruction::maneuver("arrive", None, "", 19),
        ],
        ..Default::default()
    }
}

#[test]
fn berlin_scenario_highlights_each_step_segment() {
    let route = alexanderplatz_to_gate();
    assert_eq!(route.geometry.len(), 50);
    let mut highlighter = SegmentHighlighter::new();

    let fit = highlighter.select(0, &route);
    assert!(matches!(fit, Some(ViewCommand::FitBounds { padding: 50, .. })));
    match highlighter.state() {
        HighlightState::Highlighted { step, path } => {
            assert_eq!(*step, 0);
            assert_eq!(path.as_slice(), &route.geometry.points()[0..30]);
        }
        HighlightState::Idle => panic!("step 0 should be highlighted"),
    }

    highlighter.select(1, &route);
    match highlighter.state() {
        HighlightState::Highlighted { step, path } => {
            assert_eq!(*step, 1);
            assert_eq!(path.as_slice(), &route.geometry.points()[30..50]);
        }
        HighlightState::Idle => panic!("step 1 should be highlighted"),
    }

    highlighter.select(1, &route);
    assert_eq!(highlighter.state(), &HighlightState::Idle);
}

#[test]
fn step_before_an_unindexed_instruction_runs_to_the_end() {
    let mut route = alexanderplatz_to_gate();
    route.instructions.push(RawInstruction {
        source: InstructionSource::Text {
            text: "You have arrived".to_string(),
            kind: Some("DestinationReached".to_string()),
        },
        road: String::new(),
        geometry_index: None,
        distance: None,
        duration: None,
    });
    let mut highlighter = SegmentHighlighter::new();

    assert!(highlighter.select(1, &route).is_some());
    match highlighter.state() {
        HighlightState::Highlighted { path, .. } => {
            assert_eq!(path.len(), 20);
            assert_eq!(path.as_slice(), &route.geometry.points()[30..50]);
        }
        HighlightState::Idle => panic!("step 1 should be highlighted"),
    }
}

#[test]
fn deselect_clears_the_highlight() {
    let route = alexanderplatz_to_gate();
    let mut highlighter = SegmentHighlighter::new();
    highlighter.select(1, &route);
    highlighter.deselect();
    assert_eq!(highlighter.selected(), None);
}

#[test]
fn empty_route_derives_no_steps() {
    let directions = DirectionsDeriver::default().derive(&RouteResult::default());
    assert!(directions.steps.is_empty());
    assert_eq!(directions.summary.total_distance, 0.0);
}

#[test]
fn derived_steps_keep_kind_costs_and_geometry_index() {
    let directions = DirectionsDeriver::default().derive(&turning_route());
    let kinds: Vec<StepKind> = directions.steps.iter().map(|step| step.kind).collect();
    assert_eq!(
        kinds,
        vec![StepKind::Depart, StepKind::TurnRight, StepKind::Roundabout, StepKind::Arrive]
    );

    let turn = &directions.steps[1];
    assert_eq!(turn.instruction, "Turn right onto Main St");
    assert_eq!(turn.distance, 420.0);
    assert_eq!(turn.duration, 61.0);
    assert_eq!(turn.road, "Main St");
    assert_eq!(turn.geometry_index, 5);

    assert_eq!(
        directions.steps[2].instruction,
        "Enter the roundabout and take the 2nd exit onto Main St"
    );
    // No modifier: the templated sentence is used.
    assert_eq!(directions.steps[0].instruction, "Head out on Karl-Liebknecht-Straße");
    assert_eq!(directions.steps[3].instruction, "Arrive at your destination");
    assert_eq!(directions.steps[0].distance, 0.0);
}

#[test]
fn unsupported_language_falls_back_to_templates() {
    let deriver = DirectionsDeriver::new(EnglishCompiler, "de");
    let directions = deriver.derive(&turning_route());
    assert_eq!(directions.steps[1].instruction, "Turn right onto Main St");
    assert_eq!(
        directions.steps[2].instruction,
        "At the roundabout, take exit 2 onto Main St"
    );
}

#[test]
fn panicking_compiler_never_aborts_derivation() {
    let deriver = DirectionsDeriver::new(PanickingCompiler, "en");
    let directions = deriver.derive(&turning_route());
    assert_eq!(directions.steps.len(), 4);
    assert_eq!(directions.steps[1].instruction, "Turn right onto Main St");
}

#[test]
fn blank_compiler_output_is_replaced() {
    let deriver = DirectionsDeriver::new(BlankCompiler, "en");
    let directions = deriver.derive(&turning_route());
    assert_eq!(directions.steps[1].instruction, "Turn right onto Main St");
}

#[test]
fn text_instructions_use_the_engine_wording() {
    let route = RouteResult {
        geometry: Polyline::new(straight_line(ALEXANDERPLATZ, POTSDAMER_PLATZ, 10)),
        instructions: vec![
            RawInstruction {
                source: InstructionSource::Text {
                    text: "Bear right onto Leipziger Straße".to_string(),
                    kind: Some("SlightRight".to_string()),
                },
                road: "Leipziger Straße".to_string(),
                geometry_index: Some(0),
                distance: Some(900.0),
                duration: None,
            },
            RawInstruction {
                source: InstructionSource::Text {
                    text: String::new(),
                    kind: Some("DestinationReached".to_string()),
                },
                road: String::new(),
                geometry_index: None,
                distance: None,
                duration: None,
            },
        ],
        ..Default::default()
    };

    let directions = DirectionsDeriver::default().derive(&route);
    assert_eq!(directions.steps[0].instruction, "Bear right onto Leipziger Straße");
    assert_eq!(directions.steps[0].kind, StepKind::SlightRight);
    assert_eq!(directions.steps[0].duration, 0.0);
    assert_eq!(directions.steps[1].instruction, "Arrive at your destination");
    assert_eq!(directions.steps[1].kind, StepKind::Arrive);
    assert_eq!(directions.steps[1].geometry_index, 0);
}
