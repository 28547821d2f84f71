// Lesson normalizer - Loosely typed lesson JSON to a validated config
// Never fails: authored lesson data must not break the practice screen

use super::{LessonConfig, TimeSignature, UiFlags};
use crate::sequencer::pattern::{Bar, Pattern, StepGrid};
use crate::sequencer::transport::TransportConfig;
use serde_json::Value;
use std::ops::RangeInclusive;

pub const BPM_RANGE: RangeInclusive<u32> = 40..=220;
pub const BARS_RANGE: RangeInclusive<u32> = 1..=64;
pub const COUNT_IN_RANGE: RangeInclusive<u32> = 0..=4;
pub const BEATS_PER_BAR_RANGE: RangeInclusive<u32> = 1..=12;

pub const DEFAULT_BPM: u32 = 90;
pub const DEFAULT_COUNT_IN_BARS: u32 = 1;

/// Clamp a tempo to the range lessons may ask for
pub fn clamp_bpm(bpm: u32) -> u32 {
    bpm.clamp(*BPM_RANGE.start(), *BPM_RANGE.end())
}

/// Numbers, or strings holding a number
fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

fn clamp_round(value: f64, range: &RangeInclusive<u32>) -> u32 {
    let (low, high) = (*range.start() as f64, *range.end() as f64);
    value.round().clamp(low, high) as u32
}

/// Integral step index, or None for anything else
fn as_step_index(value: &Value) -> Option<i64> {
    let number = as_number(value)?;
    (number.fract() == 0.0).then_some(number as i64)
}

/// A bar is either `{ "hits": [...] }` or a bare array of step indices
fn parse_bar(raw: &Value, grid: StepGrid) -> (Bar, usize) {
    let hits = match raw {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => raw
            .get("hits")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default(),
        _ => &[],
    };

    let steps = grid.steps() as i64;
    let indices: Vec<i64> = hits
        .iter()
        .filter_map(as_step_index)
        .filter(|index| (0..steps).contains(index))
        .collect();
    // Duplicates are valid input, only filtered entries count
    let discarded = hits.len() - indices.len();
    (Bar::from_indices(indices, grid), discarded)
}

/// UI flags default to on unless explicitly `false`
fn flag(ui: Option<&Value>, name: &str) -> bool {
    ui.and_then(|ui| ui.get(name)) != Some(&Value::Bool(false))
}

/// Build a usable lesson config from any JSON value
pub fn normalize_lesson(raw: &Value) -> LessonConfig {
    let transport = raw.get("transport");
    let field = |name: &str| transport.and_then(|t| t.get(name));
    let number = |name: &str| field(name).and_then(as_number);

    let grid = number("stepsPerBar")
        .map(StepGrid::nearest)
        .unwrap_or_default();

    let raw_bars: &[Value] = raw
        .get("pattern")
        .and_then(|p| p.get("bars"))
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let bars = match number("bars") {
        Some(bars) => clamp_round(bars, &BARS_RANGE),
        None => (raw_bars.len() as u32).clamp(*BARS_RANGE.start(), *BARS_RANGE.end()),
    };

    let bpm = number("bpm")
        .map(|bpm| clamp_round(bpm, &BPM_RANGE))
        .unwrap_or(DEFAULT_BPM);

    let parsed_signature = field("timeSig")
        .and_then(Value::as_str)
        .and_then(TimeSignature::parse)
        .unwrap_or_default();
    let beats_per_bar = parsed_signature
        .numerator
        .clamp(*BEATS_PER_BAR_RANGE.start(), *BEATS_PER_BAR_RANGE.end());
    let time_signature = TimeSignature {
        numerator: beats_per_bar,
        ..parsed_signature
    };

    let count_in_bars = number("countInBars")
        .map(|bars| clamp_round(bars, &COUNT_IN_RANGE))
        .unwrap_or(DEFAULT_COUNT_IN_BARS);

    let ui_raw = raw.get("ui");
    let ui = UiFlags {
        show_metronome: flag(ui_raw, "showMetronome"),
        loop_playback: flag(ui_raw, "loop"),
        show_notes: flag(ui_raw, "showNotes"),
    };

    let mut discarded = 0;
    let parsed: Vec<Bar> = raw_bars
        .iter()
        .take(bars as usize)
        .map(|raw_bar| {
            let (bar, dropped) = parse_bar(raw_bar, grid);
            discarded += dropped;
            bar
        })
        .collect();
    if discarded > 0 {
        tracing::warn!(discarded, steps_per_bar = grid.steps(), "dropped invalid hit indices");
    }

    LessonConfig {
        title: raw.get("title").and_then(Value::as_str).map(str::to_owned),
        time_signature,
        transport: TransportConfig {
            bpm,
            grid,
            beats_per_bar,
            bars,
            count_in_bars,
            loop_playback: ui.loop_playback,
        },
        pattern: Pattern::from_bars(grid, bars, parsed),
        ui,
    }
}
