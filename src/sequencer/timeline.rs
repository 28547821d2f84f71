// Timeline - Pattern view with a single playhead
// Purely reactive: the host forwards transport steps, the timeline keeps the visual state

use super::pattern::Pattern;
use std::fmt;

/// How long a hit acknowledgment stays visible
pub const PULSE_DURATION_MS: f64 = 140.0;

/// Visual state of one grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Rest,
    Hit,
    Playhead,
    PlayheadOnHit,
    Pulse,
}

impl CellState {
    pub fn glyph(self) -> char {
        match self {
            CellState::Rest => '.',
            CellState::Hit => 'o',
            CellState::Playhead => '^',
            CellState::PlayheadOnHit => 'O',
            CellState::Pulse => '*',
        }
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Grid coordinate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cell {
    pub bar: u32,
    pub step: u32,
}

#[derive(Debug, Clone, Copy)]
struct Pulse {
    cell: Cell,
    expires_at_ms: f64,
}

/// Pattern plus playhead and pulse state
#[derive(Debug, Clone)]
pub struct Timeline {
    pattern: Pattern,
    show_notes: bool,
    playhead: Option<Cell>,
    pulses: Vec<Pulse>,
    destroyed: bool,
}

impl Timeline {
    pub fn new(pattern: Pattern) -> Self {
        Self {
            pattern,
            show_notes: true,
            playhead: None,
            pulses: Vec::new(),
            destroyed: false,
        }
    }

    /// Hide or show hits in the rendered grid.
    /// Queries such as `is_hit` are not affected.
    pub fn with_show_notes(mut self, show_notes: bool) -> Self {
        self.show_notes = show_notes;
        self
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn contains(&self, bar: u32, step: u32) -> bool {
        !self.destroyed && bar < self.pattern.bar_count() && step < self.pattern.steps_per_bar()
    }

    pub fn is_hit(&self, bar: u32, step: u32) -> bool {
        !self.destroyed && self.pattern.is_hit(bar, step)
    }

    pub fn playhead(&self) -> Option<Cell> {
        self.playhead
    }

    /// Move the playhead. Out-of-grid coordinates are ignored.
    pub fn set_playhead(&mut self, bar: u32, step: u32) {
        if !self.contains(bar, step) {
            return;
        }
        // Single playhead across every bar
        self.playhead = Some(Cell { bar, step });
    }

    pub fn reset_playhead(&mut self) {
        self.playhead = None;
    }

    /// Flash a cell until `now_ms + PULSE_DURATION_MS`
    pub fn pulse_step(&mut self, bar: u32, step: u32, now_ms: f64) {
        if !self.contains(bar, step) {
            return;
        }

        let cell = Cell { bar, step };
        let expires_at_ms = now_ms + PULSE_DURATION_MS;
        match self.pulses.iter_mut().find(|p| p.cell == cell) {
            Some(pulse) => pulse.expires_at_ms = expires_at_ms,
            None => self.pulses.push(Pulse {
                cell,
                expires_at_ms,
            }),
        }
    }

    /// Drop pulses that have run their course
    pub fn expire_pulses(&mut self, now_ms: f64) {
        self.pulses.retain(|p| p.expires_at_ms > now_ms);
    }

    pub fn is_pulsing(&self, bar: u32, step: u32, now_ms: f64) -> bool {
        self.pulses
            .iter()
            .any(|p| p.cell == Cell { bar, step } && p.expires_at_ms > now_ms)
    }

    pub fn active_pulses(&self, now_ms: f64) -> usize {
        self.pulses.iter().filter(|p| p.expires_at_ms > now_ms).count()
    }

    /// Visual state of one cell
    pub fn cell(&self, bar: u32, step: u32, now_ms: f64) -> CellState {
        let is_playhead = self.playhead == Some(Cell { bar, step });
        let is_hit = self.show_notes && self.is_hit(bar, step);

        if self.is_pulsing(bar, step, now_ms) {
            CellState::Pulse
        } else if is_playhead && is_hit {
            CellState::PlayheadOnHit
        } else if is_playhead {
            CellState::Playhead
        } else if is_hit {
            CellState::Hit
        } else {
            CellState::Rest
        }
    }

    /// Dot grid for one bar, quarter groups separated by a space
    pub fn render_bar(&self, bar: u32, now_ms: f64) -> String {
        if !self.contains(bar, 0) {
            return String::new();
        }

        let stride = self.pattern.grid().quarter_stride();
        let mut row = String::new();
        for step in 0..self.pattern.steps_per_bar() {
            if step > 0 && step % stride == 0 {
                row.push(' ');
            }
            row.push(self.cell(bar, step, now_ms).glyph());
        }
        row
    }

    /// Dot grid for the whole pattern, bars separated by `|`
    pub fn render(&self, now_ms: f64) -> String {
        if self.destroyed {
            return String::new();
        }
        (0..self.pattern.bar_count())
            .map(|bar| self.render_bar(bar, now_ms))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// Release all visual state
    pub fn destroy(&mut self) {
        self.playhead = None;
        self.pulses.clear();
        self.destroyed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::pattern::{Bar, StepGrid};

    fn timeline() -> Timeline {
        let bars = vec![
            Bar::from_indices([0, 2], StepGrid::Four),
            Bar::from_indices([3], StepGrid::Four),
        ];
        Timeline::new(Pattern::from_bars(StepGrid::Four, 2, bars))
    }

    #[test]
    fn test_single_playhead() {
        let mut timeline = timeline();

        timeline.set_playhead(0, 1);
        timeline.set_playhead(1, 3);
        assert_eq!(timeline.playhead(), Some(Cell { bar: 1, step: 3 }));
        assert_eq!(timeline.cell(0, 1, 0.0), CellState::Rest);
        assert_eq!(timeline.cell(1, 3, 0.0), CellState::PlayheadOnHit);

        timeline.reset_playhead();
        assert_eq!(timeline.playhead(), None);
    }

    #[test]
    fn test_out_of_grid_ignored() {
        let mut timeline = timeline();
        timeline.set_playhead(0, 0);

        timeline.set_playhead(5, 0);
        timeline.set_playhead(0, 4);
        assert_eq!(timeline.playhead(), Some(Cell { bar: 0, step: 0 }));

        timeline.pulse_step(9, 9, 0.0);
        assert_eq!(timeline.active_pulses(0.0), 0);
    }

    #[test]
    fn test_pulse_expires() {
        let mut timeline = timeline();
        timeline.pulse_step(0, 2, 1000.0);

        assert!(timeline.is_pulsing(0, 2, 1000.0));
        assert_eq!(timeline.cell(0, 2, 1100.0), CellState::Pulse);
        assert!(!timeline.is_pulsing(0, 2, 1000.0 + PULSE_DURATION_MS));

        timeline.expire_pulses(2000.0);
        assert_eq!(timeline.active_pulses(0.0), 0);
    }

    #[test]
    fn test_pulse_refresh() {
        let mut timeline = timeline();
        timeline.pulse_step(0, 0, 0.0);
        timeline.pulse_step(0, 0, 100.0);

        assert_eq!(timeline.active_pulses(100.0), 1);
        assert!(timeline.is_pulsing(0, 0, 200.0));
    }

    #[test]
    fn test_render() {
        let mut timeline = timeline();
        timeline.set_playhead(0, 1);

        assert_eq!(timeline.render_bar(0, 0.0), "o ^ o .");
        assert_eq!(timeline.render(0.0), "o ^ o . | . . . o");
    }

    #[test]
    fn test_render_hidden_notes() {
        let timeline = timeline().with_show_notes(false);

        assert_eq!(timeline.render_bar(0, 0.0), ". . . .");
        // Queries still see the hits
        assert!(timeline.is_hit(0, 0));
    }

    #[test]
    fn test_destroy() {
        let mut timeline = timeline();
        timeline.set_playhead(0, 0);
        timeline.pulse_step(0, 0, 0.0);

        timeline.destroy();
        assert_eq!(timeline.playhead(), None);
        assert!(!timeline.is_hit(0, 0));
        assert!(timeline.render(0.0).is_empty());
    }
}
