// Pattern - Per-bar hit sets for a lesson
// A pattern is the grid of steps the player is asked to play along with

use std::collections::BTreeSet;
use std::fmt;

/// Supported step grid resolutions (steps per bar)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StepGrid {
    Four,
    #[default]
    Eight,
    Sixteen,
}

impl StepGrid {
    pub const ALL: [StepGrid; 3] = [StepGrid::Four, StepGrid::Eight, StepGrid::Sixteen];

    /// Number of steps in one bar
    pub fn steps(self) -> u32 {
        match self {
            StepGrid::Four => 4,
            StepGrid::Eight => 8,
            StepGrid::Sixteen => 16,
        }
    }

    /// Snap an arbitrary value to the closest supported grid.
    /// Ties go to the finer grid so that no authored hit is lost.
    pub fn nearest(value: f64) -> Self {
        if !value.is_finite() {
            return Self::default();
        }

        let mut best = StepGrid::Four;
        for grid in Self::ALL {
            let distance = (grid.steps() as f64 - value).abs();
            let best_distance = (best.steps() as f64 - value).abs();
            if distance <= best_distance {
                best = grid;
            }
        }
        best
    }

    /// Steps between two quarter-note pulses (at least 1)
    pub fn quarter_stride(self) -> u32 {
        (self.steps() / 4).max(1)
    }
}

impl fmt::Display for StepGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} steps", self.steps())
    }
}

/// One bar of the pattern: the set of steps that carry a hit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bar {
    hits: BTreeSet<u32>,
}

impl Bar {
    /// Empty bar (a bar of rests)
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a bar from raw step indices.
    /// Indices outside `[0, grid.steps())` are dropped.
    pub fn from_indices<I>(indices: I, grid: StepGrid) -> Self
    where
        I: IntoIterator<Item = i64>,
    {
        let steps = grid.steps() as i64;
        let hits = indices
            .into_iter()
            .filter(|&index| (0..steps).contains(&index))
            .map(|index| index as u32)
            .collect();

        Self { hits }
    }

    pub fn contains(&self, step: u32) -> bool {
        self.hits.contains(&step)
    }

    /// Hit steps in ascending order
    pub fn hits(&self) -> impl Iterator<Item = u32> + '_ {
        self.hits.iter().copied()
    }

    pub fn hit_count(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// An immutable multi-bar pattern on a fixed step grid
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    grid: StepGrid,
    bars: Vec<Bar>,
}

impl Pattern {
    /// Create a pattern of `bar_count` empty bars
    pub fn new(grid: StepGrid, bar_count: u32) -> Self {
        Self::from_bars(grid, bar_count, Vec::new())
    }

    /// Create a pattern with exactly `bar_count` bars.
    /// Missing bars are filled with rests, extra bars are dropped.
    pub fn from_bars(grid: StepGrid, bar_count: u32, mut bars: Vec<Bar>) -> Self {
        let bar_count = bar_count.max(1) as usize;
        bars.truncate(bar_count);
        bars.resize_with(bar_count, Bar::empty);

        // Re-filter in case bars were built on a different grid
        let steps = grid.steps();
        for bar in bars.iter_mut() {
            bar.hits.retain(|&step| step < steps);
        }

        Self { grid, bars }
    }

    pub fn grid(&self) -> StepGrid {
        self.grid
    }

    pub fn steps_per_bar(&self) -> u32 {
        self.grid.steps()
    }

    pub fn bar_count(&self) -> u32 {
        self.bars.len() as u32
    }

    /// Total number of steps in one pass through the pattern
    pub fn total_steps(&self) -> u64 {
        self.bar_count() as u64 * self.steps_per_bar() as u64
    }

    pub fn bar(&self, index: u32) -> Option<&Bar> {
        self.bars.get(index as usize)
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Does the step at (bar, step) carry a hit?
    /// Out-of-grid coordinates are never hits.
    pub fn is_hit(&self, bar: u32, step: u32) -> bool {
        self.bar(bar).is_some_and(|b| b.contains(step))
    }

    /// Number of hits across every bar
    pub fn hit_count(&self) -> usize {
        self.bars.iter().map(Bar::hit_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.iter().all(Bar::is_empty)
    }
}
