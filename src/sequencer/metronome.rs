// Metronome - Audible cues for practice playback
// Bar accents, quarter ticks and hit blips, sounded through an owned output device

use crate::audio::engine::CpalClickOutput;
use crate::audio::output::{AudioError, ClickOutput};
use crate::messaging::command::{ClickCommand, ClickKind};
use crate::sequencer::transport::StepEvent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Position of a step as far as the metronome cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClickContext {
    pub is_bar_start: bool,
    pub is_quarter: bool,
}

impl From<&StepEvent> for ClickContext {
    fn from(event: &StepEvent) -> Self {
        Self {
            is_bar_start: event.is_bar_start(),
            is_quarter: event.is_quarter(),
        }
    }
}

/// Metronome
/// The output device is opened lazily by `ensure_started` and released by
/// `destroy` or on drop. `enabled` only gates ticks; the device stays open.
pub struct Metronome<O: ClickOutput = CpalClickOutput> {
    output: O,
    enabled: bool,
    volume: f32,
    started: bool,
    destroyed: bool,
    rng: StdRng,
}

impl<O: ClickOutput> Metronome<O> {
    /// Create new metronome
    pub fn new(output: O) -> Self {
        Self {
            output,
            enabled: true,
            volume: 0.7,
            started: false,
            destroyed: false,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fixed accent alternation, for reproducible runs
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Make sure the device can sound. Call after a user gesture and before
    /// the first tick; an error means audio stays silent for the session.
    pub fn ensure_started(&mut self) -> Result<(), AudioError> {
        if self.destroyed {
            return Err(AudioError::NotStarted);
        }

        self.output.open()?;
        if !self.started {
            tracing::debug!("metronome started");
        }
        self.started = true;
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Enable/disable ticks. Does not touch the device.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Set metronome volume (0.0 to 1.0)
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Click for one step. Silent when disabled or off the quarter grid.
    pub fn tick(&mut self, context: ClickContext) {
        if !self.enabled || !context.is_quarter {
            return;
        }

        let kind = if context.is_bar_start {
            // Two accent pitches for variety only
            if self.rng.gen_bool(0.5) {
                ClickKind::AccentHigh
            } else {
                ClickKind::AccentLow
            }
        } else {
            ClickKind::Tick
        };
        self.send(kind);
    }

    /// Hit acknowledgment. Sounds even when ticks are disabled.
    pub fn hit_blip(&mut self) {
        self.send(ClickKind::Blip);
    }

    fn send(&mut self, kind: ClickKind) {
        if !self.started || self.destroyed {
            return;
        }

        if let Err(err) = self.output.play(ClickCommand::new(kind, self.volume)) {
            tracing::debug!(%err, ?kind, "click dropped");
        }
    }

    /// Release the output device. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.output.close();
        self.started = false;
        self.destroyed = true;
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}

impl<O: ClickOutput> Drop for Metronome<O> {
    fn drop(&mut self) {
        self.destroy();
    }
}
