// Transport - Step clock for lesson playback
// Converts elapsed wall-clock time into discrete musical steps

use super::pattern::StepGrid;
use serde::Serialize;

/// Runtime safety clamp for tempo changes
pub const MIN_BPM: u32 = 30;
pub const MAX_BPM: u32 = 260;

/// Absorbs float error when a timestamp lands exactly on a step boundary
const STEP_EPSILON: f64 = 1e-6;

/// Duration of one grid step in milliseconds
pub fn step_duration_ms(bpm: u32, beats_per_bar: u32, steps_per_bar: u32) -> f64 {
    let bpm = bpm.max(1) as f64;
    let bar_ms = 60_000.0 / bpm * beats_per_bar.max(1) as f64;
    bar_ms / steps_per_bar.max(1) as f64
}

/// Transport phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportPhase {
    #[default]
    Idle,
    CountIn,
    Playing,
    Done,
}

impl TransportPhase {
    /// Check if the transport is emitting steps (CountIn or Playing)
    pub fn is_running(&self) -> bool {
        matches!(self, TransportPhase::CountIn | TransportPhase::Playing)
    }
}

/// Phase carried by each step event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepPhase {
    #[serde(rename = "countin")]
    CountIn,
    #[serde(rename = "play")]
    Play,
}

/// One logical step of playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepEvent {
    pub bar_index: u32,
    pub step_index: u32,
    /// Steps since `start`, count-in included. Never resets on loop.
    pub global_step_index: u64,
    pub steps_per_bar: u32,
    pub beats_per_bar: u32,
    pub phase: StepPhase,
    /// Loop pass (0 for the first pass and for count-in)
    #[serde(skip)]
    pub pass: u32,
}

impl StepEvent {
    /// Quarter-note pulse on 4, 8 and 16 step grids
    pub fn is_quarter(&self) -> bool {
        let stride = (self.steps_per_bar / 4).max(1);
        self.step_index % stride == 0
    }

    pub fn is_bar_start(&self) -> bool {
        self.step_index == 0
    }
}

/// Output of a transport poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    Step(StepEvent),
    /// Last pattern step has elapsed on a non-looping run
    Completed,
}

/// What a tempo change does to a running transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BpmChangePolicy {
    /// Keep the current position and rescale the remaining time
    #[default]
    Rescale,
    /// Restart playback from the first step
    Restart,
}

/// Tempo, meter and length of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub bpm: u32,
    pub grid: StepGrid,
    pub beats_per_bar: u32,
    pub bars: u32,
    pub count_in_bars: u32,
    pub loop_playback: bool,
}

impl TransportConfig {
    pub fn steps_per_bar(&self) -> u32 {
        self.grid.steps()
    }

    pub fn step_duration_ms(&self) -> f64 {
        step_duration_ms(self.bpm, self.beats_per_bar, self.steps_per_bar())
    }

    pub fn count_in_steps(&self) -> u64 {
        self.count_in_bars as u64 * self.steps_per_bar() as u64
    }

    /// Steps in one pass through the pattern
    pub fn pattern_steps(&self) -> u64 {
        self.bars.max(1) as u64 * self.steps_per_bar() as u64
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            bpm: 90,
            grid: StepGrid::default(),
            beats_per_bar: 4,
            bars: 1,
            count_in_bars: 0,
            loop_playback: false,
        }
    }
}

/// Transport controller
/// Emits exactly one event per logical step, derived from elapsed time
/// rather than from how often it is polled.
#[derive(Debug, Clone)]
pub struct Transport {
    config: TransportConfig,
    policy: BpmChangePolicy,
    step_duration_ms: f64,
    phase: TransportPhase,
    origin_ms: f64,
    next_step: u64,
    pass: u32,
    last_event: Option<StepEvent>,
    destroyed: bool,
}

impl Transport {
    /// Create a new transport
    pub fn new(mut config: TransportConfig) -> Self {
        config.bpm = config.bpm.clamp(MIN_BPM, MAX_BPM);
        config.bars = config.bars.max(1);
        config.beats_per_bar = config.beats_per_bar.max(1);

        Self {
            step_duration_ms: config.step_duration_ms(),
            config,
            policy: BpmChangePolicy::default(),
            phase: TransportPhase::Idle,
            origin_ms: 0.0,
            next_step: 0,
            pass: 0,
            last_event: None,
            destroyed: false,
        }
    }

    /// Set how tempo changes affect a running transport
    pub fn with_bpm_policy(mut self, policy: BpmChangePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    pub fn phase(&self) -> TransportPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase.is_running()
    }

    pub fn bpm(&self) -> u32 {
        self.config.bpm
    }

    pub fn step_duration_ms(&self) -> f64 {
        self.step_duration_ms
    }

    /// Global index of the last emitted step
    pub fn global_step_index(&self) -> Option<u64> {
        self.last_event.map(|event| event.global_step_index)
    }

    /// Bar of the last played step (None during count-in)
    pub fn current_bar_index(&self) -> Option<u32> {
        self.last_play_event().map(|event| event.bar_index)
    }

    /// Step of the last played step (None during count-in)
    pub fn current_step_index(&self) -> Option<u32> {
        self.last_play_event().map(|event| event.step_index)
    }

    fn last_play_event(&self) -> Option<StepEvent> {
        self.last_event.filter(|event| event.phase == StepPhase::Play)
    }

    /// Start playback at `now_ms`. No-op while already running.
    pub fn start(&mut self, now_ms: f64) {
        if self.destroyed || self.phase.is_running() {
            return;
        }

        self.reset_counters();
        self.origin_ms = now_ms;
        self.phase = if self.config.count_in_bars > 0 {
            TransportPhase::CountIn
        } else {
            TransportPhase::Playing
        };

        tracing::debug!(
            bpm = self.config.bpm,
            steps_per_bar = self.config.steps_per_bar(),
            bars = self.config.bars,
            count_in_bars = self.config.count_in_bars,
            "transport started"
        );
    }

    /// Stop playback and reset counters. Safe from any phase.
    pub fn stop(&mut self) {
        if self.phase.is_running() {
            tracing::debug!(last_step = ?self.global_step_index(), "transport stopped");
        }
        self.phase = TransportPhase::Idle;
        self.reset_counters();
    }

    /// Stop and refuse any further start
    pub fn destroy(&mut self) {
        self.stop();
        self.destroyed = true;
    }

    /// Enable/disable looping. Turning it off mid-run ends at the
    /// end of the current pass.
    pub fn set_loop(&mut self, enabled: bool) {
        self.config.loop_playback = enabled;
    }

    /// Change tempo. A running transport follows the configured policy.
    pub fn set_bpm(&mut self, bpm: u32, now_ms: f64) {
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        if bpm == self.config.bpm {
            return;
        }

        let previous_duration = self.step_duration_ms;
        self.config.bpm = bpm;
        self.step_duration_ms = self.config.step_duration_ms();

        if !self.phase.is_running() {
            return;
        }

        match self.policy {
            BpmChangePolicy::Rescale => {
                // Fractional position in steps is invariant across the change
                let position = (now_ms - self.origin_ms).max(0.0) / previous_duration;
                self.origin_ms = now_ms - position * self.step_duration_ms;
            }
            BpmChangePolicy::Restart => {
                self.stop();
                self.start(now_ms);
            }
        }

        tracing::debug!(bpm, policy = ?self.policy, "tempo changed");
    }

    /// Emit every step that has elapsed up to `now_ms`, in ascending order.
    /// A late poll catches up in one batch.
    pub fn poll(&mut self, now_ms: f64) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        if !self.phase.is_running() {
            return events;
        }

        let elapsed = (now_ms - self.origin_ms).max(0.0);
        let reached = (elapsed / self.step_duration_ms + STEP_EPSILON).floor() as u64;

        while self.next_step <= reached {
            match self.locate(self.next_step) {
                Some(event) => {
                    self.phase = match event.phase {
                        StepPhase::CountIn => TransportPhase::CountIn,
                        StepPhase::Play => TransportPhase::Playing,
                    };
                    self.pass = event.pass;
                    self.last_event = Some(event);
                    self.next_step += 1;
                    events.push(TransportEvent::Step(event));
                }
                None => {
                    tracing::debug!(steps = self.next_step, "transport completed");
                    self.reset_counters();
                    self.phase = TransportPhase::Done;
                    events.push(TransportEvent::Completed);
                    break;
                }
            }
        }

        events
    }

    /// Map an absolute step number to its event, or None once a
    /// non-looping run is over.
    fn locate(&self, absolute: u64) -> Option<StepEvent> {
        let steps_per_bar = self.config.steps_per_bar() as u64;
        let count_in = self.config.count_in_steps();

        if absolute < count_in {
            return Some(self.event(
                absolute / steps_per_bar,
                absolute % steps_per_bar,
                absolute,
                StepPhase::CountIn,
                0,
            ));
        }

        let position = absolute - count_in;
        let total = self.config.pattern_steps();
        let pass = position / total;

        if !self.config.loop_playback && pass > self.pass as u64 {
            return None;
        }

        let within = position % total;
        Some(self.event(
            within / steps_per_bar,
            within % steps_per_bar,
            absolute,
            StepPhase::Play,
            pass as u32,
        ))
    }

    fn event(&self, bar: u64, step: u64, global: u64, phase: StepPhase, pass: u32) -> StepEvent {
        StepEvent {
            bar_index: bar as u32,
            step_index: step as u32,
            global_step_index: global,
            steps_per_bar: self.config.steps_per_bar(),
            beats_per_bar: self.config.beats_per_bar,
            phase,
            pass,
        }
    }

    fn reset_counters(&mut self) {
        self.next_step = 0;
        self.pass = 0;
        self.last_event = None;
    }
}
