// Click synthesis - Pre-rendered metronome cues and a small voice mixer
// Runs inside the audio callback: no allocation after construction

use crate::messaging::command::{ClickCommand, ClickKind};
use std::f32::consts::PI;

/// Maximum overlapping cues (accent + blip on the same step, plus tails)
const MAX_VOICES: usize = 4;

/// Pitch, level and length of one cue
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickVoicing {
    pub frequency: f32,
    pub amplitude: f32,
    pub duration_ms: f32,
    /// Exponential decay rate over the cue length
    pub decay: f32,
}

impl ClickKind {
    /// Accents are louder and longer than the quarter tick
    pub fn voicing(self) -> ClickVoicing {
        match self {
            ClickKind::AccentHigh => ClickVoicing {
                frequency: 1500.0,
                amplitude: 0.8,
                duration_ms: 60.0,
                decay: 6.0,
            },
            ClickKind::AccentLow => ClickVoicing {
                frequency: 1200.0,
                amplitude: 0.8,
                duration_ms: 60.0,
                decay: 6.0,
            },
            ClickKind::Tick => ClickVoicing {
                frequency: 800.0,
                amplitude: 0.4,
                duration_ms: 30.0,
                decay: 8.0,
            },
            ClickKind::Blip => ClickVoicing {
                frequency: 660.0,
                amplitude: 0.5,
                duration_ms: 45.0,
                decay: 7.0,
            },
        }
    }
}

/// Pre-rendered cue buffers for one sample rate
#[derive(Debug, Clone)]
pub struct ClickBank {
    accent_high: Vec<f32>,
    accent_low: Vec<f32>,
    tick: Vec<f32>,
    blip: Vec<f32>,
}

impl ClickBank {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            accent_high: Self::render(sample_rate, ClickKind::AccentHigh.voicing()),
            accent_low: Self::render(sample_rate, ClickKind::AccentLow.voicing()),
            tick: Self::render(sample_rate, ClickKind::Tick.voicing()),
            blip: Self::render(sample_rate, ClickKind::Blip.voicing()),
        }
    }

    /// Sine oscillator through an exponential decay envelope
    fn render(sample_rate: f32, voicing: ClickVoicing) -> Vec<f32> {
        let num_samples = ((voicing.duration_ms / 1000.0) * sample_rate) as usize;
        let phase_increment = 2.0 * PI * voicing.frequency / sample_rate;

        (0..num_samples)
            .map(|i| {
                let t = i as f32 / num_samples as f32;
                let envelope = (-t * voicing.decay).exp();
                (i as f32 * phase_increment).sin() * envelope * voicing.amplitude
            })
            .collect()
    }

    pub fn get(&self, kind: ClickKind) -> &[f32] {
        match kind {
            ClickKind::AccentHigh => &self.accent_high,
            ClickKind::AccentLow => &self.accent_low,
            ClickKind::Tick => &self.tick,
            ClickKind::Blip => &self.blip,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ClickPlayback {
    kind: ClickKind,
    gain: f32,
    position: usize,
}

/// Mixes triggered cues into a mono stream
#[derive(Debug, Clone)]
pub struct ClickRenderer {
    bank: ClickBank,
    voices: [Option<ClickPlayback>; MAX_VOICES],
}

impl ClickRenderer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            bank: ClickBank::new(sample_rate),
            voices: [None; MAX_VOICES],
        }
    }

    /// Start a cue. When every voice is busy the oldest one is replaced.
    pub fn trigger(&mut self, command: ClickCommand) {
        let playback = ClickPlayback {
            kind: command.kind,
            gain: command.gain,
            position: 0,
        };

        let slot = match self.voices.iter().position(Option::is_none) {
            Some(free) => free,
            None => self
                .voices
                .iter()
                .enumerate()
                .max_by_key(|(_, v)| v.map_or(0, |p| p.position))
                .map_or(0, |(index, _)| index),
        };
        self.voices[slot] = Some(playback);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }

    pub fn next_sample(&mut self) -> f32 {
        let mut mix = 0.0f32;
        for voice in self.voices.iter_mut() {
            if let Some(playback) = voice {
                let samples = self.bank.get(playback.kind);
                if playback.position < samples.len() {
                    mix += samples[playback.position] * playback.gain;
                    playback.position += 1;
                } else {
                    *voice = None;
                }
            }
        }

        // Anti-denormals, then soft saturation when cues overlap
        if mix.abs() < 1e-15 { 0.0 } else { mix.tanh() }
    }

    pub fn process_buffer(&mut self, output: &mut [f32]) {
        for sample in output.iter_mut() {
            *sample = self.next_sample();
        }
    }

    pub fn reset(&mut self) {
        self.voices = [None; MAX_VOICES];
    }
}
