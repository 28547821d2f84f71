// Practice session - Host composition of transport, timeline and metronome
// Owns the three components and forwards transport steps between them

use crate::audio::output::ClickOutput;
use crate::lesson::{LessonConfig, UiFlags};
use crate::messaging::notification::{Notification, NotificationCategory};
use crate::sequencer::clock::Clock;
use crate::sequencer::metronome::{ClickContext, Metronome};
use crate::sequencer::timeline::Timeline;
use crate::sequencer::transport::{BpmChangePolicy, StepPhase, Transport, TransportEvent};

/// Host-side options not carried by the lesson itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionOptions {
    pub bpm_policy: BpmChangePolicy,
    pub metronome_volume: f32,
    /// Blip and pulse on steps that carry a hit
    pub play_hits: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            bpm_policy: BpmChangePolicy::default(),
            metronome_volume: 0.7,
            play_hits: true,
        }
    }
}

/// One practice attempt on one lesson
pub struct PracticeSession<C: Clock, O: ClickOutput> {
    clock: C,
    transport: Transport,
    timeline: Timeline,
    metronome: Metronome<O>,
    ui: UiFlags,
    options: SessionOptions,
    audio_available: bool,
    completed: bool,
    notifications: Vec<Notification>,
}

impl<C: Clock, O: ClickOutput> PracticeSession<C, O> {
    pub fn new(lesson: &LessonConfig, clock: C, output: O, options: SessionOptions) -> Self {
        let transport = Transport::new(lesson.transport.clone()).with_bpm_policy(options.bpm_policy);
        let timeline = Timeline::new(lesson.pattern.clone()).with_show_notes(lesson.ui.show_notes);

        let mut metronome = Metronome::new(output);
        metronome.set_enabled(lesson.ui.show_metronome);
        metronome.set_volume(options.metronome_volume);

        Self {
            clock,
            transport,
            timeline,
            metronome,
            ui: lesson.ui,
            options,
            audio_available: true,
            completed: false,
            notifications: Vec::new(),
        }
    }

    /// User pressed start. Unlocks audio, then starts the transport and
    /// dispatches the first step. Audio failure only silences the session.
    pub fn start(&mut self) -> Vec<TransportEvent> {
        if self.transport.is_running() {
            return Vec::new();
        }

        if self.audio_available
            && let Err(err) = self.metronome.ensure_started()
        {
            tracing::warn!(%err, "metronome unavailable, continuing without audio");
            self.audio_available = false;
            self.notifications.push(Notification::warning(
                NotificationCategory::Audio,
                format!("Metronome disabled for this session: {err}"),
            ));
        }

        self.completed = false;
        self.timeline.reset_playhead();
        self.transport.start(self.clock.now_ms());
        self.pump()
    }

    /// Poll the transport and dispatch every elapsed step.
    /// Call once per host frame.
    pub fn pump(&mut self) -> Vec<TransportEvent> {
        let now_ms = self.clock.now_ms();
        self.timeline.expire_pulses(now_ms);

        let events = self.transport.poll(now_ms);
        for event in &events {
            match event {
                TransportEvent::Step(step) => {
                    // Playhead, then tick, then hit feedback
                    if step.phase == StepPhase::Play {
                        self.timeline.set_playhead(step.bar_index, step.step_index);
                    }

                    if self.audio_available {
                        self.metronome.tick(ClickContext::from(step));
                    }

                    if step.phase == StepPhase::Play
                        && self.options.play_hits
                        && self.timeline.is_hit(step.bar_index, step.step_index)
                    {
                        if self.audio_available {
                            self.metronome.hit_blip();
                        }
                        self.timeline
                            .pulse_step(step.bar_index, step.step_index, now_ms);
                    }
                }
                TransportEvent::Completed => {
                    self.timeline.reset_playhead();
                    self.completed = true;
                    self.notifications.push(Notification::info(
                        NotificationCategory::Transport,
                        "Lesson pass complete",
                    ));
                }
            }
        }

        events
    }

    pub fn stop(&mut self) {
        self.transport.stop();
        self.timeline.reset_playhead();
    }

    /// Change tempo, following the session's bpm policy
    pub fn set_bpm(&mut self, bpm: u32) {
        let now_ms = self.clock.now_ms();
        let before = self.transport.global_step_index();
        self.transport.set_bpm(bpm, now_ms);

        // A restarted run replays the count-in, which never moves the playhead
        if before.is_some() && self.transport.global_step_index().is_none() {
            self.timeline.reset_playhead();
        }
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.ui.loop_playback = enabled;
        self.transport.set_loop(enabled);
    }

    pub fn set_metronome_enabled(&mut self, enabled: bool) {
        self.ui.show_metronome = enabled;
        self.metronome.set_enabled(enabled);
    }

    pub fn is_running(&self) -> bool {
        self.transport.is_running()
    }

    /// A non-looping pass reached its end
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn is_audio_available(&self) -> bool {
        self.audio_available
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn metronome(&self) -> &Metronome<O> {
        &self.metronome
    }

    pub fn ui(&self) -> UiFlags {
        self.ui
    }

    /// Dot grid of the whole pattern at the current time
    pub fn render(&self) -> String {
        self.timeline.render(self.clock.now_ms())
    }

    /// Drain pending notifications
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Tear everything down. Safe to call repeatedly.
    pub fn destroy(&mut self) {
        self.transport.destroy();
        self.timeline.destroy();
        self.metronome.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::output::NullOutput;
    use crate::lesson::normalize_lesson;
    use crate::sequencer::clock::ManualClock;
    use crate::sequencer::timeline::Cell;
    use serde_json::json;

    fn session(clock: &ManualClock) -> PracticeSession<ManualClock, NullOutput> {
        let lesson = normalize_lesson(&json!({
            "transport": { "bpm": 120, "stepsPerBar": 4, "bars": 1, "countInBars": 0 },
            "pattern": { "bars": [ { "hits": [0, 2] } ] },
            "ui": { "loop": false }
        }));
        PracticeSession::new(&lesson, clock.clone(), NullOutput::default(), SessionOptions::default())
    }

    #[test]
    fn test_start_dispatches_first_step() {
        let clock = ManualClock::new(0.0);
        let mut session = session(&clock);

        let events = session.start();
        assert_eq!(events.len(), 1);
        assert_eq!(session.timeline().playhead(), Some(Cell { bar: 0, step: 0 }));
        assert!(session.timeline().is_pulsing(0, 0, 0.0));
        assert!(session.metronome().is_started());
    }

    #[test]
    fn test_completion_resets_playhead() {
        let clock = ManualClock::new(0.0);
        let mut session = session(&clock);
        session.start();

        clock.advance(4.0 * 500.0);
        let events = session.pump();
        assert_eq!(events.last(), Some(&TransportEvent::Completed));
        assert!(session.is_complete());
        assert!(!session.is_running());
        assert_eq!(session.timeline().playhead(), None);

        let notes = session.take_notifications();
        assert_eq!(notes.len(), 1);
        assert!(session.take_notifications().is_empty());
    }

    #[test]
    fn test_restart_policy_clears_playhead() {
        let clock = ManualClock::new(0.0);
        let lesson = normalize_lesson(&json!({
            "transport": { "bpm": 120, "stepsPerBar": 4, "bars": 2, "countInBars": 1 },
            "ui": { "loop": false }
        }));
        let options = SessionOptions {
            bpm_policy: BpmChangePolicy::Restart,
            ..SessionOptions::default()
        };
        let mut session =
            PracticeSession::new(&lesson, clock.clone(), NullOutput::default(), options);
        session.start();

        // Count-in (4 steps) then bar 1 step 1
        clock.set(9.0 * 500.0);
        session.pump();
        assert_eq!(session.timeline().playhead(), Some(Cell { bar: 1, step: 1 }));

        session.set_bpm(100);
        let events = session.pump();
        assert!(matches!(
            events.first(),
            Some(TransportEvent::Step(step)) if step.phase == StepPhase::CountIn
        ));
        assert_eq!(session.timeline().playhead(), None);
    }

    #[test]
    fn test_rescale_policy_keeps_playhead() {
        let clock = ManualClock::new(0.0);
        let mut session = session(&clock);
        session.start();

        clock.set(1.0 * 500.0);
        session.pump();
        session.set_bpm(100);
        assert_eq!(session.timeline().playhead(), Some(Cell { bar: 0, step: 1 }));
    }

    #[test]
    fn test_destroy_stops_everything() {
        let clock = ManualClock::new(0.0);
        let mut session = session(&clock);
        session.start();

        session.destroy();
        session.destroy();
        clock.advance(10_000.0);
        assert!(session.pump().is_empty());
        assert!(session.render().is_empty());
    }
}
