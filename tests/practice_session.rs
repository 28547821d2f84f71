//! Practice session integration
//!
//! Wires a lesson through transport, timeline and metronome with a manual
//! clock and a recording output, and checks what the player sees and hears.

use drumschool::messaging::command::{ClickCommand, ClickKind};
use drumschool::messaging::notification::{NotificationCategory, NotificationLevel};
use drumschool::sequencer::timeline::Cell;
use drumschool::{
    AudioError, ClickOutput, LessonConfig, ManualClock, PracticeSession, SessionOptions,
    TransportEvent, normalize_lesson,
};
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct RecordingOutput {
    played: Rc<RefCell<Vec<ClickKind>>>,
    closed: Rc<RefCell<usize>>,
    open: bool,
    unavailable: bool,
}

impl ClickOutput for RecordingOutput {
    fn open(&mut self) -> Result<(), AudioError> {
        if self.unavailable {
            return Err(AudioError::NoDevice);
        }
        self.open = true;
        Ok(())
    }

    fn play(&mut self, command: ClickCommand) -> Result<(), AudioError> {
        if !self.open {
            return Err(AudioError::NotStarted);
        }
        self.played.borrow_mut().push(command.kind);
        Ok(())
    }

    fn close(&mut self) {
        *self.closed.borrow_mut() += 1;
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// 120 BPM, 8 steps, one bar, one bar of count-in: 250ms per step
fn lesson(ui: serde_json::Value) -> LessonConfig {
    normalize_lesson(&json!({
        "transport": { "bpm": 120, "stepsPerBar": 8, "bars": 1, "countInBars": 1 },
        "pattern": { "bars": [ { "hits": [0, 3] } ] },
        "ui": ui
    }))
}

fn cues(output: &RecordingOutput) -> String {
    output
        .played
        .borrow()
        .iter()
        .map(|kind| match kind {
            ClickKind::AccentHigh | ClickKind::AccentLow => 'A',
            ClickKind::Tick => 't',
            ClickKind::Blip => 'b',
        })
        .collect()
}

#[test]
fn test_full_pass_cues() {
    let clock = ManualClock::new(0.0);
    let output = RecordingOutput::default();
    let mut session = PracticeSession::new(
        &lesson(json!({ "loop": false })),
        clock.clone(),
        output.clone(),
        SessionOptions::default(),
    );

    session.start();
    clock.set(16.0 * 250.0);
    let events = session.pump();

    // Count-in quarters, then the bar with hits on steps 0 and 3
    assert_eq!(cues(&output), "AtttAbtbtt");
    assert_eq!(events.last(), Some(&TransportEvent::Completed));
    assert!(session.is_complete());
}

#[test]
fn test_playhead_follows_play_steps_only() {
    let clock = ManualClock::new(0.0);
    let mut session = PracticeSession::new(
        &lesson(json!({ "loop": false })),
        clock.clone(),
        RecordingOutput::default(),
        SessionOptions::default(),
    );

    session.start();
    clock.set(7.0 * 250.0);
    session.pump();
    assert_eq!(session.timeline().playhead(), None);

    clock.set(8.0 * 250.0);
    session.pump();
    assert_eq!(session.timeline().playhead(), Some(Cell { bar: 0, step: 0 }));
    assert!(session.timeline().is_pulsing(0, 0, 8.0 * 250.0));

    clock.set(11.0 * 250.0);
    session.pump();
    assert_eq!(session.timeline().playhead(), Some(Cell { bar: 0, step: 3 }));
    assert_eq!(session.render(), "o. .* .. ..");

    // Pulse fades, the playhead stays on the hit
    clock.advance(200.0);
    assert_eq!(session.render(), "o. .O .. ..");
}

#[test]
fn test_hidden_metronome_keeps_hit_blips() {
    let clock = ManualClock::new(0.0);
    let output = RecordingOutput::default();
    let mut session = PracticeSession::new(
        &lesson(json!({ "loop": false, "showMetronome": false })),
        clock.clone(),
        output.clone(),
        SessionOptions::default(),
    );

    session.start();
    clock.set(16.0 * 250.0);
    session.pump();

    assert_eq!(cues(&output), "bb");
}

#[test]
fn test_audio_failure_keeps_visuals_running() {
    let clock = ManualClock::new(0.0);
    let output = RecordingOutput {
        unavailable: true,
        ..RecordingOutput::default()
    };
    let mut session = PracticeSession::new(
        &lesson(json!({ "loop": false })),
        clock.clone(),
        output.clone(),
        SessionOptions::default(),
    );

    session.start();
    assert!(!session.is_audio_available());
    assert!(session.is_running());

    let notes = session.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].level, NotificationLevel::Warning);
    assert_eq!(notes[0].category, NotificationCategory::Audio);

    clock.set(9.0 * 250.0);
    session.pump();
    assert_eq!(session.timeline().playhead(), Some(Cell { bar: 0, step: 1 }));
    assert!(output.played.borrow().is_empty());
}

#[test]
fn test_looping_session_never_completes() {
    let clock = ManualClock::new(0.0);
    let mut session = PracticeSession::new(
        &lesson(json!({})),
        clock.clone(),
        RecordingOutput::default(),
        SessionOptions::default(),
    );

    session.start();
    for frame in 1..=300 {
        clock.set(frame as f64 * 16.0);
        session.pump();
    }
    assert!(session.is_running());
    assert!(!session.is_complete());

    // Turning loop off ends at the end of the current pass
    session.set_loop(false);
    clock.advance(8.0 * 250.0);
    session.pump();
    assert!(session.is_complete());
    assert_eq!(session.timeline().playhead(), None);
}

#[test]
fn test_stop_and_destroy() {
    let clock = ManualClock::new(0.0);
    let output = RecordingOutput::default();
    let mut session = PracticeSession::new(
        &lesson(json!({})),
        clock.clone(),
        output.clone(),
        SessionOptions::default(),
    );

    session.start();
    clock.set(10.0 * 250.0);
    session.pump();

    session.stop();
    session.stop();
    assert!(!session.is_running());
    assert_eq!(session.timeline().playhead(), None);
    clock.advance(5_000.0);
    assert!(session.pump().is_empty());

    session.destroy();
    session.destroy();
    drop(session);
    assert_eq!(*output.closed.borrow(), 1);
}
