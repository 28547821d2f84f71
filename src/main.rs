use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use drumschool::audio::device::AudioDeviceManager;
use drumschool::lesson::normalize::COUNT_IN_RANGE;
use drumschool::lesson::{LessonConfig, clamp_bpm, load_lesson, parse_lesson};
use drumschool::{
    CpalClickOutput, PracticeSession, SessionOptions, StepEvent, StepPhase, SystemClock,
    TransportEvent,
};
use tracing_subscriber::EnvFilter;

/// Played when no lesson file is given
const BUILTIN_LESSON: &str = r#"{
    "title": "Backbeat",
    "transport": { "bpm": 90, "bars": 2, "stepsPerBar": 8, "timeSig": "4/4", "countInBars": 1 },
    "pattern": { "bars": [ { "hits": [0, 2, 4, 6] }, { "hits": [0, 2, 4, 5, 6] } ] },
    "ui": { "loop": false }
}"#;

#[derive(Parser)]
#[command(author, version, about = "Terminal rhythm practice with count-in, playhead and metronome")]
struct Cli {
    /// Lesson definition (JSON). A built-in backbeat is used when omitted.
    #[arg(long)]
    lesson: Option<PathBuf>,
    /// Override the lesson tempo.
    #[arg(long)]
    bpm: Option<u32>,
    /// Override the number of count-in bars.
    #[arg(long)]
    count_in: Option<u32>,
    /// Loop the pattern.
    #[arg(long = "loop", conflicts_with = "no_loop")]
    loop_playback: bool,
    /// Play the pattern once.
    #[arg(long)]
    no_loop: bool,
    /// Stop after this many passes when looping.
    #[arg(long)]
    passes: Option<u32>,
    /// Silence metronome ticks (hit blips still sound).
    #[arg(long)]
    mute: bool,
    /// Output device name (see --list-devices).
    #[arg(long)]
    device: Option<String>,
    /// Host frame interval in milliseconds.
    #[arg(long, default_value_t = 16)]
    frame_ms: u64,
    /// List audio output devices and exit.
    #[arg(long)]
    list_devices: bool,
}

fn apply_overrides(lesson: &mut LessonConfig, cli: &Cli) {
    if let Some(bpm) = cli.bpm {
        lesson.transport.bpm = clamp_bpm(bpm);
    }
    if let Some(count_in) = cli.count_in {
        lesson.transport.count_in_bars = count_in.min(*COUNT_IN_RANGE.end());
    }
    if cli.loop_playback || cli.no_loop {
        lesson.ui.loop_playback = cli.loop_playback;
        lesson.transport.loop_playback = cli.loop_playback;
    }
    if cli.mute {
        lesson.ui.show_metronome = false;
    }
}

fn print_step(session: &PracticeSession<SystemClock, CpalClickOutput>, step: &StepEvent) {
    match step.phase {
        StepPhase::CountIn => {
            if step.is_quarter() {
                let beat = step.step_index / (step.steps_per_bar / 4).max(1) + 1;
                println!("count-in  {beat}");
            }
        }
        StepPhase::Play => {
            println!(
                "bar {} step {:>2}   {}",
                step.bar_index + 1,
                step.step_index + 1,
                session.render()
            );
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let cli = Cli::parse();

    if cli.list_devices {
        let devices = AudioDeviceManager::new().list_output_devices();
        if devices.is_empty() {
            println!("No audio output devices reported by the system.");
        }
        for device in devices {
            let marker = if device.is_default { " (default)" } else { "" };
            println!("{}{}", device.name, marker);
        }
        return Ok(());
    }

    let mut lesson = match &cli.lesson {
        Some(path) => load_lesson(path)
            .with_context(|| format!("failed to read lesson file {}", path.display()))?,
        None => parse_lesson(BUILTIN_LESSON),
    };
    apply_overrides(&mut lesson, &cli);

    let output = match &cli.device {
        Some(name) => CpalClickOutput::with_device(name.clone()),
        None => CpalClickOutput::new(),
    };

    println!(
        "{} | {} BPM | {} | {} bars of {} | count-in {}",
        lesson.title.as_deref().unwrap_or("Untitled lesson"),
        lesson.transport.bpm,
        lesson.time_signature,
        lesson.transport.bars,
        lesson.transport.grid,
        lesson.transport.count_in_bars,
    );

    let mut session =
        PracticeSession::new(&lesson, SystemClock::new(), output, SessionOptions::default());
    let frame = Duration::from_millis(cli.frame_ms.max(1));

    let mut events = session.start();
    for notification in session.take_notifications() {
        if notification.is_degraded() {
            eprintln!("{notification}");
        } else {
            println!("{notification}");
        }
    }

    'practice: loop {
        for event in &events {
            if let TransportEvent::Step(step) = event {
                if cli.passes.is_some_and(|passes| step.pass >= passes) {
                    session.stop();
                    break 'practice;
                }
                print_step(&session, step);
            }
        }

        if session.is_complete() || !session.is_running() {
            break;
        }

        std::thread::sleep(frame);
        events = session.pump();
    }

    if session.is_complete() {
        println!("Done!");
    }
    session.destroy();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overridden(args: &[&str]) -> LessonConfig {
        let cli = Cli::parse_from(std::iter::once("drumschool").chain(args.iter().copied()));
        let mut lesson = parse_lesson(BUILTIN_LESSON);
        apply_overrides(&mut lesson, &cli);
        lesson
    }

    #[test]
    fn test_overrides_follow_lesson_ranges() {
        let lesson = overridden(&["--count-in", "9", "--bpm", "500"]);
        assert_eq!(lesson.transport.count_in_bars, *COUNT_IN_RANGE.end());
        assert_eq!(lesson.transport.bpm, 220);

        let lesson = overridden(&["--count-in", "0"]);
        assert_eq!(lesson.transport.count_in_bars, 0);
    }

    #[test]
    fn test_loop_and_mute_flags() {
        let lesson = overridden(&["--loop", "--mute"]);
        assert!(lesson.transport.loop_playback);
        assert!(!lesson.ui.show_metronome);

        // Without a flag the lesson decides
        assert!(!overridden(&[]).transport.loop_playback);
    }
}
