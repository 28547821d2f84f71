// Drumschool - Rhythm practice engine: library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod lesson;
pub mod messaging;
pub mod sequencer;
pub mod session;

// Re-export commonly used types for convenience
pub use audio::engine::CpalClickOutput;
pub use audio::output::{AudioError, ClickOutput, NullOutput};
pub use lesson::{LessonConfig, LessonError, UiFlags, load_lesson, normalize_lesson, parse_lesson};
pub use sequencer::{
    BpmChangePolicy, ClickContext, Clock, ManualClock, Metronome, Pattern, StepEvent, StepGrid,
    StepPhase, SystemClock, Timeline, Transport, TransportConfig, TransportEvent, TransportPhase,
};
pub use session::{PracticeSession, SessionOptions};
