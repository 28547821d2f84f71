// Sequencer module
// Step clock, pattern grid, playhead and metronome for rhythm practice

pub mod clock;
pub mod metronome;
pub mod pattern;
pub mod timeline;
pub mod transport;

pub use clock::{Clock, ManualClock, SystemClock};
pub use metronome::{ClickContext, Metronome};
pub use pattern::{Bar, Pattern, StepGrid};
pub use timeline::{Cell, CellState, Timeline};
pub use transport::{
    BpmChangePolicy, StepEvent, StepPhase, Transport, TransportConfig, TransportEvent,
    TransportPhase,
};
