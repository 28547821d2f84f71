// Module audio - cpal backend for metronome cues

pub mod click;
pub mod device;
pub mod engine;
pub mod output;
pub mod status;
