// Click output - Seam between the metronome and an audio device

use crate::messaging::command::ClickCommand;

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("No audio output device found")]
    NoDevice,

    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    #[error("Audio configuration error: {0}")]
    Config(String),

    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Audio output not started")]
    NotStarted,

    #[error("Audio device lost")]
    DeviceLost,

    #[error("Click queue full")]
    QueueFull,
}

/// A device able to sound click commands.
///
/// `open` is called before the first cue after a user gesture. It creates the
/// device lazily and resumes it when it already exists, so it may be called
/// repeatedly. `close` releases the device and must be idempotent.
pub trait ClickOutput {
    fn open(&mut self) -> Result<(), AudioError>;
    fn play(&mut self, command: ClickCommand) -> Result<(), AudioError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

/// Output that accepts every command and makes no sound
#[derive(Debug, Default)]
pub struct NullOutput {
    open: bool,
}

impl ClickOutput for NullOutput {
    fn open(&mut self) -> Result<(), AudioError> {
        self.open = true;
        Ok(())
    }

    fn play(&mut self, _command: ClickCommand) -> Result<(), AudioError> {
        if self.open {
            Ok(())
        } else {
            Err(AudioError::NotStarted)
        }
    }

    fn close(&mut self) {
        self.open = false;
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

impl<O: ClickOutput + ?Sized> ClickOutput for Box<O> {
    fn open(&mut self) -> Result<(), AudioError> {
        (**self).open()
    }

    fn play(&mut self, command: ClickCommand) -> Result<(), AudioError> {
        (**self).play(command)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
