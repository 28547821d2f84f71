// Click engine - cpal output stream for metronome cues
//
// # Format Support
//
// The stream is built for the device's preferred sample format (F32, I16 or
// U16). Cues are rendered in f32 and converted per frame through cpal's
// `FromSample<f32>`, without allocation in the callback.
//
// # Stream Limitations
//
// On macOS (CoreAudio) the Stream is not Send/Sync, so the engine stays on
// the host thread. The error callback only flags the shared status; the next
// `open` rebuilds the stream.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use ringbuf::traits::{Consumer, Producer};

use crate::audio::click::ClickRenderer;
use crate::audio::device::AudioDeviceManager;
use crate::audio::output::{AudioError, ClickOutput};
use crate::audio::status::{DeviceStatus, SharedDeviceStatus};
use crate::messaging::channels::{ClickConsumer, ClickProducer, create_click_channel};
use crate::messaging::command::ClickCommand;

/// Click commands buffered between two callbacks
pub const CLICK_QUEUE_CAPACITY: usize = 64;

/// Metronome output on a real audio device.
/// Nothing touches the device until the first `open`.
pub struct CpalClickOutput {
    device_name: Option<String>,
    stream: Option<Stream>,
    producer: Option<ClickProducer>,
    sample_rate: Option<f32>,
    status: SharedDeviceStatus,
}

impl CpalClickOutput {
    /// Use the host's default output device
    pub fn new() -> Self {
        Self {
            device_name: None,
            stream: None,
            producer: None,
            sample_rate: None,
            status: SharedDeviceStatus::default(),
        }
    }

    /// Use a named output device
    pub fn with_device(device_name: impl Into<String>) -> Self {
        let mut output = Self::new();
        output.device_name = Some(device_name.into());
        output
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    /// Sample rate of the open stream
    pub fn sample_rate(&self) -> Option<f32> {
        self.sample_rate
    }

    fn resolve_device(&self) -> Result<Device, AudioError> {
        let manager = AudioDeviceManager::new();
        match &self.device_name {
            Some(name) => manager
                .output_device_by_name(name)
                .ok_or_else(|| AudioError::DeviceNotFound(name.clone())),
            None => manager.default_output_device().ok_or(AudioError::NoDevice),
        }
    }

    fn build(&mut self) -> Result<(), AudioError> {
        self.status.set(DeviceStatus::Opening);

        let device = self.resolve_device()?;
        let supported_config = device
            .default_output_config()
            .map_err(|e| AudioError::Config(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let sample_rate = supported_config.sample_rate().0 as f32;
        let channels = supported_config.channels() as usize;
        let config: StreamConfig = supported_config.into();

        let (producer, consumer) = create_click_channel(CLICK_QUEUE_CAPACITY);
        let renderer = ClickRenderer::new(sample_rate);
        let status = self.status.clone();

        let stream = match sample_format {
            SampleFormat::F32 => {
                Self::build_stream::<f32>(&device, &config, channels, consumer, renderer, status)
            }
            SampleFormat::I16 => {
                Self::build_stream::<i16>(&device, &config, channels, consumer, renderer, status)
            }
            SampleFormat::U16 => {
                Self::build_stream::<u16>(&device, &config, channels, consumer, renderer, status)
            }
            other => return Err(AudioError::UnsupportedFormat(format!("{other:?}"))),
        }?;

        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "Unknown".to_string()),
            sample_rate,
            channels,
            format = ?sample_format,
            "click output opened"
        );

        self.stream = Some(stream);
        self.producer = Some(producer);
        self.sample_rate = Some(sample_rate);
        Ok(())
    }

    /// Build the output stream for one sample type.
    /// Cues are mixed in f32 and written to every channel of the frame.
    fn build_stream<T>(
        device: &Device,
        config: &StreamConfig,
        channels: usize,
        mut consumer: ClickConsumer,
        mut renderer: ClickRenderer,
        status: SharedDeviceStatus,
    ) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32> + Send + 'static,
    {
        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    // No allocations, no I/O, no blocking locks
                    while let Some(command) = consumer.try_pop() {
                        renderer.trigger(command);
                    }

                    for frame in data.chunks_mut(channels) {
                        let value = T::from_sample(renderer.next_sample());
                        for sample in frame.iter_mut() {
                            *sample = value;
                        }
                    }
                },
                move |err| {
                    tracing::error!(%err, "click stream error");
                    status.set(DeviceStatus::Failed);
                },
                None,
            )
            .map_err(|e| AudioError::Stream(e.to_string()))
    }
}

impl Default for CpalClickOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickOutput for CpalClickOutput {
    fn open(&mut self) -> Result<(), AudioError> {
        // A stream flagged by the error callback is rebuilt from scratch
        if self.status.is_failed() {
            self.close();
        }

        if self.stream.is_none()
            && let Err(err) = self.build()
        {
            self.status.set(DeviceStatus::Failed);
            return Err(err);
        }

        if let Some(stream) = &self.stream {
            stream
                .play()
                .map_err(|e| AudioError::Stream(e.to_string()))?;
        }

        self.status.set(DeviceStatus::Running);
        Ok(())
    }

    fn play(&mut self, command: ClickCommand) -> Result<(), AudioError> {
        if self.status.is_failed() {
            return Err(AudioError::DeviceLost);
        }

        let producer = self.producer.as_mut().ok_or(AudioError::NotStarted)?;
        producer
            .try_push(command)
            .map_err(|_| AudioError::QueueFull)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                tracing::debug!(%err, "pause before close failed");
            }
            tracing::debug!("click output closed");
        }
        self.producer = None;
        self.sample_rate = None;
        self.status.set(DeviceStatus::Closed);
    }

    fn is_open(&self) -> bool {
        self.stream.is_some() && self.status.get() == DeviceStatus::Running
    }
}

impl Drop for CpalClickOutput {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messaging::command::ClickKind;

    // No device is touched before `open`, so these run on headless machines

    #[test]
    fn test_new_output_is_closed() {
        let output = CpalClickOutput::new();

        assert_eq!(output.status(), DeviceStatus::Closed);
        assert!(!output.is_open());
        assert!(output.sample_rate().is_none());
    }

    #[test]
    fn test_play_before_open() {
        let mut output = CpalClickOutput::with_device("missing");
        let result = output.play(ClickCommand::new(ClickKind::Tick, 1.0));
        assert!(matches!(result, Err(AudioError::NotStarted)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut output = CpalClickOutput::new();
        output.close();
        output.close();
        assert_eq!(output.status(), DeviceStatus::Closed);
    }
}
