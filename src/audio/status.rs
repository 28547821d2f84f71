// Output device status, shared with the cpal error callback

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of the click output device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceStatus {
    #[default]
    Closed,
    Opening,
    Running,
    /// Reported by the stream error callback; the next open rebuilds the stream
    Failed,
}

impl DeviceStatus {
    fn to_byte(self) -> u8 {
        match self {
            DeviceStatus::Closed => 0,
            DeviceStatus::Opening => 1,
            DeviceStatus::Running => 2,
            DeviceStatus::Failed => 3,
        }
    }

    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => DeviceStatus::Opening,
            2 => DeviceStatus::Running,
            3 => DeviceStatus::Failed,
            _ => DeviceStatus::Closed,
        }
    }
}

/// Status cell written from the audio thread and read from the host
#[derive(Debug, Clone, Default)]
pub struct SharedDeviceStatus {
    byte: Arc<AtomicU8>,
}

impl SharedDeviceStatus {
    pub fn get(&self) -> DeviceStatus {
        DeviceStatus::from_byte(self.byte.load(Ordering::Acquire))
    }

    pub fn set(&self, status: DeviceStatus) {
        self.byte.store(status.to_byte(), Ordering::Release);
    }

    pub fn is_failed(&self) -> bool {
        self.get() == DeviceStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_shared_between_clones() {
        let status = SharedDeviceStatus::default();
        let callback_side = status.clone();

        assert_eq!(status.get(), DeviceStatus::Closed);
        callback_side.set(DeviceStatus::Failed);
        assert!(status.is_failed());
    }

    #[test]
    fn test_every_status_survives_the_cell() {
        let status = SharedDeviceStatus::default();
        for value in [
            DeviceStatus::Opening,
            DeviceStatus::Running,
            DeviceStatus::Failed,
            DeviceStatus::Closed,
        ] {
            status.set(value);
            assert_eq!(status.get(), value);
        }
        assert_eq!(DeviceStatus::from_byte(42), DeviceStatus::Closed);
    }
}
