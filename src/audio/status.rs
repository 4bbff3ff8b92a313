use arc_swap::ArcSwap;
use std::sync::Arc;

/// What the device was last configured with, for display.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    pub device_name: String,
    pub sample_rate: f64,
    pub buffer_size: usize,
}

impl std::fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} @ {} Hz / {} frames",
            self.device_name, self.sample_rate, self.buffer_size
        )
    }
}

/// Shared, lock-free slot holding the latest [`DeviceStatus`].
#[derive(Clone, Default)]
pub struct StatusCell {
    info: Arc<ArcSwap<DeviceStatus>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, status: DeviceStatus) {
        self.info.store(Arc::new(status));
    }

    pub fn get(&self) -> DeviceStatus {
        self.info.load().as_ref().clone()
    }
}
