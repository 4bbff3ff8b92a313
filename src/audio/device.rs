use anyhow::Result;

use crate::audio::processor::Processor;

/// Callbacks a device binding drives. The binding guarantees that
/// `on_format_change` runs before the first `on_process_block` for a format,
/// and that none of these run concurrently with each other.
pub trait AudioCallback: Send {
    /// The device is about to start or its format changed. Invalid values
    /// leave the previous configuration in place.
    fn on_format_change(&mut self, sample_rate: f64, block_size: usize);

    /// One block on the real-time thread. Must not allocate, lock or block.
    fn on_process_block(&mut self, input: &[&[f32]], output: &mut [&mut [f32]], num_samples: usize);

    /// The device halted; clear any state that would leak into the next start.
    fn on_stopped(&mut self);
}

/// Connection to an audio server that can host a [`Processor`]. Bindings
/// move with the engine to whichever thread controls it.
pub trait DeviceBinding: Send {
    fn device_name(&self) -> &str;

    /// Sample rate and block size as currently reported by the device.
    fn current_format(&self) -> (f64, usize);

    /// Hands the processor to the device's real-time thread.
    fn register(&mut self, processor: Processor) -> Result<()>;

    /// Takes the processor back. `None` when nothing was registered or the
    /// device could not give it back.
    fn unregister(&mut self) -> Option<Processor>;

    fn is_registered(&self) -> bool;
}
