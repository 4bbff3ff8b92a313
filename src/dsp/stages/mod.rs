pub mod common;
pub mod compressor;
pub mod filter;
pub mod level;
pub mod shaper;

use crate::dsp::format::ProcessingFormat;

// The core trait that all processing stages must implement
pub trait Stage: Send + 'static {
    // Recompute coefficients for a new format and clear internal state
    fn prepare(&mut self, format: &ProcessingFormat);

    // Process a single sample of one channel through this stage
    fn process(&mut self, channel: usize, input: f32) -> f32;

    // Process a block of channels in place
    fn process_block(&mut self, block: &mut [&mut [f32]]) {
        for (channel, samples) in block.iter_mut().enumerate() {
            for sample in samples.iter_mut() {
                *sample = self.process(channel, *sample);
            }
        }
    }

    // Clear filter history and envelopes, keeping coefficients
    fn reset(&mut self);

    // Set a parameter value by name
    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str>;

    // Get a parameter value by name
    fn get_parameter(&self, name: &str) -> Result<f32, &'static str>;
}
