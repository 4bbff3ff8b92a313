/// Number of channels the chain is prepared for.
pub const CHANNELS: usize = 2;

/// Sample rate, block size and channel count negotiated with the device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessingFormat {
    sample_rate: f64,
    block_size: usize,
    channels: usize,
}

impl ProcessingFormat {
    /// Returns `None` for zero, negative or non-finite values, which would
    /// otherwise produce degenerate filter coefficients.
    pub fn new(sample_rate: f64, block_size: usize) -> Option<Self> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 || block_size == 0 {
            return None;
        }

        Some(Self {
            sample_rate,
            block_size,
            channels: CHANNELS,
        })
    }

    pub const fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub const fn block_size(&self) -> usize {
        self.block_size
    }

    pub const fn channels(&self) -> usize {
        self.channels
    }

    /// Time budget of one block in seconds.
    pub fn block_duration(&self) -> f64 {
        self.block_size as f64 / self.sample_rate
    }
}

impl std::fmt::Display for ProcessingFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} Hz, {} frames, {} channels",
            self.sample_rate, self.block_size, self.channels
        )
    }
}
