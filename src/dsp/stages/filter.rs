use crate::dsp::format::{CHANNELS, ProcessingFormat};
use crate::dsp::stages::Stage;
use crate::dsp::stages::common::flush_denormal;
use std::f64::consts::{FRAC_1_SQRT_2, PI};

/// Normalised biquad coefficients (`a0 == 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    const IDENTITY: Self = Self {
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
        a1: 0.0,
        a2: 0.0,
    };

    /// Second-order Butterworth high-pass via the bilinear transform.
    fn high_pass(cutoff: f64, sample_rate: f64) -> Self {
        let n = (PI * cutoff / sample_rate).tan();
        let n_squared = n * n;
        let inv_q = 1.0 / FRAC_1_SQRT_2;
        let c1 = 1.0 / (1.0 + inv_q * n + n_squared);

        Self {
            b0: c1 as f32,
            b1: (-2.0 * c1) as f32,
            b2: c1 as f32,
            a1: (2.0 * c1 * (n_squared - 1.0)) as f32,
            a2: (c1 * (1.0 - inv_q * n + n_squared)) as f32,
        }
    }
}

/// Transposed direct form II state for one channel.
#[derive(Debug, Clone, Copy, Default)]
struct ChannelState {
    s1: f32,
    s2: f32,
}

/// Safety high-pass filter, 12 dB/oct, one state per channel.
///
/// Until [`Stage::prepare`] is called the filter is an identity, so an
/// unprepared chain never produces garbage.
pub struct HighPassStage {
    cutoff: f32,
    coefficients: Coefficients,
    state: [ChannelState; CHANNELS],
    sample_rate: f64,
}

impl HighPassStage {
    /// Keeps the tangent in the bilinear transform away from zero.
    const MIN_CUTOFF_HZ: f32 = 1.0;
    /// Fraction of the sample rate the cutoff is clamped below.
    const MAX_CUTOFF_RATIO: f64 = 0.49;

    pub fn new(cutoff: f32) -> Self {
        Self {
            cutoff,
            coefficients: Coefficients::IDENTITY,
            state: [ChannelState::default(); CHANNELS],
            sample_rate: 0.0,
        }
    }

    pub const fn cutoff(&self) -> f32 {
        self.cutoff
    }

    pub const fn is_prepared(&self) -> bool {
        self.sample_rate > 0.0
    }

    fn update_coefficients(&mut self) {
        if !self.is_prepared() {
            return;
        }

        let cutoff = f64::from(self.cutoff.max(Self::MIN_CUTOFF_HZ))
            .min(self.sample_rate * Self::MAX_CUTOFF_RATIO);
        self.coefficients = Coefficients::high_pass(cutoff, self.sample_rate);
    }
}

impl Stage for HighPassStage {
    fn prepare(&mut self, format: &ProcessingFormat) {
        self.sample_rate = format.sample_rate();
        self.update_coefficients();
        self.reset();
    }

    fn process(&mut self, channel: usize, input: f32) -> f32 {
        let Some(state) = self.state.get_mut(channel) else {
            return input;
        };
        let c = &self.coefficients;

        let output = c.b0.mul_add(input, state.s1);
        state.s1 = flush_denormal(c.b1.mul_add(input, state.s2) - c.a1 * output);
        state.s2 = flush_denormal(c.b2 * input - c.a2 * output);
        output
    }

    fn reset(&mut self) {
        self.state = [ChannelState::default(); CHANNELS];
    }

    fn set_parameter(&mut self, name: &str, _value: f32) -> Result<(), &'static str> {
        match name {
            "cutoff" => Err("Safety high-pass cutoff is fixed"),
            _ => Err("Unknown parameter name"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "cutoff" => Ok(self.cutoff),
            _ => Err("Unknown parameter name"),
        }
    }
}
