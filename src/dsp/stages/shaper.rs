use crate::dsp::format::ProcessingFormat;
use crate::dsp::stages::Stage;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

/// Drive applied ahead of the transfer curve.
pub const DEFAULT_DRIVE: f32 = 1.6;

/// Transfer curves for the enhancement stage. Every curve is bounded to
/// `[-1, 1]`, odd-symmetric and monotonic, so any of them can stand in for
/// another without changing the surrounding contract.
#[derive(ValueEnum, Copy, Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ShaperCurve {
    #[default]
    Tanh, // Smooth saturation
    Arctan,   // Softer knee, slower approach to the rails
    HardClip, // Linear until the rails
}

impl std::fmt::Display for ShaperCurve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tanh => write!(f, "tanh"),
            Self::Arctan => write!(f, "arctan"),
            Self::HardClip => write!(f, "hard clip"),
        }
    }
}

impl ShaperCurve {
    #[inline]
    pub fn apply(self, driven: f32) -> f32 {
        match self {
            Self::Tanh => driven.tanh(),
            Self::Arctan => driven.atan() * (2.0 / PI),
            Self::HardClip => driven.clamp(-1.0, 1.0),
        }
    }
}

/// Stateless nonlinear shaping stage.
pub struct ShaperStage {
    curve: ShaperCurve,
    drive: f32,
}

impl ShaperStage {
    pub fn new(curve: ShaperCurve, drive: f32) -> Self {
        Self { curve, drive }
    }

    pub const fn curve(&self) -> ShaperCurve {
        self.curve
    }
}

impl Default for ShaperStage {
    fn default() -> Self {
        Self::new(ShaperCurve::default(), DEFAULT_DRIVE)
    }
}

impl Stage for ShaperStage {
    fn prepare(&mut self, _format: &ProcessingFormat) {}

    fn process(&mut self, _channel: usize, input: f32) -> f32 {
        self.curve.apply(input * self.drive)
    }

    fn reset(&mut self) {}

    fn set_parameter(&mut self, name: &str, _value: f32) -> Result<(), &'static str> {
        match name {
            "drive" => Err("Drive is fixed"),
            _ => Err("Unknown parameter"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "drive" => Ok(self.drive),
            _ => Err("Unknown parameter"),
        }
    }
}
