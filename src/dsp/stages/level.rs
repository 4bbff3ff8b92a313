use crate::dsp::format::ProcessingFormat;
use crate::dsp::stages::Stage;
use crate::dsp::stages::common::db_to_lin;

/// Lowest trim the control plane can request.
pub const MIN_GAIN_DB: f32 = -24.0;
/// Highest trim the control plane can request.
pub const MAX_GAIN_DB: f32 = 24.0;

/// Trim gain in decibels. The gain is constant across a block; callers
/// change it between blocks.
pub struct LevelStage {
    gain_db: f32,
    gain: f32,
}

impl LevelStage {
    pub fn new(gain_db: f32) -> Self {
        Self {
            gain_db,
            gain: db_to_lin(gain_db),
        }
    }

    pub const fn gain_db(&self) -> f32 {
        self.gain_db
    }

    /// Updates the working gain; a no-op when the value is unchanged.
    pub fn set_gain_db(&mut self, gain_db: f32) {
        if gain_db != self.gain_db {
            self.gain_db = gain_db;
            self.gain = db_to_lin(gain_db);
        }
    }
}

impl Stage for LevelStage {
    fn prepare(&mut self, _format: &ProcessingFormat) {}

    fn process(&mut self, _channel: usize, input: f32) -> f32 {
        input * self.gain
    }

    fn process_block(&mut self, block: &mut [&mut [f32]]) {
        let gain = self.gain;
        for samples in block.iter_mut() {
            for sample in samples.iter_mut() {
                *sample *= gain;
            }
        }
    }

    fn reset(&mut self) {}

    fn set_parameter(&mut self, name: &str, value: f32) -> Result<(), &'static str> {
        match name {
            "gain" => {
                if (MIN_GAIN_DB..=MAX_GAIN_DB).contains(&value) {
                    self.set_gain_db(value);
                    Ok(())
                } else {
                    Err("Gain must be between -24 dB and 24 dB")
                }
            }
            _ => Err("Unknown parameter"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "gain" => Ok(self.gain_db),
            _ => Err("Unknown parameter name"),
        }
    }
}
