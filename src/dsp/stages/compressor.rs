use crate::dsp::format::{CHANNELS, ProcessingFormat};
use crate::dsp::stages::Stage;
use crate::dsp::stages::common::{EnvelopeFollower, db_to_lin, lin_to_db};

/// Feed-forward peak compressor with one envelope follower per channel.
pub struct CompressorStage {
    attack_ms: f32,  // Attack time in milliseconds
    release_ms: f32, // Release time in milliseconds
    threshold: f32,  // Threshold in linear scale
    ratio: f32,      // Compression ratio (e.g., 2.5 for 2.5:1)
    envelopes: [EnvelopeFollower; CHANNELS],
    sample_rate: f32,
}

impl CompressorStage {
    pub fn new(threshold_db: f32, ratio: f32, attack_ms: f32, release_ms: f32) -> Self {
        Self {
            attack_ms,
            release_ms,
            threshold: db_to_lin(threshold_db),
            ratio,
            // Coefficients are meaningless until prepare() supplies a sample rate.
            envelopes: [EnvelopeFollower::new(0.0, 0.0); CHANNELS],
            sample_rate: 0.0,
        }
    }

    /// Gain the compressor would apply for the given envelope level.
    fn gain_for(&self, envelope: f32) -> f32 {
        if envelope < self.threshold {
            1.0
        } else {
            (envelope / self.threshold).powf(1.0 / self.ratio - 1.0)
        }
    }
}

impl Stage for CompressorStage {
    fn prepare(&mut self, format: &ProcessingFormat) {
        self.sample_rate = format.sample_rate() as f32;
        self.envelopes = [EnvelopeFollower::from_ms(
            self.attack_ms,
            self.release_ms,
            self.sample_rate,
        ); CHANNELS];
    }

    fn process(&mut self, channel: usize, input: f32) -> f32 {
        let Some(envelope) = self.envelopes.get_mut(channel) else {
            return input;
        };
        let env = envelope.process(input);

        input * self.gain_for(env)
    }

    fn reset(&mut self) {
        for env in &mut self.envelopes {
            env.reset();
        }
    }

    fn set_parameter(&mut self, name: &str, _value: f32) -> Result<(), &'static str> {
        match name {
            "threshold" | "ratio" | "attack" | "release" => Err("Compressor settings are fixed"),
            _ => Err("Unknown parameter"),
        }
    }

    fn get_parameter(&self, name: &str) -> Result<f32, &'static str> {
        match name {
            "threshold" => Ok(lin_to_db(self.threshold)),
            "ratio" => Ok(self.ratio),
            "attack" => Ok(self.attack_ms),
            "release" => Ok(self.release_ms),
            _ => Err("Unknown parameter"),
        }
    }
}
