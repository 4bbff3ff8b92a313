/// Gains at or below this level are treated as silence.
pub const MINUS_INFINITY_DB: f32 = -100.0;

/// Shortest time constant accepted by [`calculate_coefficient`].
const MIN_TIME_MS: f32 = 0.01;

/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: f32) -> f32 {
    if db > MINUS_INFINITY_DB {
        10f32.powf(db / 20.0)
    } else {
        0.0
    }
}

/// Convert linear amplitude to decibels, floored at [`MINUS_INFINITY_DB`].
#[inline]
pub fn lin_to_db(gain: f32) -> f32 {
    if gain > 0.0 {
        (20.0 * gain.log10()).max(MINUS_INFINITY_DB)
    } else {
        MINUS_INFINITY_DB
    }
}

/// Calculate a one-pole smoothing coefficient from a time constant in milliseconds.
///
/// Returns `exp(-1 / (sample_rate * time_ms * 0.001))`.
#[inline]
pub fn calculate_coefficient(time_ms: f32, sample_rate: f32) -> f32 {
    (-1.0 / (sample_rate * 0.001 * time_ms.max(MIN_TIME_MS))).exp()
}

/// Snap values in the denormal range to zero so feedback paths can't stall the CPU.
#[inline]
pub fn flush_denormal(value: f32) -> f32 {
    if value.abs() < 1e-15 { 0.0 } else { value }
}

/// One-pole envelope follower with configurable attack and release coefficients.
#[derive(Clone, Copy, Debug)]
pub struct EnvelopeFollower {
    envelope: f32,
    attack_coeff: f32,
    release_coeff: f32,
}

impl EnvelopeFollower {
    /// Create from pre-computed coefficients.
    pub const fn new(attack_coeff: f32, release_coeff: f32) -> Self {
        Self {
            envelope: 0.0,
            attack_coeff,
            release_coeff,
        }
    }

    /// Create from attack/release times in milliseconds.
    pub fn from_ms(attack_ms: f32, release_ms: f32, sample_rate: f32) -> Self {
        Self::new(
            calculate_coefficient(attack_ms, sample_rate),
            calculate_coefficient(release_ms, sample_rate),
        )
    }

    pub const fn reset(&mut self) {
        self.envelope = 0.0;
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let abs_input = input.abs();
        let coeff = if abs_input > self.envelope {
            self.attack_coeff
        } else {
            self.release_coeff
        };
        self.envelope = flush_denormal(coeff.mul_add(self.envelope, (1.0 - coeff) * abs_input));
        self.envelope
    }
}
