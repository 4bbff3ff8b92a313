use crate::dsp::stages::level::{MAX_GAIN_DB, MIN_GAIN_DB};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// `f32` stored as bits in an `AtomicU32`.
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    pub fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

impl std::fmt::Debug for AtomicF32 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.load())
    }
}

/// Values the control plane writes and the audio thread reads. Every field
/// is its own atomic; no ordering between fields is promised.
#[derive(Debug)]
pub struct EngineParameters {
    input_gain_db: AtomicF32,
    output_gain_db: AtomicF32,
    bypassed: AtomicBool,
    safe_mode: AtomicBool,
}

/// Per-block copy of [`EngineParameters`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSnapshot {
    pub input_gain_db: f32,
    pub output_gain_db: f32,
    pub bypassed: bool,
    pub safe_mode: bool,
}

impl Default for EngineParameters {
    fn default() -> Self {
        Self {
            input_gain_db: AtomicF32::new(0.0),
            output_gain_db: AtomicF32::new(0.0),
            bypassed: AtomicBool::new(false),
            safe_mode: AtomicBool::new(false),
        }
    }
}

/// Clamps to the supported trim range; non-finite input is rejected.
fn sanitize_gain(gain_db: f32) -> Option<f32> {
    gain_db
        .is_finite()
        .then(|| gain_db.clamp(MIN_GAIN_DB, MAX_GAIN_DB))
}

impl EngineParameters {
    pub fn set_input_gain_db(&self, gain_db: f32) {
        if let Some(gain_db) = sanitize_gain(gain_db) {
            self.input_gain_db.store(gain_db);
        }
    }

    pub fn set_output_gain_db(&self, gain_db: f32) {
        if let Some(gain_db) = sanitize_gain(gain_db) {
            self.output_gain_db.store(gain_db);
        }
    }

    pub fn set_bypassed(&self, bypassed: bool) {
        self.bypassed.store(bypassed, Ordering::Relaxed);
    }

    pub fn set_safe_mode(&self, enabled: bool) {
        self.safe_mode.store(enabled, Ordering::Relaxed);
    }

    pub fn input_gain_db(&self) -> f32 {
        self.input_gain_db.load()
    }

    pub fn output_gain_db(&self) -> f32 {
        self.output_gain_db.load()
    }

    pub fn is_bypassed(&self) -> bool {
        self.bypassed.load(Ordering::Relaxed)
    }

    pub fn is_safe_mode(&self) -> bool {
        self.safe_mode.load(Ordering::Relaxed)
    }

    /// Both gains to 0 dB, both flags off.
    pub fn reset(&self) {
        self.input_gain_db.store(0.0);
        self.output_gain_db.store(0.0);
        self.set_bypassed(false);
        self.set_safe_mode(false);
    }

    #[inline]
    pub fn snapshot(&self) -> ParameterSnapshot {
        ParameterSnapshot {
            input_gain_db: self.input_gain_db(),
            output_gain_db: self.output_gain_db(),
            bypassed: self.is_bypassed(),
            safe_mode: self.is_safe_mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn atomic_f32_round_trips_bits() {
        let cell = AtomicF32::new(-3.25);
        assert_eq!(cell.load(), -3.25);
        cell.store(f32::MIN_POSITIVE);
        assert_eq!(cell.load(), f32::MIN_POSITIVE);
    }

    #[test]
    fn gains_are_clamped_and_non_finite_ignored() {
        let params = EngineParameters::default();
        params.set_input_gain_db(40.0);
        assert_eq!(params.input_gain_db(), MAX_GAIN_DB);
        params.set_output_gain_db(-80.0);
        assert_eq!(params.output_gain_db(), MIN_GAIN_DB);

        params.set_input_gain_db(f32::NAN);
        params.set_output_gain_db(f32::INFINITY);
        assert_eq!(params.input_gain_db(), MAX_GAIN_DB);
        assert_eq!(params.output_gain_db(), MIN_GAIN_DB);
    }

    #[test]
    fn reset_restores_defaults() {
        let params = EngineParameters::default();
        params.set_input_gain_db(6.0);
        params.set_output_gain_db(-6.0);
        params.set_bypassed(true);
        params.set_safe_mode(true);

        params.reset();
        assert_eq!(
            params.snapshot(),
            ParameterSnapshot {
                input_gain_db: 0.0,
                output_gain_db: 0.0,
                bypassed: false,
                safe_mode: false,
            }
        );
    }
}
