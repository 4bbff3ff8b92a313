#![allow(dead_code)]

use anyhow::{Result, bail};
use signal_path::audio::device::{AudioCallback, DeviceBinding};
use signal_path::audio::engine::Engine;
use signal_path::audio::processor::Processor;
use signal_path::dsp::stages::shaper::ShaperCurve;
use std::sync::{Arc, Mutex, MutexGuard};

pub const SAMPLE_RATE: f64 = 48_000.0;
pub const BLOCK_SIZE: usize = 256;
pub const DEVICE_NAME: &str = "fake";

#[derive(Default)]
struct DeviceState {
    processor: Option<Processor>,
    format: (f64, usize),
    registrations: usize,
}

/// In-process stand-in for an audio server. Registration prepares the
/// processor for the current format, the way JACK announces its buffer size
/// before the first cycle.
pub struct FakeDevice {
    state: Arc<Mutex<DeviceState>>,
    fail_register: bool,
}

/// Test-side handle that plays the real-time thread of a [`FakeDevice`].
#[derive(Clone)]
pub struct FakeDriver {
    state: Arc<Mutex<DeviceState>>,
}

pub fn fake_device(sample_rate: f64, block_size: usize) -> (FakeDevice, FakeDriver) {
    let state = Arc::new(Mutex::new(DeviceState {
        format: (sample_rate, block_size),
        ..DeviceState::default()
    }));

    (
        FakeDevice {
            state: Arc::clone(&state),
            fail_register: false,
        },
        FakeDriver { state },
    )
}

pub fn fake_engine() -> (Engine, FakeDriver) {
    fake_engine_at(SAMPLE_RATE, BLOCK_SIZE)
}

pub fn fake_engine_at(sample_rate: f64, block_size: usize) -> (Engine, FakeDriver) {
    let (device, driver) = fake_device(sample_rate, block_size);
    let engine = Engine::with_device(ShaperCurve::Tanh, |_| Ok(device));
    (engine, driver)
}

impl FakeDevice {
    pub fn failing_registration(mut self) -> Self {
        self.fail_register = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().expect("device state poisoned")
    }
}

impl DeviceBinding for FakeDevice {
    fn device_name(&self) -> &str {
        DEVICE_NAME
    }

    fn current_format(&self) -> (f64, usize) {
        self.lock().format
    }

    fn register(&mut self, mut processor: Processor) -> Result<()> {
        if self.fail_register {
            bail!("registration refused");
        }

        let mut state = self.lock();
        let (sample_rate, block_size) = state.format;
        processor.on_format_change(sample_rate, block_size);
        state.processor = Some(processor);
        state.registrations += 1;
        Ok(())
    }

    fn unregister(&mut self) -> Option<Processor> {
        self.lock().processor.take()
    }

    fn is_registered(&self) -> bool {
        self.lock().processor.is_some()
    }
}

impl FakeDriver {
    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().expect("device state poisoned")
    }

    pub fn registrations(&self) -> usize {
        self.lock().registrations
    }

    /// Runs one stereo block through the registered processor. `None` when
    /// no processor is registered.
    pub fn process(&self, input: &[&[f32]]) -> Option<[Vec<f32>; 2]> {
        let mut state = self.lock();
        let block_size = state.format.1;
        let processor = state.processor.as_mut()?;

        let mut left = vec![f32::NAN; block_size];
        let mut right = vec![f32::NAN; block_size];
        processor.on_process_block(
            input,
            &mut [left.as_mut_slice(), right.as_mut_slice()],
            block_size,
        );
        Some([left, right])
    }

    pub fn process_stereo(&self, left: &[f32], right: &[f32]) -> Option<[Vec<f32>; 2]> {
        self.process(&[left, right])
    }

    /// The server switched format; announces it the way a binding would.
    pub fn set_format(&self, sample_rate: f64, block_size: usize) {
        let mut state = self.lock();
        state.format = (sample_rate, block_size);
        if let Some(processor) = state.processor.as_mut() {
            processor.on_format_change(sample_rate, block_size);
        }
    }

    /// The server switched format without telling the processor.
    pub fn set_reported_format(&self, sample_rate: f64, block_size: usize) {
        self.lock().format = (sample_rate, block_size);
    }

    /// The server halted the stream.
    pub fn stop_device(&self) {
        if let Some(processor) = self.lock().processor.as_mut() {
            processor.on_stopped();
        }
    }
}

/// Deterministic broadband test signal in [-amplitude, amplitude].
pub fn noise(len: usize, seed: u32, amplitude: f32) -> Vec<f32> {
    let mut state = seed.wrapping_mul(747_796_405).wrapping_add(2_891_336_453);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            amplitude * (state as f32 / u32::MAX as f32 * 2.0 - 1.0)
        })
        .collect()
}

pub fn sine(len: usize, freq: f32, sample_rate: f64, amplitude: f32) -> Vec<f32> {
    (0..len)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()
        })
        .collect()
}

pub fn rms(signal: &[f32]) -> f32 {
    (signal.iter().map(|x| x * x).sum::<f32>() / signal.len() as f32).sqrt()
}
