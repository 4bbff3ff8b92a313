use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::audio::device::{AudioCallback, DeviceBinding};
use crate::audio::jack::JackDevice;
use crate::audio::params::EngineParameters;
use crate::audio::processor::{Processor, ProcessorHandle};
use crate::audio::status::{DeviceStatus, StatusCell};
use crate::dsp::format::ProcessingFormat;
use crate::dsp::stages::shaper::ShaperCurve;
use crate::settings::Settings;

/// Control-plane side of the signal path. Every setter is a lock-free store.
/// The engine is `Send`, so lifecycle calls can run on any control thread;
/// [`Engine::parameters`] and [`Engine::status_reader`] serve the others.
pub struct Engine {
    handle: ProcessorHandle,
    device: Option<Box<dyn DeviceBinding>>,
    /// The processor while no device is running it.
    parked: Option<Processor>,
}

impl Engine {
    /// Opens the JACK client described by `settings`. A missing server is
    /// logged and leaves the engine without a device.
    pub fn new(settings: &Settings) -> Self {
        Self::with_device(settings.shaper_curve, |handle| {
            JackDevice::open(&settings.device, handle)
        })
    }

    pub fn with_device<D, F>(curve: ShaperCurve, open: F) -> Self
    where
        D: DeviceBinding + 'static,
        F: FnOnce(ProcessorHandle) -> Result<D>,
    {
        let (mut processor, handle) = Processor::new(curve);

        let device = match open(handle.clone()) {
            Ok(device) => device,
            Err(e) => {
                error!("Audio init error: {e:#}");
                return Self {
                    handle,
                    device: None,
                    parked: Some(processor),
                };
            }
        };

        processor.set_device_name(device.device_name());
        let mut engine = Self {
            handle,
            device: Some(Box::new(device)),
            parked: Some(processor),
        };
        engine.register_parked();
        engine
    }

    /// Prepares the chain for the device's current format and makes sure the
    /// processor is registered. Safe to call repeatedly.
    pub fn start(&mut self) {
        let Some(device) = self.device.as_ref() else {
            debug!("start requested without an audio device");
            return;
        };

        let (sample_rate, block_size) = device.current_format();
        match ProcessingFormat::new(sample_rate, block_size) {
            Some(format) => {
                if let Some(processor) = self.parked.as_mut() {
                    processor.on_format_change(sample_rate, block_size);
                    info!("Audio started: {format}");
                } else if self.handle.request_format(device.device_name(), format) {
                    info!("Audio started: {format}");
                } else {
                    warn!("could not queue reconfiguration for {format}, keeping previous format");
                }
            }
            None => warn!(
                "device reports invalid format ({sample_rate} Hz, {block_size} frames), not reconfiguring"
            ),
        }

        self.register_parked();
    }

    /// Unregisters the processor from the device. Chain state is kept.
    pub fn stop(&mut self) {
        let Some(device) = self.device.as_mut() else {
            return;
        };

        if let Some(processor) = device.unregister() {
            self.parked = Some(processor);
            info!("Audio stopped");
        }
    }

    fn register_parked(&mut self) {
        let (Some(device), Some(processor)) = (self.device.as_mut(), self.parked.take()) else {
            return;
        };

        if let Err(e) = device.register(processor) {
            error!("Failed to register audio callback: {e:#}");
            self.device = None;
        }
    }

    pub fn set_input_gain(&self, gain_db: f32) {
        self.handle.parameters().set_input_gain_db(gain_db);
    }

    pub fn set_output_gain(&self, gain_db: f32) {
        self.handle.parameters().set_output_gain_db(gain_db);
    }

    pub fn set_bypassed(&self, bypassed: bool) {
        self.handle.parameters().set_bypassed(bypassed);
    }

    pub fn set_safe_mode_enabled(&self, enabled: bool) {
        self.handle.parameters().set_safe_mode(enabled);
    }

    /// Restores default controls and clears all filter and envelope state.
    /// Returns `false` when the clear could not be handed to the running
    /// processor; the controls are restored either way.
    pub fn reset_processing(&mut self) -> bool {
        self.handle.parameters().reset();

        match self.parked.as_mut() {
            Some(processor) => {
                processor.reprepare();
                true
            }
            None => {
                let queued = self.handle.request_reset();
                if !queued {
                    warn!("could not queue processing reset");
                }
                queued
            }
        }
    }

    pub fn device_status(&self) -> DeviceStatus {
        self.handle.status()
    }

    /// Status reader for threads that do not own the engine.
    pub fn status_reader(&self) -> StatusCell {
        self.handle.status_cell()
    }

    pub fn input_gain_db(&self) -> f32 {
        self.handle.parameters().input_gain_db()
    }

    pub fn output_gain_db(&self) -> f32 {
        self.handle.parameters().output_gain_db()
    }

    pub fn is_bypassed(&self) -> bool {
        self.handle.parameters().is_bypassed()
    }

    pub fn is_safe_mode_enabled(&self) -> bool {
        self.handle.parameters().is_safe_mode()
    }

    pub fn has_device(&self) -> bool {
        self.device.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.device
            .as_ref()
            .is_some_and(|device| device.is_registered())
    }

    /// Shared parameter cells, for control threads that outlive a borrow.
    pub fn parameters(&self) -> Arc<EngineParameters> {
        Arc::clone(self.handle.parameters())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if let Some(mut processor) = self.device.as_mut().and_then(|device| device.unregister()) {
            processor.on_stopped();
        }
    }
}
