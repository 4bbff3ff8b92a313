use crossbeam::channel::{Receiver, Sender, TrySendError, bounded};
use log::{debug, warn};
use std::sync::Arc;

use crate::audio::device::AudioCallback;
use crate::audio::params::EngineParameters;
use crate::audio::status::{DeviceStatus, StatusCell};
use crate::dsp::chain::{ProcessingChain, StageId};
use crate::dsp::format::{CHANNELS, ProcessingFormat};
use crate::dsp::stages::shaper::ShaperCurve;

const MESSAGE_CAPACITY: usize = 16;

pub enum ProcessorMessage {
    /// Re-prepare the chain for a new format.
    Prepare(ProcessingFormat),
    /// Re-prepare the chain at its current format, clearing all stage state.
    Reset,
}

/// Real-time half of the engine. Owns the chain; whoever holds it is the
/// only thread touching stage state.
pub struct Processor {
    chain: ProcessingChain,
    params: Arc<EngineParameters>,
    /// Reconfiguration requests from the control plane.
    rx_updates: Receiver<ProcessorMessage>,
    status: StatusCell,
    device_name: String,
}

/// Control-plane half: parameters, status and reconfiguration requests.
#[derive(Clone)]
pub struct ProcessorHandle {
    tx_updates: Sender<ProcessorMessage>,
    params: Arc<EngineParameters>,
    status: StatusCell,
}

impl Processor {
    pub fn new(curve: ShaperCurve) -> (Self, ProcessorHandle) {
        let (tx_updates, rx_updates) = bounded(MESSAGE_CAPACITY);
        let params = Arc::new(EngineParameters::default());
        let status = StatusCell::new();

        (
            Self {
                chain: ProcessingChain::new(curve),
                params: Arc::clone(&params),
                rx_updates,
                status: status.clone(),
                device_name: String::new(),
            },
            ProcessorHandle {
                tx_updates,
                params,
                status,
            },
        )
    }

    /// Name reported in the status snapshot on format changes.
    pub fn set_device_name(&mut self, name: &str) {
        name.clone_into(&mut self.device_name);
    }

    pub const fn chain(&self) -> &ProcessingChain {
        &self.chain
    }

    pub const fn format(&self) -> Option<ProcessingFormat> {
        self.chain.format()
    }

    pub fn handle_messages(&mut self) {
        while let Ok(message) = self.rx_updates.try_recv() {
            match message {
                ProcessorMessage::Prepare(format) => self.prepare(format),
                ProcessorMessage::Reset => self.reprepare(),
            }
        }
    }

    /// Re-prepares at the current format; a no-op before the first prepare.
    pub fn reprepare(&mut self) {
        if let Some(format) = self.chain.format() {
            self.prepare(format);
        }
    }

    fn prepare(&mut self, format: ProcessingFormat) {
        self.chain.prepare(format);
        self.chain.set_input_gain_db(self.params.input_gain_db());
        self.chain.set_output_gain_db(self.params.output_gain_db());
    }

    /// Copies the available input channels and silences the rest, over the
    /// first `frames` samples of each output channel.
    fn adapt_channels(input: &[&[f32]], output: &mut [&mut [f32]], frames: usize) {
        for (channel, dest) in output.iter_mut().enumerate() {
            let dest = &mut dest[..frames];
            match input.get(channel) {
                Some(src) => {
                    let copied = src.len().min(frames);
                    dest[..copied].copy_from_slice(&src[..copied]);
                    dest[copied..].fill(0.0);
                }
                None => dest.fill(0.0),
            }
        }
    }
}

impl AudioCallback for Processor {
    fn on_format_change(&mut self, sample_rate: f64, block_size: usize) {
        let Some(format) = ProcessingFormat::new(sample_rate, block_size) else {
            warn!(
                "ignoring invalid device format ({sample_rate} Hz, {block_size} frames), keeping previous configuration"
            );
            return;
        };

        debug!(
            "preparing chain for {format} ({:.2} ms per block)",
            format.block_duration() * 1_000.0
        );
        self.prepare(format);
        self.status.publish(DeviceStatus {
            device_name: self.device_name.clone(),
            sample_rate,
            buffer_size: block_size,
        });
    }

    fn on_process_block(&mut self, input: &[&[f32]], output: &mut [&mut [f32]], num_samples: usize) {
        self.handle_messages();

        let frames = output
            .iter()
            .map(|channel| channel.len())
            .min()
            .unwrap_or(0)
            .min(num_samples);
        Self::adapt_channels(input, output, frames);

        let params = self.params.snapshot();
        if params.bypassed {
            return;
        }

        self.chain.set_input_gain_db(params.input_gain_db);
        self.chain.set_output_gain_db(params.output_gain_db);

        let mut block: [&mut [f32]; CHANNELS] = Default::default();
        let channels = output.len().min(CHANNELS);
        for (slot, channel) in block.iter_mut().zip(output.iter_mut()) {
            *slot = &mut channel[..frames];
        }

        if params.safe_mode {
            let shaper_bypassed = self.chain.is_bypassed(StageId::Shaper);
            self.chain.set_bypassed(StageId::Shaper, true);
            self.chain.process_block(&mut block[..channels]);
            self.chain.set_bypassed(StageId::Shaper, shaper_bypassed);
        } else {
            self.chain.process_block(&mut block[..channels]);
        }
    }

    fn on_stopped(&mut self) {
        self.chain.reset();
    }
}

impl ProcessorHandle {
    pub const fn parameters(&self) -> &Arc<EngineParameters> {
        &self.params
    }

    pub fn status(&self) -> DeviceStatus {
        self.status.get()
    }

    /// Shared status slot, readable from any thread.
    pub fn status_cell(&self) -> StatusCell {
        self.status.clone()
    }

    pub fn publish_status(&self, status: DeviceStatus) {
        self.status.publish(status);
    }

    /// Queues a re-prepare for `format`; applied at the next block start.
    pub fn request_prepare(&self, format: ProcessingFormat) -> bool {
        self.send(ProcessorMessage::Prepare(format))
    }

    /// Queues a re-prepare for `format` and, once queued, publishes the
    /// status it will produce. Nothing is published when the queue is full.
    pub fn request_format(&self, device_name: &str, format: ProcessingFormat) -> bool {
        if !self.request_prepare(format) {
            return false;
        }

        self.publish_status(DeviceStatus {
            device_name: device_name.to_string(),
            sample_rate: format.sample_rate(),
            buffer_size: format.block_size(),
        });
        true
    }

    /// Queues a re-prepare at the current format; applied at the next block start.
    pub fn request_reset(&self) -> bool {
        self.send(ProcessorMessage::Reset)
    }

    fn send(&self, message: ProcessorMessage) -> bool {
        match self.tx_updates.try_send(message) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!("processor message queue full, request dropped");
                false
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!("processor is gone, request dropped");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::stages::common::db_to_lin;
    use crate::dsp::stages::shaper::DEFAULT_DRIVE;

    const SAMPLE_RATE: f64 = 48_000.0;
    const BLOCK: usize = 128;

    fn prepared() -> (Processor, ProcessorHandle) {
        let (mut processor, handle) = Processor::new(ShaperCurve::Tanh);
        processor.set_device_name("test");
        processor.on_format_change(SAMPLE_RATE, BLOCK);
        (processor, handle)
    }

    fn ramp(scale: f32) -> Vec<f32> {
        (0..BLOCK).map(|i| scale * (i as f32 / BLOCK as f32 - 0.5)).collect()
    }

    fn run(processor: &mut Processor, left: &[f32], right: &[f32]) -> (Vec<f32>, Vec<f32>) {
        let mut out_l = vec![9.0; BLOCK];
        let mut out_r = vec![9.0; BLOCK];
        processor.on_process_block(&[left, right], &mut [&mut out_l[..], &mut out_r[..]], BLOCK);
        (out_l, out_r)
    }

    #[test]
    fn format_change_prepares_and_publishes_status() {
        let (processor, handle) = prepared();
        assert_eq!(processor.format().map(|f| f.sample_rate()), Some(SAMPLE_RATE));

        let status = handle.status();
        assert_eq!(status.device_name, "test");
        assert_eq!(status.sample_rate, SAMPLE_RATE);
        assert_eq!(status.buffer_size, BLOCK);
    }

    #[test]
    fn invalid_format_keeps_previous_configuration() {
        let (mut processor, handle) = prepared();
        processor.on_format_change(0.0, BLOCK);
        processor.on_format_change(SAMPLE_RATE, 0);
        processor.on_format_change(-1.0, BLOCK);

        assert_eq!(processor.format().map(|f| f.sample_rate()), Some(SAMPLE_RATE));
        assert_eq!(handle.status().sample_rate, SAMPLE_RATE);
    }

    #[test]
    fn unprepared_processor_passes_dry_signal() {
        let (mut processor, _) = Processor::new(ShaperCurve::Tanh);
        let input = ramp(1.0);
        let (l, r) = run(&mut processor, &input, &input);
        assert_eq!(l, input);
        assert_eq!(r, input);
    }

    #[test]
    fn missing_input_channels_are_silenced() {
        let (mut processor, handle) = prepared();
        let input = ramp(0.8);

        for bypassed in [true, false] {
            handle.parameters().set_bypassed(bypassed);
            let mut out_l = vec![9.0; BLOCK];
            let mut out_r = vec![9.0; BLOCK];
            processor.on_process_block(
                &[&input[..]],
                &mut [&mut out_l[..], &mut out_r[..]],
                BLOCK,
            );
            assert!(out_r.iter().all(|&s| s == 0.0));
            assert!(out_l.iter().any(|&s| s != 0.0));
        }
    }

    #[test]
    fn short_input_channel_is_padded_with_silence() {
        let (mut processor, handle) = prepared();
        handle.parameters().set_bypassed(true);
        let half = ramp(1.0)[..BLOCK / 2].to_vec();
        let (l, _) = run(&mut processor, &half, &half);
        assert_eq!(&l[..BLOCK / 2], &half[..]);
        assert!(l[BLOCK / 2..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn only_requested_samples_are_written() {
        let (mut processor, _) = prepared();
        let input = ramp(1.0);
        let mut out = vec![9.0; BLOCK];
        processor.on_process_block(&[&input[..]], &mut [&mut out[..]], BLOCK / 4);
        assert!(out[BLOCK / 4..].iter().all(|&s| s == 9.0));
    }

    #[test]
    fn bypass_is_exact_and_does_not_advance_state() {
        let (mut processor, handle) = prepared();
        let (mut reference, _) = prepared();
        let loud = ramp(2.0);

        handle.parameters().set_input_gain_db(12.0);
        handle.parameters().set_safe_mode(true);
        handle.parameters().set_bypassed(true);
        for _ in 0..50 {
            let (l, r) = run(&mut processor, &loud, &loud);
            assert_eq!(l, loud);
            assert_eq!(r, loud);
        }

        // Leaving bypass must sound exactly like a chain that never saw the
        // bypassed audio.
        handle.parameters().reset();
        assert_eq!(run(&mut processor, &loud, &loud), run(&mut reference, &loud, &loud));
    }

    #[test]
    fn safe_mode_skips_only_the_shaper_and_restores_it() {
        let (mut full, _) = prepared();
        let (mut light, light_handle) = prepared();
        light_handle.parameters().set_safe_mode(true);

        for _ in 0..10 {
            let input = ramp(1.5);
            let (with, _) = run(&mut full, &input, &input);
            let (without, _) = run(&mut light, &input, &input);
            for (&a, &b) in with.iter().zip(&without) {
                assert_eq!(a, (b * DEFAULT_DRIVE).tanh());
            }
        }
        assert!(!light.chain().is_bypassed(StageId::Shaper));
    }

    #[test]
    fn gains_apply_at_the_next_block() {
        let (mut processor, handle) = prepared();
        let (mut reference, _) = prepared();
        let input = ramp(0.5);
        assert_eq!(run(&mut processor, &input, &input), run(&mut reference, &input, &input));

        handle.parameters().set_output_gain_db(-6.0);
        let (after, _) = run(&mut processor, &input, &input);
        let (unchanged, _) = run(&mut reference, &input, &input);
        assert_eq!(processor.chain().output_gain_db(), -6.0);

        let gain = db_to_lin(-6.0);
        for (&a, &u) in after.iter().zip(&unchanged) {
            assert_eq!(a, u * gain);
        }
    }

    #[test]
    fn reset_message_matches_fresh_processor() {
        let (mut processor, handle) = prepared();
        let input = ramp(1.8);
        for _ in 0..20 {
            run(&mut processor, &input, &input);
        }

        assert!(handle.request_reset());
        let (mut fresh, _) = prepared();
        assert_eq!(run(&mut processor, &input, &input), run(&mut fresh, &input, &input));
    }

    #[test]
    fn prepare_message_switches_format() {
        let (mut processor, handle) = prepared();
        let format = ProcessingFormat::new(96_000.0, 256).unwrap();
        assert!(handle.request_prepare(format));
        processor.handle_messages();
        assert_eq!(processor.format(), Some(format));
    }

    #[test]
    fn stopped_clears_stage_state() {
        let (mut processor, _) = prepared();
        let input = ramp(1.8);
        for _ in 0..20 {
            run(&mut processor, &input, &input);
        }
        processor.on_stopped();

        let (mut fresh, _) = prepared();
        assert_eq!(run(&mut processor, &input, &input), run(&mut fresh, &input, &input));
    }

    #[test]
    fn full_queue_drops_requests() {
        let (_processor, handle) = prepared();
        for _ in 0..MESSAGE_CAPACITY {
            assert!(handle.request_reset());
        }
        assert!(!handle.request_reset());
    }

    #[test]
    fn queued_format_publishes_only_when_accepted() {
        let (mut processor, handle) = prepared();
        let before = handle.status();

        let format = ProcessingFormat::new(44_100.0, 64).unwrap();
        assert!(handle.request_format("test", format));
        assert_eq!(handle.status().sample_rate, 44_100.0);
        assert_eq!(handle.status().buffer_size, 64);

        processor.handle_messages();
        assert_eq!(processor.format(), Some(format));

        for _ in 0..MESSAGE_CAPACITY {
            assert!(handle.request_reset());
        }
        handle.publish_status(before.clone());
        let rejected = ProcessingFormat::new(96_000.0, 1024).unwrap();
        assert!(!handle.request_format("test", rejected));
        assert_eq!(handle.status(), before);
    }
}
