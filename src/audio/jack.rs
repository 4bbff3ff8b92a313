use anyhow::{Context, Result, bail};
use assert_no_alloc::assert_no_alloc;
use jack::{AsyncClient, Client, ClientOptions, ClientStatus, Control, Frames, ProcessScope};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::audio::device::{AudioCallback, DeviceBinding};
use crate::audio::ports::Ports;
use crate::audio::processor::{Processor, ProcessorHandle};
use crate::dsp::format::ProcessingFormat;
use crate::settings::DeviceSettings;

pub struct NotificationHandler {
    handle: ProcessorHandle,
    device_name: String,
    lost: Arc<AtomicBool>,
}

pub struct ProcessHandler {
    ports: Ports,
    processor: Processor,
}

impl jack::NotificationHandler for NotificationHandler {
    unsafe fn shutdown(&mut self, status: ClientStatus, reason: &str) {
        error!("JACK server shut down the client ({status:?}): {reason}");
        self.lost.store(true, Ordering::SeqCst);
    }

    fn sample_rate(&mut self, client: &Client, sample_rate: Frames) -> Control {
        debug!(">> JACK sample_rate changed to {sample_rate}");

        let sample_rate = f64::from(sample_rate);
        let block_size = client.buffer_size() as usize;
        match ProcessingFormat::new(sample_rate, block_size) {
            Some(format) => {
                self.handle.request_format(&self.device_name, format);
            }
            None => warn!("ignoring invalid JACK format ({sample_rate} Hz, {block_size} frames)"),
        }

        Control::Continue
    }

    fn xrun(&mut self, _: &Client) -> Control {
        debug!("JACK xrun");
        Control::Continue
    }
}

impl jack::ProcessHandler for ProcessHandler {
    fn process(&mut self, _: &Client, ps: &ProcessScope) -> Control {
        let frames = ps.n_frames() as usize;
        let processor = &mut self.processor;

        self.ports.with_buffers(ps, |input, output| {
            assert_no_alloc(|| processor.on_process_block(input, output, frames));
        });

        Control::Continue
    }

    fn buffer_size(&mut self, client: &Client, frames: Frames) -> Control {
        debug!(">> JACK buffer_size changed to {frames} frames");

        self.processor
            .on_format_change(client.sample_rate() as f64, frames as usize);

        Control::Continue
    }
}

enum State {
    Idle { client: Client, ports: Ports },
    Running(AsyncClient<NotificationHandler, ProcessHandler>),
    Closed,
}

/// JACK client hosting the processor. Ports are registered once; the
/// processor is handed in and out by activating and deactivating the client.
pub struct JackDevice {
    state: State,
    name: String,
    settings: DeviceSettings,
    handle: ProcessorHandle,
    lost: Arc<AtomicBool>,
}

impl JackDevice {
    pub fn open(settings: &DeviceSettings, handle: ProcessorHandle) -> Result<Self> {
        let (client, status) = Client::new(&settings.client_name, ClientOptions::NO_START_SERVER)
            .context("failed to create JACK client")?;
        debug!("JACK client status: {status:?}");

        let ports = Ports::new(&client, settings.input_channels)
            .context("failed to create audio ports")?;

        let name = client.name().to_string();
        let sample_rate = client.sample_rate();
        let buffer_size = client.buffer_size();
        info!("Opened JACK client '{name}' at {sample_rate} Hz, {buffer_size} frames");

        if sample_rate != settings.sample_rate || buffer_size != settings.buffer_size {
            warn!(
                "JACK runs at {sample_rate} Hz / {buffer_size} frames, preferred {} Hz / {} frames",
                settings.sample_rate, settings.buffer_size
            );
        }

        Ok(Self {
            state: State::Idle { client, ports },
            name,
            settings: settings.clone(),
            handle,
            lost: Arc::new(AtomicBool::new(false)),
        })
    }

    fn client(&self) -> Option<&Client> {
        match &self.state {
            State::Idle { client, .. } => Some(client),
            State::Running(active) => Some(active.as_client()),
            State::Closed => None,
        }
    }

    /// Connect our ports to the configured system ports
    fn connect_ports(&self, ports: (&[&str], &[&str])) {
        let Some(client) = self.client() else {
            return;
        };
        let (inputs, outputs) = ports;

        for (system, ours) in self.settings.input_ports.iter().zip(inputs) {
            let ours = format!("{}:{ours}", self.name);
            if let Err(e) = client.connect_ports_by_name(system, &ours) {
                warn!("Failed to connect input port '{system}': {e}");
            } else {
                info!("Connected input: {system} -> {ours}");
            }
        }

        for (system, ours) in self.settings.output_ports.iter().zip(outputs) {
            let ours = format!("{}:{ours}", self.name);
            if let Err(e) = client.connect_ports_by_name(&ours, system) {
                warn!("Failed to connect output port '{system}': {e}");
            } else {
                info!("Connected output: {ours} -> {system}");
            }
        }
    }
}

impl DeviceBinding for JackDevice {
    fn device_name(&self) -> &str {
        &self.name
    }

    fn current_format(&self) -> (f64, usize) {
        self.client().map_or((0.0, 0), |client| {
            (client.sample_rate() as f64, client.buffer_size() as usize)
        })
    }

    fn register(&mut self, processor: Processor) -> Result<()> {
        let State::Idle { client, ports } = std::mem::replace(&mut self.state, State::Closed) else {
            bail!("JACK client '{}' is not idle", self.name);
        };

        let port_names = (ports.input_names(), ports.output_names());
        let notifications = NotificationHandler {
            handle: self.handle.clone(),
            device_name: self.name.clone(),
            lost: Arc::clone(&self.lost),
        };

        let active = client
            .activate_async(notifications, ProcessHandler { ports, processor })
            .context("failed to activate async client")?;
        self.state = State::Running(active);

        if self.settings.auto_connect {
            self.connect_ports(port_names);
        }

        Ok(())
    }

    fn unregister(&mut self) -> Option<Processor> {
        let State::Running(active) = std::mem::replace(&mut self.state, State::Closed) else {
            return None;
        };

        match active.deactivate() {
            Ok((client, _, ProcessHandler { ports, mut processor })) => {
                if self.lost.swap(false, Ordering::SeqCst) {
                    processor.on_stopped();
                }
                self.state = State::Idle { client, ports };
                Some(processor)
            }
            Err(e) => {
                error!("Failed to deactivate JACK client: {e}");
                None
            }
        }
    }

    fn is_registered(&self) -> bool {
        matches!(self.state, State::Running(_)) && !self.lost.load(Ordering::SeqCst)
    }
}
