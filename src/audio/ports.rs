use anyhow::{Context, Result};
use jack::{AudioIn, AudioOut, Client, Port, ProcessScope};

use crate::dsp::format::CHANNELS;

const MONO_INPUT_NAMES: [&str; 1] = ["in"];
const STEREO_INPUT_NAMES: [&str; 2] = ["in_left", "in_right"];
const OUTPUT_NAMES: [&str; CHANNELS] = ["out_left", "out_right"];

pub struct Ports {
    inputs: Vec<Port<AudioIn>>,
    output_left: Port<AudioOut>,
    output_right: Port<AudioOut>,
}

impl Ports {
    pub fn new(client: &Client, input_channels: usize) -> Result<Self> {
        let input_names: &[&str] = if input_channels == 1 {
            &MONO_INPUT_NAMES
        } else {
            &STEREO_INPUT_NAMES
        };

        let inputs = input_names
            .iter()
            .map(|name| {
                client
                    .register_port(name, AudioIn::default())
                    .with_context(|| format!("failed to register in port {name}"))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            inputs,
            output_left: client
                .register_port(OUTPUT_NAMES[0], AudioOut::default())
                .context("failed to register out port left")?,
            output_right: client
                .register_port(OUTPUT_NAMES[1], AudioOut::default())
                .context("failed to register out port right")?,
        })
    }

    /// Short names of our input ports, in channel order.
    pub fn input_names(&self) -> &'static [&'static str] {
        if self.inputs.len() == 1 {
            &MONO_INPUT_NAMES
        } else {
            &STEREO_INPUT_NAMES
        }
    }

    pub const fn output_names(&self) -> &'static [&'static str] {
        &OUTPUT_NAMES
    }

    /// Lends the cycle's input and output buffers to `f` without allocating.
    pub fn with_buffers<F>(&mut self, ps: &ProcessScope, f: F)
    where
        F: FnOnce(&[&[f32]], &mut [&mut [f32]]),
    {
        let mut inputs: [&[f32]; CHANNELS] = Default::default();
        for (slot, port) in inputs.iter_mut().zip(&self.inputs) {
            *slot = port.as_slice(ps);
        }
        let mut outputs = [
            self.output_left.as_mut_slice(ps),
            self.output_right.as_mut_slice(ps),
        ];

        f(&inputs[..self.inputs.len()], &mut outputs);
    }
}
