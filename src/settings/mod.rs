use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::dsp::stages::shaper::ShaperCurve;

const SETTINGS_FILENAME: &str = "settings.json";
const APP_DIR: &str = "signal-path";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceSettings {
    /// Name the JACK client registers under.
    pub client_name: String,
    /// 1 for a mono capture port, 2 for stereo.
    pub input_channels: usize,
    /// System ports connected to our inputs, in order.
    pub input_ports: Vec<String>,
    /// System ports our left/right outputs are connected to.
    pub output_ports: Vec<String>,
    pub sample_rate: u32,
    pub buffer_size: u32,
    pub auto_connect: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            client_name: APP_DIR.to_string(),
            input_channels: 2,
            input_ports: vec![
                "system:capture_1".to_string(),
                "system:capture_2".to_string(),
            ],
            output_ports: vec![
                "system:playback_1".to_string(),
                "system:playback_2".to_string(),
            ],
            sample_rate: 48_000,
            buffer_size: 512,
            auto_connect: true,
        }
    }
}

impl std::fmt::Display for DeviceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Client Name: {}", self.client_name)?;
        writeln!(f, "Input Channels: {}", self.input_channels)?;
        writeln!(f, "Input Ports: {}", self.input_ports.join(", "))?;
        writeln!(f, "Output Ports: {}", self.output_ports.join(", "))?;
        writeln!(f, "Sample Rate: {}", self.sample_rate)?;
        writeln!(f, "Buffer Size: {}", self.buffer_size)?;
        writeln!(f, "Auto Connect: {}", self.auto_connect)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub device: DeviceSettings,
    pub shaper_curve: ShaperCurve,
}

impl std::fmt::Display for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "------------------------------")?;
        writeln!(f, "Device Settings:")?;
        writeln!(f, "{}", self.device)?;
        writeln!(f, "Shaper Curve: {}", self.shaper_curve)?;
        Ok(())
    }
}

impl Settings {
    /// Loads from the default location, falling back to defaults when no
    /// file exists.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_settings_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read settings file {}", path.display()))?;
        let settings: Self = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse settings file {}", path.display()))?;
        settings.validate()?;

        debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        let device = &self.device;
        if !(1..=2).contains(&device.input_channels) {
            anyhow::bail!(
                "input_channels must be 1 or 2, got {}",
                device.input_channels
            );
        }
        if device.sample_rate == 0 || device.buffer_size == 0 {
            anyhow::bail!("sample_rate and buffer_size must be positive");
        }
        Ok(())
    }

    pub fn get_settings_path() -> PathBuf {
        // Try to use XDG config directory on Linux
        if let Ok(config_dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(config_dir)
                .join(APP_DIR)
                .join(SETTINGS_FILENAME)
        } else if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home)
                .join(".config")
                .join(APP_DIR)
                .join(SETTINGS_FILENAME)
        } else {
            PathBuf::from(".").join(SETTINGS_FILENAME)
        }
    }

    /// PipeWire's JACK shim takes the preferred block size and sample rate
    /// from the environment. Must run before any JACK client is created.
    pub fn apply_to_environment(&self) {
        unsafe {
            std::env::set_var("PIPEWIRE_LATENCY", self.get_pipewire_latency());
            if std::env::var("JACK_PROMISCUOUS_SERVER").is_err() {
                std::env::set_var("JACK_PROMISCUOUS_SERVER", "pipewire");
            }
        }
    }

    fn get_pipewire_latency(&self) -> String {
        format!("{}/{}", self.device.buffer_size, self.device.sample_rate)
    }
}
