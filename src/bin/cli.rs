use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use signal_path::audio::engine::Engine;
use signal_path::dsp::stages::shaper::ShaperCurve;
use signal_path::settings::Settings;
use std::{
    path::PathBuf,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::Duration,
};

#[cfg(debug_assertions)]
#[global_allocator]
static A: assert_no_alloc::AllocDisabler = assert_no_alloc::AllocDisabler;

#[derive(Parser, Debug)]
#[command(name = "signal-path")]
#[command(version)]
#[command(about = "Live stereo signal path: high-pass, compressor, trims and soft saturation.")]
struct Args {
    #[arg(long, env = "SIGNAL_PATH_SETTINGS", help = "Settings file to load")]
    settings: Option<PathBuf>,
    #[arg(long, value_enum, help = "Override the saturation curve")]
    shaper: Option<ShaperCurve>,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "Input trim in dB")]
    input_gain: f32,
    #[arg(long, allow_hyphen_values = true, default_value_t = 0.0, help = "Output trim in dB")]
    output_gain: f32,
    #[arg(long, help = "Skip the saturation stage")]
    safe_mode: bool,
}

fn main() -> Result<()> {
    dotenv::dotenv().ok();
    env_logger::init();

    let args = Args::parse();
    info!("signal-path v{}", env!("CARGO_PKG_VERSION"));
    info!("Args: {args:?}");

    let mut settings = match &args.settings {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("failed to load settings from '{}'", path.display()))?,
        None => Settings::load().context("failed to load settings")?,
    };
    if let Some(curve) = args.shaper {
        settings.shaper_curve = curve;
    }
    info!("{settings}");

    settings.apply_to_environment();

    let mut engine = Engine::new(&settings);
    engine.set_input_gain(args.input_gain);
    engine.set_output_gain(args.output_gain);
    engine.set_safe_mode_enabled(args.safe_mode);
    engine.start();

    if !engine.has_device() {
        anyhow::bail!("no audio device available, is the JACK server running?");
    }
    info!("Running on {}", engine.device_status());

    let running = Arc::new(AtomicBool::new(true));
    let shutdown_flag = Arc::clone(&running);

    ctrlc::set_handler(move || {
        info!("Ctrl+C received, shutting down...");
        shutdown_flag.store(false, Ordering::SeqCst);
    })
    .context("error setting Ctrl+C handler")?;

    while running.load(Ordering::SeqCst) && engine.is_running() {
        thread::sleep(Duration::from_secs(1));
    }

    engine.stop();
    Ok(())
}
