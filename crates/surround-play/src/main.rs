//! Surround Play - test-tone player for the surround mixer
//!
//! Opens an output device through cpal, feeds the mixer a bank of sine
//! voices (one per virtual channel) and reports ring diagnostics once a
//! second until the playback time is up.
//!
//! ## Command line flags
//!
//! - `--list-devices`: print output devices with their usable layouts
//! - `--switch-rate HZ`: reopen the device at another rate halfway through
//! - `--save`: write the settings in effect to the settings file on exit

mod cli;
mod config;
mod tone;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use surround_core::audio::{output_devices, AudioConfig, BackendKind};
use surround_core::HardwareContext;

use cli::Args;
use tone::ToneSource;

fn main() -> Result<()> {
    // Set RUST_LOG=debug for buffer sizing and filter geometry
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();

    if args.list_devices {
        return list_devices();
    }

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut audio_config: AudioConfig = config::load_config(&config_path);
    args.apply(&mut audio_config);

    let mut ctx = HardwareContext::init(BackendKind::Cpal, audio_config)
        .context("Failed to open audio output")?;

    let format = ctx.format();
    println!(
        "Playing {} voices on {} @ {}Hz ({} frames/block, {:.1}ms ring)",
        args.voices,
        format.layout,
        format.sampling_rate,
        format.block_size,
        format.latency_ms()
    );

    let tone = ToneSource::new(args.voices, args.frequency, args.amplitude);
    ctx.start_audio(tone.into_source())
        .context("Failed to start audio")?;

    let switch_at = args.switch_rate.map(|rate| (args.duration / 2, rate));
    for second in 0..args.duration {
        std::thread::sleep(Duration::from_secs(1));

        if let Some((at, rate)) = switch_at {
            if second + 1 == at {
                let format = ctx
                    .set_sampling_rate(rate)
                    .with_context(|| format!("Failed to switch to {}Hz", rate))?;
                println!("Switched to {}Hz ({} frames/block)", format.sampling_rate, format.block_size);
            }
        }

        let d = ctx.diagnostics();
        log::info!(
            "ring {}/{} samples, {:.1}ms queued, {} underruns",
            d.committed,
            d.capacity,
            d.latency_ms,
            d.underruns
        );
    }

    if args.save {
        config::save_config(&ctx.config(), &config_path)?;
        println!("Settings saved to {:?}", config_path);
    }

    ctx.shutdown();
    Ok(())
}

fn list_devices() -> Result<()> {
    let devices = output_devices().context("Failed to enumerate output devices")?;
    if devices.is_empty() {
        println!("No output devices found");
        return Ok(());
    }

    for device in devices {
        let layouts: Vec<&str> = device.layouts.iter().map(|l| l.name()).collect();
        println!(
            "{}{}\n    layouts: {}\n    rates:   {:?}",
            device,
            if device.is_default { " (default)" } else { "" },
            layouts.join(", "),
            device.sample_rates
        );
    }
    Ok(())
}
