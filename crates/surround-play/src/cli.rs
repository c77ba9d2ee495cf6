//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use surround_core::audio::{AudioConfig, BufferSize};
use surround_core::SpeakerLayout;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "surround-play")]
#[command(about = "Play a test tone through the surround mixer", long_about = None)]
pub struct Args {
    /// Settings file (default: platform config dir)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the settings in effect back to the settings file on exit
    #[arg(long)]
    pub save: bool,

    /// List output devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Output device name (overrides the settings file)
    #[arg(long, value_name = "NAME")]
    pub device: Option<String>,

    /// Sampling rate to request
    #[arg(long, value_name = "HZ")]
    pub rate: Option<u32>,

    /// Speaker layout to request: mono, stereo, 5.1, 7.1
    #[arg(long, value_name = "LAYOUT", value_parser = parse_layout)]
    pub layout: Option<SpeakerLayout>,

    /// Hardware block size in frames
    #[arg(long, value_name = "FRAMES")]
    pub buffer: Option<u32>,

    /// Number of virtual channels in the test tone
    #[arg(long, value_name = "N", default_value = "2")]
    pub voices: usize,

    /// Frequency of the lowest voice
    #[arg(long, value_name = "HZ", default_value = "440")]
    pub frequency: f32,

    /// Peak amplitude of each voice
    #[arg(long, value_name = "GAIN", default_value = "0.2")]
    pub amplitude: f32,

    /// Master volume
    #[arg(long, value_name = "GAIN")]
    pub volume: Option<f32>,

    /// Playback time
    #[arg(long, value_name = "SECONDS", default_value = "5")]
    pub duration: u64,

    /// Reopen the device at this rate halfway through playback
    #[arg(long, value_name = "HZ")]
    pub switch_rate: Option<u32>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded settings
    pub fn apply(&self, config: &mut AudioConfig) {
        if let Some(device) = &self.device {
            config.device = Some(device.clone());
        }
        if let Some(rate) = self.rate {
            config.sample_rate = rate;
        }
        if let Some(layout) = self.layout {
            config.layout = layout;
        }
        if let Some(frames) = self.buffer {
            config.buffer_size = BufferSize::Fixed(frames);
        }
        if let Some(volume) = self.volume {
            config.settings.master_volume = volume;
        }
    }
}

fn parse_layout(s: &str) -> Result<SpeakerLayout, String> {
    SpeakerLayout::ALL
        .iter()
        .copied()
        .find(|layout| layout.name().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown layout '{}' (mono, stereo, 5.1, 7.1)", s))
}
