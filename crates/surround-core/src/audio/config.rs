//! Audio backend configuration
//!
//! Requested device format plus the runtime mixing tunables. Everything
//! here is a request: the device may grant something else, see
//! [`NegotiatedFormat`](super::NegotiatedFormat).

use serde::{Deserialize, Serialize};

use crate::types::{block_size_for, SpeakerLayout, DEFAULT_SAMPLE_RATE};

/// Largest block a device may be asked for (frames)
pub const MAX_BUFFER_SIZE: u32 = 8192;

/// Smallest block a device may be asked for (frames)
pub const MIN_BUFFER_SIZE: u32 = 64;

/// Which backend `open_backend` should create
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// System output device through CPAL
    #[default]
    Cpal,
    /// No device: the caller pulls blocks itself (offline rendering, tests)
    Manual,
}

/// Preferred hardware block size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BufferSize {
    /// Use the block size tabled for the sampling rate
    #[default]
    Default,
    /// Request a specific block size in frames (clamped to 64..=8192)
    Fixed(u32),
}

impl BufferSize {
    /// Block size to request at `sampling_rate`
    pub fn resolve(&self, sampling_rate: u32) -> u32 {
        match self {
            BufferSize::Default => block_size_for(sampling_rate),
            BufferSize::Fixed(frames) => (*frames).clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE),
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> f32 {
        (self.resolve(sample_rate) as f32 / sample_rate as f32) * 1000.0
    }
}

/// Runtime mixing tunables
///
/// Mirrored into [`DeviceInfo`](super::DeviceInfo) atomics once the
/// device is open; this struct is the persisted form and the per-pass
/// snapshot the generation thread works from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Final gain on every output channel
    pub master_volume: f32,
    /// Gain of the LFE path (before master)
    pub lfe_volume: f32,
    /// Gain applied to source samples before panning
    pub base_volume: f32,
    /// Distance reverb delay in seconds
    pub reverb_delay: f32,
    /// Distance reverb feedback per trip around the delay line
    pub reverb_decay: f32,
    /// Send the panned (full-band) signal to the speakers
    pub hf_output: bool,
    /// Send the LFE path to the speakers
    pub lfe_output: bool,
    /// Low-pass the mono distance signal and feed the reverb with it
    pub distance_low_pass: bool,
    /// Low-pass each virtual channel for the LFE path
    pub lfe_low_pass: bool,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            master_volume: 1.0,
            lfe_volume: 1.0,
            base_volume: 1.0,
            reverb_delay: 0.02,
            reverb_decay: 0.1,
            hf_output: true,
            lfe_output: true,
            distance_low_pass: true,
            lfe_low_pass: true,
        }
    }
}

/// Configuration for the audio backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Output device name (None = system default)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    /// Requested sampling rate
    pub sample_rate: u32,

    /// Requested speaker layout
    pub layout: SpeakerLayout,

    /// Preferred block size
    pub buffer_size: BufferSize,

    /// Initial mixing tunables
    pub settings: AudioSettings,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: None,
            sample_rate: DEFAULT_SAMPLE_RATE,
            layout: SpeakerLayout::default(),
            buffer_size: BufferSize::default(),
            settings: AudioSettings::default(),
        }
    }
}

impl AudioConfig {
    /// Set the output device by name
    pub fn with_device(mut self, name: impl Into<String>) -> Self {
        self.device = Some(name.into());
        self
    }

    /// Set the preferred sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }

    /// Set the requested speaker layout
    pub fn with_layout(mut self, layout: SpeakerLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Set the preferred buffer size
    pub fn with_buffer_size(mut self, size: BufferSize) -> Self {
        self.buffer_size = size;
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(self, frames: u32) -> Self {
        self.with_buffer_size(BufferSize::Fixed(frames))
    }

    /// Set the initial mixing tunables
    pub fn with_settings(mut self, settings: AudioSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Block size this config asks the device for
    pub fn requested_block_size(&self) -> u32 {
        self.buffer_size.resolve(self.sample_rate)
    }
}
