//! CPAL audio backend implementation
//!
//! Opens one F32 output stream whose callback does nothing but drain the
//! shared ring:
//!
//! ```text
//! ┌──────────────────┐  write   ┌─────────────┐  fill_device  ┌─────────────────┐
//! │ Generation thread│─────────►│ RingShared  │──────────────►│ CPAL callback   │
//! │  (surround-gen)  │◄─────────│ (4 blocks)  │               │ (device thread) │
//! └──────────────────┘  notify  └─────────────┘               └─────────────────┘
//! ```
//!
//! The stream keeps playing while the generator is stopped; an empty ring
//! simply plays silence.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig, SupportedBufferSize};

use crate::types::{SpeakerLayout, SAMPLING_RATES};

use super::config::AudioConfig;
use super::device::find_output_device;
use super::device_info::NegotiatedFormat;
use super::error::{AudioError, AudioResult};
use super::ring::RingShared;

/// CPAL-specific audio handle
///
/// Keeps the output stream alive. Drop this to stop audio.
pub struct CpalAudioHandle {
    device: cpal::Device,
    config: AudioConfig,
    /// None only after a failed reconfigure
    stream: Option<Stream>,
    shared: Arc<RingShared>,
    format: NegotiatedFormat,
}

impl CpalAudioHandle {
    pub fn format(&self) -> NegotiatedFormat {
        self.format
    }

    pub fn shared(&self) -> &Arc<RingShared> {
        &self.shared
    }

    /// Tear the stream down and rebuild it at `sampling_rate`
    pub(crate) fn reconfigure(&mut self, sampling_rate: u32) -> AudioResult<NegotiatedFormat> {
        // Exclusive devices refuse a second stream, so drop the old one first
        self.stream = None;

        let (stream_config, format) = get_output_config(&self.device, &self.config, sampling_rate)?;
        let stream = build_output_stream(&self.device, &stream_config, self.shared.clone())?;
        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

        log::info!(
            "Audio stream reconfigured: {} @ {}Hz, {} frames",
            format.layout,
            format.sampling_rate,
            format.block_size
        );
        self.stream = Some(stream);
        self.format = format;
        Ok(format)
    }
}

/// Open the configured (or default) output device and start its stream
pub fn open(config: &AudioConfig) -> AudioResult<CpalAudioHandle> {
    let device = find_output_device(config.device.as_deref())?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Using audio device: {}", device_name);

    let (stream_config, format) = get_output_config(&device, config, config.sample_rate)?;

    log::info!(
        "Audio config: {} ({} channels), {}Hz, {} frames (~{:.1}ms latency)",
        format.layout,
        stream_config.channels,
        format.sampling_rate,
        format.block_size,
        format.latency_ms()
    );

    let shared = Arc::new(RingShared::new(format.ring_capacity()));
    let stream = build_output_stream(&device, &stream_config, shared.clone())?;
    stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(e.to_string()))?;

    log::info!("Audio stream started");

    Ok(CpalAudioHandle {
        device,
        config: config.clone(),
        stream: Some(stream),
        shared,
        format,
    })
}

/// Preference order of a supported range for `wanted` channels
///
/// Exact layout first, then the nearest wider layout, then the nearest
/// narrower one; within that, ranges covering the requested rate win.
fn rank(range: &cpal::SupportedStreamConfigRange, wanted: usize, sampling_rate: u32) -> (u8, usize, bool) {
    let channels = range.channels() as usize;
    let rate_ok =
        sampling_rate >= range.min_sample_rate().0 && sampling_rate <= range.max_sample_rate().0;
    let (class, distance) = match channels.cmp(&wanted) {
        std::cmp::Ordering::Equal => (0, 0),
        std::cmp::Ordering::Greater => (1, channels - wanted),
        std::cmp::Ordering::Less => (2, wanted - channels),
    };
    (class, distance, !rate_ok)
}

/// Pick the device configuration closest to the request
///
/// Returns the stream config to open and the format it grants.
fn get_output_config(
    device: &cpal::Device,
    config: &AudioConfig,
    sampling_rate: u32,
) -> AudioResult<(StreamConfig, NegotiatedFormat)> {
    let supported_configs: Vec<_> = device
        .supported_output_configs()
        .map_err(|e| AudioError::ConfigError(e.to_string()))?
        .collect();

    let first = supported_configs.first().ok_or_else(|| {
        AudioError::ConfigError("No supported output configurations".to_string())
    })?;

    let f32_configs: Vec<_> = supported_configs
        .iter()
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .collect();
    if f32_configs.is_empty() {
        return Err(AudioError::UnsupportedFormat(format!("{:?}", first.sample_format())));
    }

    let wanted = config.layout.channels();
    let best = f32_configs
        .iter()
        .filter(|c| SpeakerLayout::from_channels(c.channels() as usize).is_some())
        .min_by_key(|c| rank(c, wanted, sampling_rate))
        .ok_or(AudioError::UnsupportedLayout(f32_configs[0].channels() as usize))?;

    let channels = best.channels() as usize;
    let layout =
        SpeakerLayout::from_channels(channels).ok_or(AudioError::UnsupportedLayout(channels))?;
    if layout != config.layout {
        log::warn!(
            "Audio device doesn't offer {}, mixing for {} instead",
            config.layout,
            layout
        );
    }

    let min_rate = best.min_sample_rate().0;
    let max_rate = best.max_sample_rate().0;
    let granted_rate = if (min_rate..=max_rate).contains(&sampling_rate) {
        sampling_rate
    } else {
        // Closest tabled rate the device takes, else the nearest edge of its range
        let fallback = SAMPLING_RATES
            .iter()
            .map(|(rate, _)| *rate)
            .filter(|rate| (min_rate..=max_rate).contains(rate))
            .min_by_key(|rate| rate.abs_diff(sampling_rate))
            .unwrap_or_else(|| sampling_rate.clamp(min_rate, max_rate));
        log::warn!(
            "Audio device doesn't support {}Hz, falling back to {}Hz",
            sampling_rate,
            fallback
        );
        fallback
    };

    let requested_block = config.buffer_size.resolve(granted_rate);
    let block_size = match best.buffer_size() {
        SupportedBufferSize::Range { min, max } => requested_block.clamp(*min, *max),
        SupportedBufferSize::Unknown => requested_block,
    };
    if block_size != requested_block {
        log::warn!(
            "Audio device doesn't take {} frame blocks, using {}",
            requested_block,
            block_size
        );
    }
    log::debug!(
        "Selected buffer size: {} frames for {:?}",
        block_size,
        config.buffer_size
    );

    let stream_config = StreamConfig {
        channels: best.channels(),
        sample_rate: cpal::SampleRate(granted_rate),
        buffer_size: CpalBufferSize::Fixed(block_size),
    };
    let format = NegotiatedFormat {
        layout,
        sampling_rate: granted_rate,
        block_size,
    };
    Ok((stream_config, format))
}

/// Build the output stream; the callback only drains the ring
fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: Arc<RingShared>,
) -> AudioResult<Stream> {
    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                shared.fill_device(data);
            },
            move |err| {
                log::error!("Audio stream error: {}", err);
            },
            None, // No timeout (blocking)
        )
        .map_err(|e| AudioError::StreamBuildError(e.to_string()))?;

    Ok(stream)
}
