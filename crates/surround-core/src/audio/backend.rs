//! Backend selection
//!
//! [`open_backend`] negotiates a format with the chosen backend and returns
//! the handle owning it. Every backend drains the same [`RingShared`]:
//!
//! - **Cpal**: the system output device, drained from CPAL's callback thread
//!   (needs the `cpal-backend` feature)
//! - **Manual**: no device; the caller drains blocks itself with
//!   [`ManualBackend::render`] (offline rendering, tests)

use std::sync::Arc;

use crate::types::MAX_SAMPLE_RATE;

use super::config::{AudioConfig, BackendKind};
use super::device_info::NegotiatedFormat;
use super::error::{AudioError, AudioResult};
use super::ring::RingShared;

/// Handle to an open audio backend
///
/// Keeps the device stream alive. Drop this to close the device.
pub enum AudioHandle {
    /// Caller-driven, device-less backend
    Manual(ManualBackend),

    /// CPAL output stream
    #[cfg(feature = "cpal-backend")]
    Cpal(super::cpal_backend::CpalAudioHandle),
}

impl AudioHandle {
    pub fn kind(&self) -> BackendKind {
        match self {
            AudioHandle::Manual(_) => BackendKind::Manual,
            #[cfg(feature = "cpal-backend")]
            AudioHandle::Cpal(_) => BackendKind::Cpal,
        }
    }

    /// Format granted by the device
    pub fn format(&self) -> NegotiatedFormat {
        match self {
            AudioHandle::Manual(h) => h.format,
            #[cfg(feature = "cpal-backend")]
            AudioHandle::Cpal(h) => h.format(),
        }
    }

    /// Ring drained by this backend's callback
    pub fn shared(&self) -> &Arc<RingShared> {
        match self {
            AudioHandle::Manual(h) => &h.shared,
            #[cfg(feature = "cpal-backend")]
            AudioHandle::Cpal(h) => h.shared(),
        }
    }

    /// Get the sample rate of the audio system
    pub fn sample_rate(&self) -> u32 {
        self.format().sampling_rate
    }

    /// Get the actual buffer size in frames
    pub fn buffer_size(&self) -> u32 {
        self.format().block_size
    }

    /// Get the audio latency of one block in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.format().latency_ms()
    }

    /// The manual backend, if that is what this is
    pub fn as_manual(&self) -> Option<&ManualBackend> {
        match self {
            AudioHandle::Manual(h) => Some(h),
            #[cfg(feature = "cpal-backend")]
            _ => None,
        }
    }

    /// Renegotiate at a new sampling rate
    ///
    /// Only called while the generation thread is stopped. The ring keeps
    /// its old capacity until the next start resets it.
    pub(crate) fn reconfigure(&mut self, sampling_rate: u32) -> AudioResult<NegotiatedFormat> {
        match self {
            AudioHandle::Manual(h) => h.reconfigure(sampling_rate),
            #[cfg(feature = "cpal-backend")]
            AudioHandle::Cpal(h) => h.reconfigure(sampling_rate),
        }
    }
}

impl std::fmt::Debug for AudioHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioHandle")
            .field("kind", &self.kind())
            .field("format", &self.format())
            .finish()
    }
}

/// Open the backend selected by `kind`
pub fn open_backend(kind: BackendKind, config: &AudioConfig) -> AudioResult<AudioHandle> {
    match kind {
        BackendKind::Manual => ManualBackend::open(config).map(AudioHandle::Manual),

        #[cfg(feature = "cpal-backend")]
        BackendKind::Cpal => super::cpal_backend::open(config).map(AudioHandle::Cpal),

        #[cfg(not(feature = "cpal-backend"))]
        BackendKind::Cpal => Err(AudioError::BackendUnavailable(
            "cpal (built without the cpal-backend feature)",
        )),
    }
}

/// Device-less backend: whoever holds it plays the role of the hardware
pub struct ManualBackend {
    shared: Arc<RingShared>,
    format: NegotiatedFormat,
    config: AudioConfig,
}

impl ManualBackend {
    fn open(config: &AudioConfig) -> AudioResult<Self> {
        let format = negotiate_manual(config, config.sample_rate)?;
        log::info!(
            "Manual backend: {} @ {}Hz, {} frames/block",
            format.layout,
            format.sampling_rate,
            format.block_size
        );
        Ok(Self {
            shared: Arc::new(RingShared::new(format.ring_capacity())),
            format,
            config: config.clone(),
        })
    }

    fn reconfigure(&mut self, sampling_rate: u32) -> AudioResult<NegotiatedFormat> {
        self.format = negotiate_manual(&self.config, sampling_rate)?;
        Ok(self.format)
    }

    pub fn format(&self) -> NegotiatedFormat {
        self.format
    }

    /// Play the hardware callback: drain `out.len()` samples
    pub fn render(&self, out: &mut [f32]) {
        self.shared.fill_device(out);
    }

    /// Byte-buffer form of [`render`](Self::render)
    pub fn render_bytes(&self, out: &mut [u8]) {
        self.shared.fill_device_bytes(out);
    }

    /// Drain exactly one hardware block
    pub fn render_block(&self, out: &mut Vec<f32>) {
        out.resize(self.format.block_size as usize * self.format.channels(), 0.0);
        self.render(out);
    }
}

/// The manual backend grants the request, clamped to what the mixer supports
fn negotiate_manual(config: &AudioConfig, sampling_rate: u32) -> AudioResult<NegotiatedFormat> {
    if sampling_rate == 0 {
        return Err(AudioError::ConfigError("Sampling rate must be non-zero".to_string()));
    }
    let granted = sampling_rate.min(MAX_SAMPLE_RATE);
    if granted != sampling_rate {
        log::warn!(
            "Sampling rate {}Hz above maximum, using {}Hz",
            sampling_rate,
            granted
        );
    }
    Ok(NegotiatedFormat {
        layout: config.layout,
        sampling_rate: granted,
        block_size: config.buffer_size.resolve(granted),
    })
}
