//! Negotiated device format and the shared mixing tunables
//!
//! Every tunable is its own atomic. Writers store the value and then raise
//! `settings_changed`; the generation thread clears the flag and re-reads
//! everything once per pass. A writer racing that read may land half of a
//! multi-field update in one pass and the rest in the next, which is
//! accepted in exchange for never locking on the audio path.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

use crate::types::{SpeakerLayout, RING_BLOCKS};

use super::config::AudioSettings;

/// Format actually granted by the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub layout: SpeakerLayout,
    pub sampling_rate: u32,
    /// Hardware block size in frames
    pub block_size: u32,
}

impl NegotiatedFormat {
    /// Interleaved channels per frame
    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Ring buffer size in samples (jitter headroom of `RING_BLOCKS` blocks)
    pub fn ring_capacity(&self) -> usize {
        RING_BLOCKS * self.block_size as usize * self.channels()
    }

    /// One-way latency of a single hardware block
    pub fn latency_ms(&self) -> f32 {
        (self.block_size as f32 / self.sampling_rate as f32) * 1000.0
    }
}

/// f32 stored as its bit pattern
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(value: f32) -> Self {
        Self(AtomicU32::new(value.to_bits()))
    }

    #[inline]
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    #[inline]
    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Shared device state
#[derive(Debug)]
pub struct DeviceInfo {
    channels: AtomicUsize,
    sampling_rate: AtomicU32,
    block_size: AtomicU32,

    master_volume: AtomicF32,
    lfe_volume: AtomicF32,
    base_volume: AtomicF32,
    reverb_delay: AtomicF32,
    reverb_decay: AtomicF32,
    hf_output: AtomicBool,
    lfe_output: AtomicBool,
    distance_low_pass: AtomicBool,
    lfe_low_pass: AtomicBool,

    settings_changed: AtomicBool,
}

impl DeviceInfo {
    pub fn new(format: NegotiatedFormat, settings: &AudioSettings) -> Self {
        Self {
            channels: AtomicUsize::new(format.channels()),
            sampling_rate: AtomicU32::new(format.sampling_rate),
            block_size: AtomicU32::new(format.block_size),
            master_volume: AtomicF32::new(settings.master_volume),
            lfe_volume: AtomicF32::new(settings.lfe_volume),
            base_volume: AtomicF32::new(settings.base_volume),
            reverb_delay: AtomicF32::new(settings.reverb_delay),
            reverb_decay: AtomicF32::new(settings.reverb_decay),
            hf_output: AtomicBool::new(settings.hf_output),
            lfe_output: AtomicBool::new(settings.lfe_output),
            distance_low_pass: AtomicBool::new(settings.distance_low_pass),
            lfe_low_pass: AtomicBool::new(settings.lfe_low_pass),
            settings_changed: AtomicBool::new(false),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Format (written only by the coordinator while stopped)
    // ─────────────────────────────────────────────────────────────────────

    pub fn format(&self) -> NegotiatedFormat {
        let channels = self.channels.load(Ordering::Acquire);
        NegotiatedFormat {
            layout: SpeakerLayout::from_channels(channels).unwrap_or_default(),
            sampling_rate: self.sampling_rate.load(Ordering::Acquire),
            block_size: self.block_size.load(Ordering::Acquire),
        }
    }

    pub(crate) fn set_format(&self, format: NegotiatedFormat) {
        self.sampling_rate.store(format.sampling_rate, Ordering::Release);
        self.block_size.store(format.block_size, Ordering::Release);
        self.channels.store(format.channels(), Ordering::Release);
    }

    #[inline]
    pub fn sampling_rate(&self) -> u32 {
        self.sampling_rate.load(Ordering::Acquire)
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels.load(Ordering::Acquire)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Tunables (any thread)
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_volume(&self, master: f32, lfe: f32, base: f32) {
        self.master_volume.store(master);
        self.lfe_volume.store(lfe);
        self.base_volume.store(base);
        self.mark_changed();
    }

    pub fn set_reverb(&self, delay_seconds: f32, decay: f32) {
        self.reverb_delay.store(delay_seconds);
        self.reverb_decay.store(decay);
        self.mark_changed();
    }

    /// Gate the panned signal (`hf`) and the LFE path (`lfe`)
    pub fn set_output_channels(&self, hf: bool, lfe: bool) {
        self.hf_output.store(hf, Ordering::Relaxed);
        self.lfe_output.store(lfe, Ordering::Relaxed);
        self.mark_changed();
    }

    pub fn set_filters(&self, distance_low_pass: bool, lfe_low_pass: bool) {
        self.distance_low_pass.store(distance_low_pass, Ordering::Relaxed);
        self.lfe_low_pass.store(lfe_low_pass, Ordering::Relaxed);
        self.mark_changed();
    }

    /// Store every tunable at once
    pub fn set_settings(&self, settings: &AudioSettings) {
        self.set_volume(settings.master_volume, settings.lfe_volume, settings.base_volume);
        self.set_reverb(settings.reverb_delay, settings.reverb_decay);
        self.set_output_channels(settings.hf_output, settings.lfe_output);
        self.set_filters(settings.distance_low_pass, settings.lfe_low_pass);
    }

    /// Read every tunable (not atomic as a set)
    pub fn settings(&self) -> AudioSettings {
        AudioSettings {
            master_volume: self.master_volume.load(),
            lfe_volume: self.lfe_volume.load(),
            base_volume: self.base_volume.load(),
            reverb_delay: self.reverb_delay.load(),
            reverb_decay: self.reverb_decay.load(),
            hf_output: self.hf_output.load(Ordering::Relaxed),
            lfe_output: self.lfe_output.load(Ordering::Relaxed),
            distance_low_pass: self.distance_low_pass.load(Ordering::Relaxed),
            lfe_low_pass: self.lfe_low_pass.load(Ordering::Relaxed),
        }
    }

    #[inline]
    fn mark_changed(&self) {
        self.settings_changed.store(true, Ordering::Release);
    }

    /// Snapshot of the tunables if anything changed since the last call
    pub fn take_changed_settings(&self) -> Option<AudioSettings> {
        if self.settings_changed.swap(false, Ordering::AcqRel) {
            Some(self.settings())
        } else {
            None
        }
    }

    pub fn settings_changed(&self) -> bool {
        self.settings_changed.load(Ordering::Acquire)
    }
}
