//! Top-level owner of the audio backend
//!
//! Created once on init and consumed on shutdown; every runtime control an
//! application needs goes through here.

use std::sync::Arc;

use crate::audio::{
    open_backend, AudioConfig, AudioHandle, AudioResult, AudioSettings, BackendKind, BackendState,
    Coordinator, DeviceInfo, Diagnostics, NegotiatedFormat, VirtualSource,
};

/// Exclusive owner of the open backend and its generation thread
pub struct HardwareContext {
    coordinator: Coordinator,
    config: AudioConfig,
}

impl HardwareContext {
    /// Open the backend and negotiate the device format
    ///
    /// The granted format may differ from `config`; see [`format`](Self::format).
    pub fn init(kind: BackendKind, config: AudioConfig) -> AudioResult<Self> {
        let handle = open_backend(kind, &config)?;
        let format = handle.format();
        if format.sampling_rate != config.sample_rate || format.layout != config.layout {
            log::info!(
                "Requested {} @ {}Hz, granted {} @ {}Hz",
                config.layout,
                config.sample_rate,
                format.layout,
                format.sampling_rate
            );
        }
        let coordinator = Coordinator::new(handle, &config.settings);
        Ok(Self { coordinator, config })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mixing controls (applied by the generator on its next pass)
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_volume(&self, master: f32, lfe: f32, base: f32) {
        self.device_info().set_volume(master, lfe, base);
    }

    pub fn set_reverb(&self, delay_seconds: f32, decay: f32) {
        self.device_info().set_reverb(delay_seconds, decay);
    }

    /// Enable the panned (`hf`) and LFE (`lfe`) outputs
    pub fn set_output_channels(&self, hf: bool, lfe: bool) {
        self.device_info().set_output_channels(hf, lfe);
    }

    /// Enable the distance and LFE low-pass paths
    pub fn set_filters(&self, distance_low_pass: bool, lfe_low_pass: bool) {
        self.device_info().set_filters(distance_low_pass, lfe_low_pass);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────

    /// Change sampling rate; restarts a running source on the new format
    ///
    /// The persisted config only takes the new rate once the device accepted it.
    pub fn set_sampling_rate(&mut self, sampling_rate: u32) -> AudioResult<NegotiatedFormat> {
        let format = self.coordinator.reinit(sampling_rate)?;
        self.config.sample_rate = sampling_rate;
        Ok(format)
    }

    pub fn start_audio(&mut self, source: VirtualSource) -> AudioResult<()> {
        self.coordinator.start(source)
    }

    /// Stop generation and get the source back
    pub fn stop_audio(&mut self) -> Option<VirtualSource> {
        self.coordinator.stop()
    }

    /// Stop generation and close the device
    pub fn shutdown(mut self) -> Option<VirtualSource> {
        let source = self.coordinator.stop();
        log::info!("Audio shut down");
        source
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    pub fn format(&self) -> NegotiatedFormat {
        self.coordinator.format()
    }

    pub fn state(&self) -> BackendState {
        self.coordinator.state()
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.coordinator.diagnostics()
    }

    pub fn device_info(&self) -> &Arc<DeviceInfo> {
        self.coordinator.info()
    }

    pub fn handle(&self) -> &AudioHandle {
        self.coordinator.handle()
    }

    /// Current tunables
    pub fn settings(&self) -> AudioSettings {
        self.device_info().settings()
    }

    /// The config to persist: as requested, with the current tunables
    pub fn config(&self) -> AudioConfig {
        AudioConfig {
            settings: self.settings(),
            ..self.config.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpeakerLayout;

    #[test]
    fn test_controls_reach_device_info() {
        let ctx = HardwareContext::init(BackendKind::Manual, AudioConfig::default()).unwrap();
        ctx.set_volume(0.5, 0.75, 0.9);
        ctx.set_reverb(0.05, 0.3);
        ctx.set_output_channels(true, false);
        ctx.set_filters(false, true);

        let s = ctx.settings();
        assert_eq!((s.master_volume, s.lfe_volume, s.base_volume), (0.5, 0.75, 0.9));
        assert_eq!((s.reverb_delay, s.reverb_decay), (0.05, 0.3));
        assert!(s.hf_output && !s.lfe_output);
        assert!(!s.distance_low_pass && s.lfe_low_pass);
        assert!(ctx.device_info().settings_changed());

        // Persisted config carries the live tunables
        assert_eq!(ctx.config().settings, s);
    }

    #[test]
    fn test_init_reports_granted_format() {
        let config = AudioConfig::default()
            .with_sample_rate(22050)
            .with_layout(SpeakerLayout::Mono);
        let ctx = HardwareContext::init(BackendKind::Manual, config).unwrap();
        let format = ctx.format();
        assert_eq!(format.layout, SpeakerLayout::Mono);
        assert_eq!(format.sampling_rate, 22050);
        assert_eq!(format.block_size, 512);
        assert_eq!(ctx.state(), BackendState::Stopped);
    }

    #[test]
    fn test_shutdown_returns_source() {
        let mut ctx = HardwareContext::init(BackendKind::Manual, AudioConfig::default()).unwrap();
        ctx.start_audio(VirtualSource::silent(2)).unwrap();
        assert_eq!(ctx.state(), BackendState::Running);
        assert_eq!(ctx.shutdown().map(|s| s.channels()), Some(2));
    }

    #[test]
    fn test_set_sampling_rate_updates_config() {
        let mut ctx = HardwareContext::init(BackendKind::Manual, AudioConfig::default()).unwrap();
        ctx.set_sampling_rate(48000).unwrap();
        assert_eq!(ctx.config().sample_rate, 48000);
        assert_eq!(ctx.format().sampling_rate, 48000);
    }

    #[test]
    fn test_failed_rate_switch_not_persisted() {
        let mut ctx = HardwareContext::init(BackendKind::Manual, AudioConfig::default()).unwrap();
        ctx.start_audio(VirtualSource::silent(2)).unwrap();

        assert!(ctx.set_sampling_rate(0).is_err());
        assert_eq!(ctx.config().sample_rate, 44100);

        // Restart fails on the new format: also not persisted, source kept
        assert!(ctx.set_sampling_rate(4000).is_err());
        assert_eq!(ctx.config().sample_rate, 44100);
        assert_eq!(ctx.stop_audio().map(|s| s.channels()), Some(2));
    }
}
