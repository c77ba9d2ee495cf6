//! Spatializer: virtual channels onto physical speakers
//!
//! Each virtual channel sits at a fixed angle around the listener and is
//! panned into every speaker of the layout with a smooth directional gain.
//! Two optional side paths run alongside:
//!
//! - **Distance**: mono sum of all virtual channels, low-passed, fed into a
//!   decaying delay line whose output is added to every channel's sample.
//! - **LFE**: each virtual channel low-passed on its own and routed to the
//!   LFE slot (5.1/7.1) or folded into every speaker (mono/stereo).
//!
//! ```text
//!  virtual ──┬──────────────── × base + reverb ──► pan ──► speakers
//!            ├─► Σ ─► LP 3kHz ─► reverb ─┘
//!            └─► LP 100Hz (per channel) ─► × lfe ──────► LFE
//! ```

use std::f32::consts::PI;

use crate::audio::AudioSettings;
use crate::dsp::{BlockConvolver, FilterError, FilterSpec, ReverbBuffer, DEFAULT_TRANSITION_HZ};
use crate::types::{SpeakerLayout, LFE_CHANNEL, STEREO_ANGLES};

/// Soft-clip drive of the pan law
pub const PAN_DRIVE: f32 = 1.2;

/// Directivity sharpness of the pan law
pub const PAN_DIRECTIVITY: f32 = 2.0;

/// Cutoff of the distance low-pass
pub const DISTANCE_CUTOFF_HZ: f32 = 3000.0;

/// Cutoff of the per-channel LFE low-pass
pub const LFE_CUTOFF_HZ: f32 = 100.0;

/// Directional part of the pan law
#[inline]
fn directivity(source_angle: f32, speaker_angle: f32) -> f32 {
    (PAN_DIRECTIVITY * 0.5 * (source_angle - speaker_angle).cos() - 0.5).exp()
}

/// Gain of `sample` at a source angle as heard from a speaker angle
///
/// `tanh(1.2·s) · exp(cos(θs − θk) − 0.5)`: largest when the angles match,
/// falling smoothly to its minimum when they are opposite.
#[inline]
pub fn pan_gain(sample: f32, source_angle: f32, speaker_angle: f32) -> f32 {
    (PAN_DRIVE * sample).tanh() * directivity(source_angle, speaker_angle)
}

/// Angles (radians) of `count` virtual channels spread around the listener
///
/// Surround layouts start at 22.5°, the others at 45°; the remaining
/// channels are spaced evenly so the last one mirrors the first. A lone
/// channel sits straight ahead.
pub fn virtual_angles(layout: SpeakerLayout, count: usize) -> Vec<f32> {
    if count <= 1 {
        return vec![0.0; count];
    }
    let start = if layout.has_lfe() { 22.5 } else { 45.0 };
    let step = (360.0 - 2.0 * start) / (count - 1) as f32;
    (0..count)
        .map(|j| (start + j as f32 * step) * PI / 180.0)
        .collect()
}

/// Low-pass state of one virtual channel's LFE path
#[derive(Debug)]
struct LfeChannel {
    filter: BlockConvolver,
    samples: Vec<f32>,
}

/// Mixes virtual channels into one speaker layout
#[derive(Debug)]
pub struct Spatializer {
    layout: SpeakerLayout,
    virtual_channels: usize,
    sampling_rate: u32,
    /// `directivity` of virtual channel `j` into speaker `k` at `j * out + k`
    gains: Vec<f32>,
    settings: AudioSettings,
    distance_filter: BlockConvolver,
    distance: Vec<f32>,
    lfe: Vec<LfeChannel>,
    reverb: ReverbBuffer,
}

impl Spatializer {
    /// Design both low-pass filters for the format and pre-size scratch
    /// buffers for `max_frames`
    pub fn new(
        layout: SpeakerLayout,
        virtual_channels: usize,
        sampling_rate: u32,
        block_size: usize,
        max_frames: usize,
        settings: &AudioSettings,
    ) -> Result<Self, FilterError> {
        let distance_filter = BlockConvolver::new(
            &FilterSpec::low_pass(sampling_rate, DISTANCE_CUTOFF_HZ, DEFAULT_TRANSITION_HZ),
            block_size,
        )?;
        let lfe_filter = BlockConvolver::new(
            &FilterSpec::low_pass(sampling_rate, LFE_CUTOFF_HZ, DEFAULT_TRANSITION_HZ),
            block_size,
        )?;
        let lfe = (0..virtual_channels)
            .map(|_| LfeChannel {
                filter: lfe_filter.clone(),
                samples: Vec::with_capacity(max_frames),
            })
            .collect();

        let angles = virtual_angles(layout, virtual_channels);
        let gains = angles
            .iter()
            .flat_map(|&source| speaker_gains(layout, source))
            .collect();

        Ok(Self {
            layout,
            virtual_channels,
            sampling_rate,
            gains,
            settings: *settings,
            distance_filter,
            distance: Vec::with_capacity(max_frames),
            lfe,
            reverb: ReverbBuffer::new(settings.reverb_delay, settings.reverb_decay, sampling_rate),
        })
    }

    pub fn layout(&self) -> SpeakerLayout {
        self.layout
    }

    pub fn virtual_channels(&self) -> usize {
        self.virtual_channels
    }

    pub fn settings(&self) -> &AudioSettings {
        &self.settings
    }

    /// Take a new settings snapshot
    ///
    /// The reverb is rebuilt if its delay or decay moved. A side path that
    /// comes back on starts from silence, not from the history it held when
    /// it was switched off.
    pub fn apply_settings(&mut self, settings: AudioSettings) {
        let old = self.settings;
        if settings.reverb_delay != old.reverb_delay || settings.reverb_decay != old.reverb_decay {
            self.reverb =
                ReverbBuffer::new(settings.reverb_delay, settings.reverb_decay, self.sampling_rate);
        }

        if settings.distance_low_pass && !old.distance_low_pass {
            self.distance_filter.reset();
            self.reverb.clear();
        }

        let lfe_filtered = |s: &AudioSettings| s.lfe_output && s.lfe_low_pass;
        if lfe_filtered(&settings) && !lfe_filtered(&old) {
            for channel in &mut self.lfe {
                channel.filter.reset();
            }
        }

        self.settings = settings;
    }

    /// Clear filter history and the reverb tail
    pub fn reset(&mut self) {
        self.distance_filter.reset();
        for channel in &mut self.lfe {
            channel.filter.reset();
        }
        self.reverb.clear();
    }

    /// Mix interleaved virtual frames into interleaved speaker frames
    ///
    /// Results are accumulated into `output`. The frame count is taken from
    /// `output` and must be a whole number of blocks.
    pub fn process(&mut self, input: &[f32], output: &mut [f32]) {
        let vch = self.virtual_channels;
        let och = self.layout.channels();
        let frames = output.len() / och;
        debug_assert_eq!(input.len(), frames * vch, "input/output frame mismatch");
        if vch == 0 {
            return;
        }

        let s = self.settings;

        if s.distance_low_pass {
            self.distance.clear();
            self.distance
                .extend(input.chunks_exact(vch).take(frames).map(|frame| frame.iter().sum::<f32>()));
            self.distance_filter.apply(&mut self.distance);
        }

        if s.lfe_output && s.lfe_low_pass {
            for (j, channel) in self.lfe.iter_mut().enumerate() {
                channel.samples.clear();
                channel
                    .samples
                    .extend(input.iter().skip(j).step_by(vch).take(frames));
                channel.filter.apply(&mut channel.samples);
            }
        }

        for (f, (frame_in, frame_out)) in input
            .chunks_exact(vch)
            .zip(output.chunks_exact_mut(och))
            .enumerate()
        {
            let reverb = if s.distance_low_pass { self.reverb.step() } else { 0.0 };

            for (j, &v) in frame_in.iter().enumerate() {
                let sample = v * s.base_volume + reverb;

                if s.hf_output {
                    let drive = (PAN_DRIVE * sample * s.master_volume).tanh();
                    let gains = &self.gains[j * och..(j + 1) * och];
                    for (out, g) in frame_out.iter_mut().zip(gains) {
                        *out += drive * g;
                    }
                }

                if s.lfe_output {
                    let low = if s.lfe_low_pass {
                        self.lfe[j].samples[f] * s.base_volume + reverb
                    } else {
                        sample
                    };
                    route_lfe(self.layout, frame_out, low * s.lfe_volume * s.master_volume);
                }
            }

            if s.distance_low_pass {
                self.reverb.add(self.distance[f] * s.base_volume);
            }
        }
    }
}

/// Directivity of one source angle into each speaker of `layout`
fn speaker_gains(layout: SpeakerLayout, source: f32) -> Vec<f32> {
    match layout {
        SpeakerLayout::Mono => {
            vec![directivity(source, STEREO_ANGLES[0]) + directivity(source, STEREO_ANGLES[1])]
        }
        SpeakerLayout::Stereo => STEREO_ANGLES
            .iter()
            .map(|&speaker| directivity(source, speaker))
            .collect(),
        SpeakerLayout::Surround51 | SpeakerLayout::Surround71 => layout
            .angles()
            .iter()
            .enumerate()
            .map(|(k, &speaker)| if k == LFE_CHANNEL { 0.0 } else { directivity(source, speaker) })
            .collect(),
    }
}

/// Add an LFE sample where the layout carries low frequencies
#[inline]
fn route_lfe(layout: SpeakerLayout, frame: &mut [f32], lfe: f32) {
    match layout {
        SpeakerLayout::Mono | SpeakerLayout::Stereo => {
            for out in frame.iter_mut() {
                *out += lfe;
            }
        }
        SpeakerLayout::Surround51 | SpeakerLayout::Surround71 => frame[LFE_CHANNEL] += lfe,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;
    const BLOCK: usize = 256;

    fn quiet_settings() -> AudioSettings {
        AudioSettings {
            distance_low_pass: false,
            lfe_output: false,
            ..AudioSettings::default()
        }
    }

    fn spatializer(layout: SpeakerLayout, vch: usize, settings: &AudioSettings) -> Spatializer {
        Spatializer::new(layout, vch, SR, BLOCK, BLOCK * 3, settings).unwrap()
    }

    fn channel_energy(output: &[f32], channels: usize, k: usize) -> f32 {
        output.iter().skip(k).step_by(channels).map(|x| x * x).sum()
    }

    #[test]
    fn test_pan_gain_peaks_on_axis() {
        let source = 0.7;
        let on_axis = pan_gain(0.5, source, source);
        let opposite = pan_gain(0.5, source, source + PI);
        let mut previous = on_axis;
        for step in 1..=32 {
            let g = pan_gain(0.5, source, source + PI * step as f32 / 32.0);
            assert!(g < previous, "gain must fall as the angle opens (step {})", step);
            assert!(g >= opposite - 1e-6);
            previous = g;
        }
        assert!((opposite - previous).abs() < 1e-6);
        // Symmetric either side of the source
        assert!((pan_gain(0.5, 0.0, 0.3) - pan_gain(0.5, 0.0, -0.3)).abs() < 1e-6);
        assert!((on_axis - (0.6f32).tanh() * 0.5f32.exp()).abs() < 1e-6);
    }

    #[test]
    fn test_pan_gain_of_silence() {
        assert_eq!(pan_gain(0.0, 0.0, 0.0), 0.0);
    }

    #[test]
    fn test_virtual_angles() {
        assert_eq!(virtual_angles(SpeakerLayout::Stereo, 1), vec![0.0]);
        assert!(virtual_angles(SpeakerLayout::Stereo, 0).is_empty());

        let stereo = virtual_angles(SpeakerLayout::Stereo, 2);
        assert!((stereo[0] - 45.0f32.to_radians()).abs() < 1e-6);
        assert!((stereo[1] - 315.0f32.to_radians()).abs() < 1e-5);

        let surround = virtual_angles(SpeakerLayout::Surround51, 3);
        assert!((surround[0] - 22.5f32.to_radians()).abs() < 1e-6);
        assert!((surround[1] - PI).abs() < 1e-5);
        assert!((surround[2] - 337.5f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn test_silence_stays_silent() {
        for layout in SpeakerLayout::ALL {
            let mut mixer = spatializer(layout, 2, &AudioSettings::default());
            let input = vec![0.0f32; BLOCK * 2];
            let mut output = vec![0.0f32; BLOCK * layout.channels()];
            for _ in 0..4 {
                mixer.process(&input, &mut output);
            }
            assert!(output.iter().all(|&x| x == 0.0), "{} produced sound", layout);
        }
    }

    #[test]
    fn test_stereo_follows_source_side() {
        let mut mixer = spatializer(SpeakerLayout::Stereo, 2, &quiet_settings());
        // Only virtual channel 0 (45°, front right) plays
        let input: Vec<f32> = (0..BLOCK).flat_map(|_| [0.5, 0.0]).collect();
        let mut output = vec![0.0f32; BLOCK * 2];
        mixer.process(&input, &mut output);

        let left = channel_energy(&output, 2, 0);
        let right = channel_energy(&output, 2, 1);
        assert!(right > left * 2.0, "right {} left {}", right, left);
    }

    #[test]
    fn test_mono_folds_stereo_pair() {
        let input: Vec<f32> = (0..BLOCK * 3).map(|i| ((i * 31) % 17) as f32 / 17.0 - 0.5).collect();

        let mut stereo = vec![0.0f32; BLOCK * 2];
        spatializer(SpeakerLayout::Stereo, 3, &quiet_settings()).process(&input, &mut stereo);
        let mut mono = vec![0.0f32; BLOCK];
        spatializer(SpeakerLayout::Mono, 3, &quiet_settings()).process(&input, &mut mono);

        for (m, pair) in mono.iter().zip(stereo.chunks_exact(2)) {
            assert!((m - (pair[0] + pair[1])).abs() < 1e-5);
        }
    }

    #[test]
    fn test_surround_lfe_only_reaches_lfe_slot() {
        let settings = AudioSettings {
            hf_output: false,
            lfe_low_pass: false,
            distance_low_pass: false,
            lfe_volume: 0.5,
            ..AudioSettings::default()
        };
        for layout in [SpeakerLayout::Surround51, SpeakerLayout::Surround71] {
            let och = layout.channels();
            let mut mixer = spatializer(layout, 1, &settings);
            let input = vec![0.8f32; BLOCK];
            let mut output = vec![0.0f32; BLOCK * och];
            mixer.process(&input, &mut output);

            for frame in output.chunks_exact(och) {
                for (k, &x) in frame.iter().enumerate() {
                    if k == LFE_CHANNEL {
                        assert!((x - 0.4).abs() < 1e-6);
                    } else {
                        assert_eq!(x, 0.0);
                    }
                }
            }
        }
    }

    #[test]
    fn test_mono_lfe_added_once() {
        let settings = AudioSettings {
            hf_output: false,
            lfe_low_pass: false,
            distance_low_pass: false,
            lfe_volume: 0.5,
            ..AudioSettings::default()
        };
        let mut mixer = spatializer(SpeakerLayout::Mono, 1, &settings);
        let mut output = vec![0.0f32; BLOCK];
        mixer.process(&vec![0.8f32; BLOCK], &mut output);
        assert!(output.iter().all(|&x| (x - 0.4).abs() < 1e-6));
    }

    #[test]
    fn test_surround_never_pans_into_lfe_slot() {
        let mut mixer = spatializer(SpeakerLayout::Surround71, 4, &quiet_settings());
        let input = vec![0.3f32; BLOCK * 4];
        let mut output = vec![0.0f32; BLOCK * 8];
        mixer.process(&input, &mut output);
        assert_eq!(channel_energy(&output, 8, LFE_CHANNEL), 0.0);
        for k in (0..8).filter(|&k| k != LFE_CHANNEL) {
            assert!(channel_energy(&output, 8, k) > 0.0, "speaker {} silent", k);
        }
    }

    #[test]
    fn test_outputs_disabled_is_silent() {
        let settings = AudioSettings {
            hf_output: false,
            lfe_output: false,
            ..AudioSettings::default()
        };
        let mut mixer = spatializer(SpeakerLayout::Stereo, 2, &settings);
        let input = vec![0.9f32; BLOCK * 2];
        let mut output = vec![0.0f32; BLOCK * 2];
        mixer.process(&input, &mut output);
        assert!(output.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_reverb_tail_reaches_every_speaker() {
        let settings = AudioSettings {
            reverb_delay: BLOCK as f32 / SR as f32,
            reverb_decay: 0.5,
            lfe_output: false,
            ..AudioSettings::default()
        };
        let layout = SpeakerLayout::Surround51;
        let mut mixer = spatializer(layout, 1, &settings);
        assert_eq!(mixer.reverb.len(), BLOCK);

        let mut output = vec![0.0f32; BLOCK * 6];
        mixer.process(&vec![0.5f32; BLOCK], &mut output);

        // Silent input: whatever comes out is the echo of the first block
        let mut tail = vec![0.0f32; BLOCK * 6];
        mixer.process(&vec![0.0f32; BLOCK], &mut tail);
        for k in (0..6).filter(|&k| k != LFE_CHANNEL) {
            assert!(channel_energy(&tail, 6, k) > 1e-3, "speaker {} got no reverb", k);
        }
    }

    #[test]
    fn test_reenabled_paths_start_from_silence() {
        let distance_only = AudioSettings {
            reverb_delay: BLOCK as f32 / SR as f32,
            reverb_decay: 0.5,
            lfe_output: false,
            ..AudioSettings::default()
        };
        let lfe_only = AudioSettings {
            hf_output: false,
            distance_low_pass: false,
            ..AudioSettings::default()
        };

        for (on, off) in [
            (distance_only, AudioSettings { distance_low_pass: false, ..distance_only }),
            (lfe_only, AudioSettings { lfe_low_pass: false, ..lfe_only }),
        ] {
            let mut mixer = spatializer(SpeakerLayout::Stereo, 1, &on);
            let mut output = vec![0.0f32; BLOCK * 2];
            mixer.process(&vec![0.8f32; BLOCK], &mut output);
            assert!(output.iter().any(|&x| x != 0.0));

            let silence = vec![0.0f32; BLOCK];
            mixer.apply_settings(off);
            let mut output = vec![0.0f32; BLOCK * 2];
            mixer.process(&silence, &mut output);
            assert!(output.iter().all(|&x| x == 0.0));

            // Whatever was in flight when the path went off is gone
            mixer.apply_settings(on);
            let mut output = vec![0.0f32; BLOCK * 2];
            mixer.process(&silence, &mut output);
            assert!(output.iter().all(|&x| x == 0.0), "stale tail: {:?}", &output[..4]);
        }
    }

    #[test]
    fn test_apply_settings_rebuilds_reverb() {
        let mut mixer = spatializer(SpeakerLayout::Stereo, 2, &AudioSettings::default());
        assert_eq!(mixer.reverb.len(), 882);

        mixer.apply_settings(AudioSettings {
            master_volume: 0.5,
            ..AudioSettings::default()
        });
        assert_eq!(mixer.reverb.len(), 882);
        assert_eq!(mixer.settings().master_volume, 0.5);

        mixer.apply_settings(AudioSettings {
            reverb_delay: 0.1,
            ..AudioSettings::default()
        });
        assert_eq!(mixer.reverb.len(), 4410);
    }
}
