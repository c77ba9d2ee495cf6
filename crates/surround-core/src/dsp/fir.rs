//! Windowed-sinc FIR design
//!
//! Builds the impulse response of a low- or high-pass filter from a cutoff
//! and a transition bandwidth. Kernel length follows `N ≈ 4 / BW` (rounded
//! up to odd so there is a centre tap), the sinc is tapered with a Tukey
//! window and normalised to unit DC gain.

use std::f32::consts::PI;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::window;

/// Tapered fraction of the Tukey window applied to designed kernels
pub const KERNEL_TAPER_ALPHA: f32 = 0.5;

/// Transition bandwidth used for the built-in distance and LFE filters
pub const DEFAULT_TRANSITION_HZ: f32 = 750.0;

/// Filter pass type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PassType {
    #[default]
    LowPass,
    HighPass,
}

/// Invalid filter configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Sampling rate must be non-zero")]
    ZeroSamplingRate,

    #[error("Cutoff {cutoff_hz}Hz outside (0, {nyquist}Hz)")]
    CutoffOutOfRange { cutoff_hz: f32, nyquist: f32 },

    #[error("Transition bandwidth {transition_hz}Hz outside (0, {nyquist}Hz)")]
    TransitionOutOfRange { transition_hz: f32, nyquist: f32 },

    #[error("Block size must be non-zero")]
    ZeroBlockSize,
}

/// Parameters of a windowed-sinc filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub sampling_rate: u32,
    pub cutoff_hz: f32,
    pub transition_hz: f32,
    pub pass: PassType,
}

impl FilterSpec {
    pub fn low_pass(sampling_rate: u32, cutoff_hz: f32, transition_hz: f32) -> Self {
        Self {
            sampling_rate,
            cutoff_hz,
            transition_hz,
            pass: PassType::LowPass,
        }
    }

    pub fn high_pass(sampling_rate: u32, cutoff_hz: f32, transition_hz: f32) -> Self {
        Self {
            pass: PassType::HighPass,
            ..Self::low_pass(sampling_rate, cutoff_hz, transition_hz)
        }
    }

    /// Reject anything that would produce an empty or non-finite kernel
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.sampling_rate == 0 {
            return Err(FilterError::ZeroSamplingRate);
        }
        let nyquist = self.sampling_rate as f32 / 2.0;
        if !(self.cutoff_hz > 0.0 && self.cutoff_hz < nyquist) {
            return Err(FilterError::CutoffOutOfRange {
                cutoff_hz: self.cutoff_hz,
                nyquist,
            });
        }
        if !(self.transition_hz > 0.0 && self.transition_hz < nyquist) {
            return Err(FilterError::TransitionOutOfRange {
                transition_hz: self.transition_hz,
                nyquist,
            });
        }
        Ok(())
    }

    /// Number of taps the design will produce (always odd)
    pub fn kernel_len(&self) -> usize {
        let bw = self.transition_hz / self.sampling_rate as f32;
        let n = (4.0 / bw).ceil() as usize;
        if n % 2 == 0 {
            n + 1
        } else {
            n
        }
    }
}

/// Design the impulse response for `spec`
pub fn design_window_sinc(spec: &FilterSpec) -> Result<Vec<f32>, FilterError> {
    spec.validate()?;

    let sr = spec.sampling_rate as f32;
    // High-pass is designed as a low-pass mirrored around Nyquist, then inverted
    let fc = match spec.pass {
        PassType::LowPass => spec.cutoff_hz / sr,
        PassType::HighPass => 0.5 - spec.cutoff_hz / sr,
    };

    let len = spec.kernel_len();
    let centre = (len - 1) / 2;

    let mut taps: Vec<f32> = (0..len)
        .map(|n| {
            if n == centre {
                2.0 * fc
            } else {
                let x = n as f32 - centre as f32;
                (2.0 * PI * fc * x).sin() / (PI * x)
            }
        })
        .collect();

    window::tukey(&mut taps, KERNEL_TAPER_ALPHA);

    let sum: f32 = taps.iter().sum();
    for t in taps.iter_mut() {
        *t /= sum;
    }

    if spec.pass == PassType::HighPass {
        for t in taps.iter_mut().skip(1).step_by(2) {
            *t = -*t;
        }
    }

    Ok(taps)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Magnitude response of `taps` at `freq` Hz
    fn response(taps: &[f32], freq: f32, sr: f32) -> f32 {
        let w = 2.0 * PI * freq / sr;
        let (re, im) = taps.iter().enumerate().fold((0.0f32, 0.0f32), |(re, im), (n, &t)| {
            (re + t * (w * n as f32).cos(), im - t * (w * n as f32).sin())
        });
        (re * re + im * im).sqrt()
    }

    #[test]
    fn test_low_pass_unit_dc_gain() {
        for (sr, cutoff) in [(44100, 3000.0), (44100, 100.0), (48000, 1000.0), (96000, 3000.0)] {
            let taps = design_window_sinc(&FilterSpec::low_pass(sr, cutoff, 750.0)).unwrap();
            let sum: f32 = taps.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "sr {} cutoff {}: sum {}", sr, cutoff, sum);
        }
    }

    #[test]
    fn test_kernel_length_is_odd() {
        // 44100 / 750 * 4 = 235.2 -> 236 -> 237
        let spec = FilterSpec::low_pass(44100, 3000.0, 750.0);
        assert_eq!(spec.kernel_len(), 237);
        // 4 / (1000 / 48000) = 192 -> 193
        assert_eq!(FilterSpec::low_pass(48000, 3000.0, 1000.0).kernel_len(), 193);

        let taps = design_window_sinc(&spec).unwrap();
        assert_eq!(taps.len(), 237);
        // Linear phase: symmetric around the centre tap
        for i in 0..taps.len() {
            assert!((taps[i] - taps[taps.len() - 1 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_low_pass_response() {
        let sr = 44100.0;
        let taps = design_window_sinc(&FilterSpec::low_pass(44100, 3000.0, 750.0)).unwrap();
        assert!((response(&taps, 300.0, sr) - 1.0).abs() < 0.05);
        assert!(response(&taps, 8000.0, sr) < 0.01);
    }

    #[test]
    fn test_high_pass_response() {
        let sr = 44100.0;
        let taps = design_window_sinc(&FilterSpec::high_pass(44100, 3000.0, 750.0)).unwrap();
        assert!(response(&taps, 0.0, sr) < 0.01);
        assert!(response(&taps, 300.0, sr) < 0.01);
        assert!((response(&taps, 15000.0, sr) - 1.0).abs() < 0.05);
    }

    #[test]
    fn test_rejects_out_of_range_parameters() {
        assert_eq!(
            design_window_sinc(&FilterSpec::low_pass(0, 100.0, 750.0)),
            Err(FilterError::ZeroSamplingRate)
        );
        assert!(matches!(
            design_window_sinc(&FilterSpec::low_pass(44100, 0.0, 750.0)),
            Err(FilterError::CutoffOutOfRange { .. })
        ));
        assert!(matches!(
            design_window_sinc(&FilterSpec::low_pass(44100, 22050.0, 750.0)),
            Err(FilterError::CutoffOutOfRange { .. })
        ));
        assert!(matches!(
            design_window_sinc(&FilterSpec::low_pass(44100, 3000.0, -1.0)),
            Err(FilterError::TransitionOutOfRange { .. })
        ));
        assert!(matches!(
            design_window_sinc(&FilterSpec::low_pass(44100, f32::NAN, 750.0)),
            Err(FilterError::CutoffOutOfRange { .. })
        ));
    }
}
