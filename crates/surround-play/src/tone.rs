//! Test-tone virtual source
//!
//! One sine voice per virtual channel, each a quarter step above the last,
//! so every position in the virtual panorama is audible on its own.

use std::f32::consts::TAU;

use surround_core::audio::VirtualSource;

/// Phase-continuous sine bank
#[derive(Debug, Clone)]
pub struct ToneSource {
    frequencies: Vec<f32>,
    /// Current phase per voice, radians in [0, 2π)
    phases: Vec<f32>,
    amplitude: f32,
}

impl ToneSource {
    /// `voices` sines starting at `base_hz`
    pub fn new(voices: usize, base_hz: f32, amplitude: f32) -> Self {
        let frequencies = (0..voices)
            .map(|k| base_hz * (1.0 + 0.25 * k as f32))
            .collect();
        Self {
            frequencies,
            phases: vec![0.0; voices],
            amplitude,
        }
    }

    pub fn channels(&self) -> usize {
        self.frequencies.len()
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Write `frames` interleaved frames at `sampling_rate`
    ///
    /// The phase step is taken from the rate on every call, so a reopened
    /// device keeps the same pitch.
    pub fn fill(&mut self, buffer: &mut [f32], frames: usize, sampling_rate: u32) {
        let channels = self.channels();
        if channels == 0 || sampling_rate == 0 {
            buffer.fill(0.0);
            return;
        }
        let rate = sampling_rate as f32;

        for (voice, (&freq, phase)) in self.frequencies.iter().zip(&mut self.phases).enumerate() {
            let step = TAU * freq / rate;
            for frame in buffer.chunks_exact_mut(channels).take(frames) {
                frame[voice] = self.amplitude * phase.sin();
                *phase = (*phase + step) % TAU;
            }
        }
    }

    /// Hand the bank to the mixer as a [`VirtualSource`]
    pub fn into_source(mut self) -> VirtualSource {
        let channels = self.channels();
        VirtualSource::new(channels, move |buffer, frames, rate| {
            self.fill(buffer, frames, rate)
        })
        .with_rate_callback(|rate| log::info!("Tone source now running at {}Hz", rate))
    }
}
