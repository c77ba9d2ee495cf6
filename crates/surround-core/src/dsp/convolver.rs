//! Overlap-add block convolution
//!
//! A designed kernel is held in the frequency domain, padded to
//! `N' = next_pow2(L + B - 1)`. Every `B`-sample chunk of the stream is
//! transformed on its own; its `N'`-long result stays in flight for
//! `depth = ceil(N' / B)` chunks, and each output chunk is the sum of the
//! slices of all in-flight segments that land on it.

use super::fft::{self, Complex32};
use super::fir::{self, FilterError, FilterSpec};
use super::window;

/// Taper applied to each chunk before its transform
///
/// Rectangular: any other value breaks exact reconstruction of the linear
/// convolution, since overlapping tails are summed without a matching
/// synthesis window.
pub const BLOCK_TAPER_ALPHA: f32 = 0.0;

/// Streaming FIR filter using overlap-add
#[derive(Debug, Clone)]
pub struct BlockConvolver {
    spec: FilterSpec,
    block_size: usize,
    kernel_len: usize,
    padded_len: usize,
    /// Kernel spectrum, `padded_len` bins
    kernel: Vec<Complex32>,
    /// Ring of in-flight segments, each `padded_len` long
    segments: Vec<Vec<Complex32>>,
    /// Segment written by the next chunk
    cursor: usize,
}

impl BlockConvolver {
    /// Design the kernel for `spec` and size the segment ring for `block_size`
    pub fn new(spec: &FilterSpec, block_size: usize) -> Result<Self, FilterError> {
        if block_size == 0 {
            return Err(FilterError::ZeroBlockSize);
        }
        let taps = fir::design_window_sinc(spec)?;
        Ok(Self::from_taps(*spec, &taps, block_size))
    }

    fn from_taps(spec: FilterSpec, taps: &[f32], block_size: usize) -> Self {
        let kernel_len = taps.len();
        let padded_len = fft::to_power_of_two(kernel_len + block_size - 1);
        let depth = padded_len.div_ceil(block_size);

        let mut kernel = vec![Complex32::new(0.0, 0.0); padded_len];
        for (bin, &tap) in kernel.iter_mut().zip(taps) {
            bin.re = tap;
        }
        fft::fft(&mut kernel);

        log::debug!(
            "Convolver {:?} {}Hz: L={} B={} N'={} depth={}",
            spec.pass,
            spec.cutoff_hz,
            kernel_len,
            block_size,
            padded_len,
            depth
        );

        Self {
            spec,
            block_size,
            kernel_len,
            padded_len,
            kernel,
            segments: vec![vec![Complex32::new(0.0, 0.0); padded_len]; depth],
            cursor: 0,
        }
    }

    /// Filter `samples` in place, one block at a time
    ///
    /// `samples.len()` should be a multiple of the block size; a trailing
    /// partial block is left as is.
    pub fn apply(&mut self, samples: &mut [f32]) {
        debug_assert!(
            samples.len() % self.block_size == 0,
            "{} samples is not a whole number of {}-sample blocks",
            samples.len(),
            self.block_size
        );
        for chunk in samples.chunks_exact_mut(self.block_size) {
            self.process_block(chunk);
        }
    }

    fn process_block(&mut self, chunk: &mut [f32]) {
        let b = self.block_size;
        let depth = self.segments.len();

        let segment = &mut self.segments[self.cursor];
        for (bin, &s) in segment.iter_mut().zip(chunk.iter()) {
            *bin = Complex32::new(s, 0.0);
        }
        segment[b..].fill(Complex32::new(0.0, 0.0));
        window::tukey(&mut segment[..b], BLOCK_TAPER_ALPHA);

        fft::fft(segment);
        for (bin, k) in segment.iter_mut().zip(&self.kernel) {
            *bin *= k;
        }
        fft::ifft(segment);

        chunk.fill(0.0);
        for age in 0..depth {
            let start = age * b;
            if start >= self.padded_len {
                break;
            }
            let end = (start + b).min(self.padded_len);
            let seg = &self.segments[(self.cursor + depth - age) % depth];
            for (out, bin) in chunk.iter_mut().zip(&seg[start..end]) {
                *out += bin.re;
            }
        }

        self.cursor = (self.cursor + 1) % depth;
    }

    /// Drop all in-flight history
    pub fn reset(&mut self) {
        for segment in &mut self.segments {
            segment.fill(Complex32::new(0.0, 0.0));
        }
        self.cursor = 0;
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn block_size(&self) -> usize {
        self.block_size
    }

    pub fn kernel_len(&self) -> usize {
        self.kernel_len
    }

    pub fn padded_len(&self) -> usize {
        self.padded_len
    }

    /// Number of blocks a chunk's response stays in flight
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}
