//! Radix-2 Cooley-Tukey transform
//!
//! Recursive decimation-in-time FFT/IFFT working in place on a caller-owned
//! buffer. Lengths must be powers of two; callers pad with zeros
//! (see [`to_power_of_two`]).

use std::f32::consts::PI;

use num_complex::Complex;

/// Complex sample used by the transform and the block convolver
pub type Complex32 = Complex<f32>;

/// Next power of two, or `n` itself if it already is one (0 maps to 1)
#[inline]
pub fn to_power_of_two(n: usize) -> usize {
    n.max(1).next_power_of_two()
}

/// Forward transform in place
pub fn fft(data: &mut [Complex32]) {
    debug_assert!(
        data.len() <= 1 || data.len().is_power_of_two(),
        "fft length {} is not a power of two",
        data.len()
    );
    cooley_tukey(data, -1.0);
}

/// Inverse transform in place, output scaled by `1/N`
pub fn ifft(data: &mut [Complex32]) {
    debug_assert!(
        data.len() <= 1 || data.len().is_power_of_two(),
        "ifft length {} is not a power of two",
        data.len()
    );
    cooley_tukey(data, 1.0);

    if data.len() > 1 {
        let scale = 1.0 / data.len() as f32;
        for x in data.iter_mut() {
            *x *= scale;
        }
    }
}

/// `sign` is -1 for the forward transform, +1 for the inverse
fn cooley_tukey(data: &mut [Complex32], sign: f32) {
    let n = data.len();
    if n <= 1 {
        return;
    }

    deinterleave(data);

    let half = n / 2;
    {
        let (even, odd) = data.split_at_mut(half);
        cooley_tukey(even, sign);
        cooley_tukey(odd, sign);
    }

    for k in 0..half {
        let twiddle = Complex32::from_polar(1.0, sign * 2.0 * PI * k as f32 / n as f32);
        let e = data[k];
        let o = twiddle * data[k + half];
        data[k] = e + o;
        data[k + half] = e - o;
    }
}

/// Move even-indexed samples to the first half and odd-indexed ones to the
/// second half, without scratch memory.
///
/// One swap pass leaves each half holding the right samples in the wrong
/// order; recursing on the halves fixes the order.
fn deinterleave(data: &mut [Complex32]) {
    let n = data.len();
    if n <= 2 {
        return;
    }

    let half = n / 2;
    for i in (1..half).step_by(2) {
        data.swap(i, i + half - 1);
    }

    let (lo, hi) = data.split_at_mut(half);
    deinterleave(lo);
    deinterleave(hi);
}
