//! Window functions
//!
//! Applied in place to real taps or complex blocks alike.

use std::f32::consts::PI;
use std::ops::MulAssign;

/// Tukey (tapered cosine) window
///
/// `alpha` is the tapered fraction of the window: 0 leaves the samples
/// untouched (rectangular), 1 is a Hann window.
pub fn tukey<T: MulAssign<f32>>(samples: &mut [T], alpha: f32) {
    let len = samples.len();
    if len < 2 || alpha <= 0.0 {
        return;
    }
    let alpha = alpha.min(1.0);
    let n_max = (len - 1) as f32;
    let taper = alpha * n_max / 2.0;

    for (n, s) in samples.iter_mut().enumerate() {
        let n = n as f32;
        let w = if n < taper {
            0.5 - 0.5 * (PI * n / taper).cos()
        } else if n > n_max - taper {
            0.5 - 0.5 * (PI * (n_max - n) / taper).cos()
        } else {
            1.0
        };
        *s *= w;
    }
}

/// Hamming window
pub fn hamming<T: MulAssign<f32>>(samples: &mut [T]) {
    let len = samples.len();
    if len < 2 {
        return;
    }
    let n_max = (len - 1) as f32;
    for (n, s) in samples.iter_mut().enumerate() {
        *s *= 0.54 - 0.46 * (2.0 * PI * n as f32 / n_max).cos();
    }
}

/// Blackman window
pub fn blackman<T: MulAssign<f32>>(samples: &mut [T]) {
    let len = samples.len();
    if len < 2 {
        return;
    }
    let n_max = (len - 1) as f32;
    for (n, s) in samples.iter_mut().enumerate() {
        let x = n as f32 / n_max;
        *s *= 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos();
    }
}
