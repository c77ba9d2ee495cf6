//! Signal processing building blocks
//!
//! Leaf-first:
//! - **fft**: in-place radix-2 transform over complex buffers
//! - **window**: Tukey, Hamming and Blackman tapers
//! - **fir**: windowed-sinc low/high-pass design
//! - **convolver**: streaming overlap-add FIR over fixed-size blocks
//! - **reverb**: decaying delay line for the distance path

pub mod convolver;
pub mod fft;
pub mod fir;
pub mod reverb;
pub mod window;

pub use convolver::{BlockConvolver, BLOCK_TAPER_ALPHA};
pub use fft::{fft, ifft, to_power_of_two, Complex32};
pub use fir::{
    design_window_sinc, FilterError, FilterSpec, PassType, DEFAULT_TRANSITION_HZ,
    KERNEL_TAPER_ALPHA,
};
pub use reverb::ReverbBuffer;
