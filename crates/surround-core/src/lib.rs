//! Surround Core - real-time spatial mixing pipeline
//!
//! Turns a multichannel virtual source into a filtered, panned,
//! speaker-layout-correct stream for an audio device.

pub mod audio;
pub mod context;
pub mod dsp;
pub mod mixer;
pub mod types;

pub use context::HardwareContext;
pub use types::*;
