//! Device side of the pipeline
//!
//! Two threads meet at a fixed-size ring of interleaved speaker samples:
//!
//! - **Hardware callback**: drains the ring into the device buffer, zeroes
//!   what it drained and signals the condition variable. Never allocates.
//! - **Generation thread**: wakes on that signal, pulls whole blocks from
//!   the [`VirtualSource`], spatializes them and writes them back.
//!
//! Mixing tunables live in [`DeviceInfo`] as independent atomics, readable
//! and writable from any thread.
//!
//! # Example Usage
//!
//! ```ignore
//! use surround_core::audio::{open_backend, AudioConfig, BackendKind, Coordinator, VirtualSource};
//!
//! let config = AudioConfig::default();
//! let handle = open_backend(BackendKind::Cpal, &config)?;
//! let mut coordinator = Coordinator::new(handle, &config.settings);
//!
//! coordinator.start(VirtualSource::new(2, |buffer, frames, rate| {
//!     // fill frames * 2 interleaved samples
//! }))?;
//! coordinator.info().set_volume(0.8, 1.0, 1.0);
//! let source = coordinator.stop();
//! ```

mod backend;
mod config;
mod coordinator;
mod device_info;
mod error;
mod generator;
mod ring;
mod source;

#[cfg(feature = "cpal-backend")]
mod cpal_backend;

#[cfg(feature = "cpal-backend")]
mod device;

// Re-export public API
pub use backend::{open_backend, AudioHandle, ManualBackend};
pub use config::{
    AudioConfig, AudioSettings, BackendKind, BufferSize, MAX_BUFFER_SIZE, MIN_BUFFER_SIZE,
};
pub use coordinator::{BackendState, Coordinator, Diagnostics};
pub use device_info::{DeviceInfo, NegotiatedFormat};
pub use error::{AudioError, AudioResult};
pub use generator::{Generator, GENERATOR_THREAD_NAME};
pub use ring::{RingBuffer, RingShared};
pub use source::{RateCallback, SampleCallback, VirtualSource};

#[cfg(feature = "cpal-backend")]
pub use device::{find_output_device, output_devices, OutputDevice};
