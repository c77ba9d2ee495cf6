//! Audio backend error types

use thiserror::Error;

use crate::dsp::FilterError;

/// Errors that can occur while opening, starting or reconfiguring audio
#[derive(Error, Debug)]
pub enum AudioError {
    /// No audio devices available
    #[error("No audio output devices found")]
    NoDevices,

    /// Device not found
    #[error("Audio device not found: {0}")]
    DeviceNotFound(String),

    /// Failed to get or negotiate device configuration
    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    /// Failed to build audio stream
    #[error("Failed to build audio stream: {0}")]
    StreamBuildError(String),

    /// Failed to start/pause stream
    #[error("Failed to start audio stream: {0}")]
    StreamPlayError(String),

    /// Device only offers non-F32 samples
    #[error("Unsupported sample format: {0}")]
    UnsupportedFormat(String),

    /// Granted channel count maps to none of mono/stereo/5.1/7.1
    #[error("Unsupported speaker layout: {0} channels")]
    UnsupportedLayout(usize),

    /// Distance or LFE filter could not be designed for the negotiated format
    #[error("Invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    /// Virtual source declares zero channels
    #[error("Virtual source has no channels")]
    EmptySource,

    /// Start requested while the generation thread is alive
    #[error("Audio is already running")]
    AlreadyRunning,

    /// Backend compiled out (e.g. cpal without the `cpal-backend` feature)
    #[error("Audio backend unavailable: {0}")]
    BackendUnavailable(&'static str),

    /// Could not spawn the generation thread
    #[error("Failed to spawn generation thread: {0}")]
    ThreadSpawn(#[from] std::io::Error),
}

/// Result type for audio operations
pub type AudioResult<T> = Result<T, AudioError>;
