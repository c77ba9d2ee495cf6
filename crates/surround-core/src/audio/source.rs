//! The external signal generator feeding the pipeline

/// Fills `frames × channels` interleaved samples at the given sampling rate
pub type SampleCallback = Box<dyn FnMut(&mut [f32], usize, u32) + Send>;

/// Told about a new sampling rate after the device was reopened
pub type RateCallback = Box<dyn FnMut(u32) + Send>;

/// Pre-mix multichannel source
///
/// Moved into the generation thread while audio runs and handed back when
/// the thread is joined, so the caller owns it again once audio stops.
pub struct VirtualSource {
    channels: usize,
    on_samples: SampleCallback,
    on_rate_change: Option<RateCallback>,
}

impl VirtualSource {
    pub fn new<F>(channels: usize, on_samples: F) -> Self
    where
        F: FnMut(&mut [f32], usize, u32) + Send + 'static,
    {
        Self {
            channels,
            on_samples: Box::new(on_samples),
            on_rate_change: None,
        }
    }

    /// Register the sampling-rate change notification
    pub fn with_rate_callback<F>(mut self, on_rate_change: F) -> Self
    where
        F: FnMut(u32) + Send + 'static,
    {
        self.on_rate_change = Some(Box::new(on_rate_change));
        self
    }

    /// A source that only ever produces silence
    pub fn silent(channels: usize) -> Self {
        Self::new(channels, |buffer, _, _| buffer.fill(0.0))
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Ask for `frames` frames; `buffer` holds exactly `frames × channels`
    pub fn fill(&mut self, buffer: &mut [f32], frames: usize, sampling_rate: u32) {
        debug_assert_eq!(buffer.len(), frames * self.channels);
        (self.on_samples)(buffer, frames, sampling_rate);
    }

    pub fn notify_rate(&mut self, sampling_rate: u32) {
        if let Some(callback) = self.on_rate_change.as_mut() {
            callback(sampling_rate);
        }
    }
}

impl std::fmt::Debug for VirtualSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualSource")
            .field("channels", &self.channels)
            .field("rate_callback", &self.on_rate_change.is_some())
            .finish()
    }
}
