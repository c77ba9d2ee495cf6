//! Generation thread
//!
//! Sleeps on the ring's condition variable until the callback has drained
//! at least one block, then pulls whole blocks from the virtual source,
//! spatializes them and commits them to the ring. Stopping is only noticed
//! at the wait point, so a pass that has started always completes.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::mixer::Spatializer;

use super::device_info::{DeviceInfo, NegotiatedFormat};
use super::error::{AudioError, AudioResult};
use super::ring::RingShared;
use super::source::VirtualSource;

/// Name of the spawned generation thread
pub const GENERATOR_THREAD_NAME: &str = "surround-gen";

/// Producer half of the pipeline
pub struct Generator {
    shared: Arc<RingShared>,
    info: Arc<DeviceInfo>,
    format: NegotiatedFormat,
    source: VirtualSource,
    spatializer: Spatializer,
    /// Interleaved virtual frames, sized for a full ring
    input: Vec<f32>,
    /// Interleaved speaker frames, sized for a full ring
    output: Vec<f32>,
}

impl Generator {
    /// Prepare a generator for the format currently stored in `info`
    ///
    /// Fails if the source is empty or the filters cannot be designed for
    /// this format.
    pub fn new(
        shared: Arc<RingShared>,
        info: Arc<DeviceInfo>,
        source: VirtualSource,
    ) -> AudioResult<Self> {
        Self::prepare(shared, info, source).map_err(|(e, _)| e)
    }

    /// [`new`](Self::new), handing the source back on failure
    pub(crate) fn prepare(
        shared: Arc<RingShared>,
        info: Arc<DeviceInfo>,
        source: VirtualSource,
    ) -> Result<Self, (AudioError, VirtualSource)> {
        let format = info.format();
        let vch = source.channels();
        if vch == 0 {
            return Err((AudioError::EmptySource, source));
        }

        let max_frames = format.ring_capacity() / format.channels();
        // Changes made before start are already in this snapshot
        let settings = info.take_changed_settings().unwrap_or_else(|| info.settings());
        let spatializer = match Spatializer::new(
            format.layout,
            vch,
            format.sampling_rate,
            format.block_size as usize,
            max_frames,
            &settings,
        ) {
            Ok(spatializer) => spatializer,
            Err(e) => return Err((e.into(), source)),
        };

        log::debug!(
            "Generator: {} virtual -> {} ({} frames/block, up to {} frames/pass)",
            vch,
            format.layout,
            format.block_size,
            max_frames
        );

        Ok(Self {
            shared,
            info,
            format,
            source,
            spatializer,
            input: vec![0.0; max_frames * vch],
            output: vec![0.0; max_frames * format.channels()],
        })
    }

    /// Ring space of one hardware block, in samples
    fn block_samples(&self) -> usize {
        self.format.block_size as usize * self.format.channels()
    }

    /// Run one pass against the current free space without waiting
    ///
    /// Returns the number of frames committed (a multiple of the block size,
    /// zero when less than a block is free).
    pub fn pass(&mut self) -> usize {
        let free = self.shared.with_ring(|ring| ring.free());
        self.generate(free)
    }

    fn generate(&mut self, free_samples: usize) -> usize {
        if let Some(settings) = self.info.take_changed_settings() {
            self.spatializer.apply_settings(settings);
        }

        let block = self.format.block_size as usize;
        let frames = free_samples / self.block_samples() * block;
        if frames == 0 {
            return 0;
        }

        let input = &mut self.input[..frames * self.source.channels()];
        self.source.fill(input, frames, self.format.sampling_rate);

        let output = &mut self.output[..frames * self.format.channels()];
        output.fill(0.0);
        self.spatializer.process(input, output);

        let written = self.shared.write(output);
        debug_assert_eq!(written, output.len(), "ring lost space during a pass");
        frames
    }

    /// Thread body: pass after pass until running is cleared
    pub fn run(mut self) -> VirtualSource {
        let min_free = self.block_samples();
        while let Some(free) = self.shared.wait_for_space(min_free) {
            self.generate(free);
        }
        log::debug!("Generation thread exiting");
        self.source
    }

    /// Start [`run`](Self::run) on its own named thread
    ///
    /// The source comes back through the join handle.
    pub fn spawn(self) -> AudioResult<JoinHandle<VirtualSource>> {
        let handle = thread::Builder::new()
            .name(GENERATOR_THREAD_NAME.into())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    pub fn format(&self) -> NegotiatedFormat {
        self.format
    }
}
