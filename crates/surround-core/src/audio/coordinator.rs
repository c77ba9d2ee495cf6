//! Start/stop/reinit of the generation thread
//!
//! ```text
//!   Stopped ──start──► Starting ──spawned──► Running
//!      ▲                  │                     │
//!      └──── failed ──────┘                    stop
//!      └──────────── joined ◄── Stopping ◄──────┘
//! ```

use std::sync::Arc;
use std::thread::JoinHandle;

use super::backend::AudioHandle;
use super::config::AudioSettings;
use super::device_info::{DeviceInfo, NegotiatedFormat};
use super::error::{AudioError, AudioResult};
use super::generator::Generator;
use super::source::VirtualSource;

/// Lifecycle of the generation thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Point-in-time view of the ring
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Diagnostics {
    /// Ring size in samples
    pub capacity: usize,
    /// Samples queued for the device
    pub committed: usize,
    /// Callbacks that found less than they asked for while running
    pub underruns: u64,
    /// Playback time queued in the ring
    pub latency_ms: f32,
}

/// Owns the backend handle and the generation thread
pub struct Coordinator {
    handle: AudioHandle,
    info: Arc<DeviceInfo>,
    state: BackendState,
    worker: Option<JoinHandle<VirtualSource>>,
    /// Source left over from a reinit that could not restart
    idle_source: Option<VirtualSource>,
}

impl Coordinator {
    pub fn new(handle: AudioHandle, settings: &AudioSettings) -> Self {
        let info = Arc::new(DeviceInfo::new(handle.format(), settings));
        Self {
            handle,
            info,
            state: BackendState::Stopped,
            worker: None,
            idle_source: None,
        }
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == BackendState::Running
    }

    pub fn info(&self) -> &Arc<DeviceInfo> {
        &self.info
    }

    pub fn handle(&self) -> &AudioHandle {
        &self.handle
    }

    pub fn format(&self) -> NegotiatedFormat {
        self.handle.format()
    }

    /// Size the ring for the current format and spawn the generation thread
    ///
    /// Filter design for the format happens here, so an invalid format fails
    /// before any thread exists.
    pub fn start(&mut self, source: VirtualSource) -> AudioResult<()> {
        self.launch(source).map_err(|(e, _)| e)
    }

    /// [`start`](Self::start), handing the source back if no thread was spawned
    fn launch(&mut self, source: VirtualSource) -> Result<(), (AudioError, Option<VirtualSource>)> {
        if self.state != BackendState::Stopped {
            return Err((AudioError::AlreadyRunning, Some(source)));
        }
        self.state = BackendState::Starting;

        let format = self.handle.format();
        let shared = self.handle.shared().clone();
        self.info.set_format(format);
        shared.reset(format.ring_capacity());

        let vch = source.channels();
        let generator = match Generator::prepare(shared.clone(), self.info.clone(), source) {
            Ok(generator) => generator,
            Err((e, source)) => {
                self.state = BackendState::Stopped;
                return Err((e, Some(source)));
            }
        };

        shared.set_running(true);
        match generator.spawn() {
            Ok(worker) => self.worker = Some(worker),
            Err(e) => {
                // The source went down with the thread closure
                shared.set_running(false);
                self.state = BackendState::Stopped;
                return Err((e, None));
            }
        }

        self.state = BackendState::Running;
        log::info!(
            "Audio started: {} virtual channels -> {} @ {}Hz, {} frames/block",
            vch,
            format.layout,
            format.sampling_rate,
            format.block_size
        );
        Ok(())
    }

    /// Signal the generation thread, join it and zero the ring
    ///
    /// Returns the source the thread was running (or one parked by a failed
    /// reinit).
    pub fn stop(&mut self) -> Option<VirtualSource> {
        let Some(worker) = self.worker.take() else {
            return self.idle_source.take();
        };
        self.state = BackendState::Stopping;

        let shared = self.handle.shared();
        shared.set_running(false);
        let source = match worker.join() {
            Ok(source) => Some(source),
            Err(_) => {
                log::error!("Generation thread panicked");
                None
            }
        };
        shared.clear();

        self.state = BackendState::Stopped;
        log::info!("Audio stopped ({} underruns)", shared.underruns());
        source
    }

    /// Reopen the device at a new sampling rate
    ///
    /// A running source is stopped, told about the new rate if it changed,
    /// and restarted. If the device cannot be reopened, or the source cannot
    /// be restarted on the new format, the source is kept and handed back by
    /// the next [`stop`](Self::stop).
    pub fn reinit(&mut self, sampling_rate: u32) -> AudioResult<NegotiatedFormat> {
        let old = self.handle.format();
        let source = self.stop();

        let format = match self.handle.reconfigure(sampling_rate) {
            Ok(format) => format,
            Err(e) => {
                self.idle_source = source;
                return Err(e);
            }
        };
        self.info.set_format(format);
        self.handle.shared().reset(format.ring_capacity());

        log::info!(
            "Audio reinitialised: {}Hz -> {}Hz ({} frames/block)",
            old.sampling_rate,
            format.sampling_rate,
            format.block_size
        );

        if let Some(mut source) = source {
            if format.sampling_rate != old.sampling_rate {
                source.notify_rate(format.sampling_rate);
            }
            if let Err((e, source)) = self.launch(source) {
                self.idle_source = source;
                return Err(e);
            }
        }
        Ok(format)
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let shared = self.handle.shared();
        let format = self.handle.format();
        let (capacity, committed) = shared.with_ring(|ring| (ring.capacity(), ring.committed()));
        let frames = committed / format.channels().max(1);
        Diagnostics {
            capacity,
            committed,
            underruns: shared.underruns(),
            latency_ms: frames as f32 / format.sampling_rate.max(1) as f32 * 1000.0,
        }
    }
}

impl Drop for Coordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
