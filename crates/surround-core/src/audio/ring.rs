//! Device ring buffer shared by the generation thread and the hardware callback
//!
//! ```text
//!            read                write
//!             │   committed        │      free
//!  ───────────┼────────────────────┼──────────────────┼─
//!             └─ callback drains ──┘└─ generator fills ┘
//! ```
//!
//! Cursors are sample offsets modulo capacity. Equal cursors mean empty;
//! one sample is always left unwritten so a full buffer never looks empty
//! (`free = capacity - 1 - committed`).
//!
//! The callback takes the lock only to copy out and move `read`; the
//! generator only to check free space and to copy in. All DSP happens
//! outside the lock.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

/// Interleaved sample ring (not synchronised on its own, see [`RingShared`])
#[derive(Debug, Clone)]
pub struct RingBuffer {
    data: Vec<f32>,
    read: usize,
    write: usize,
}

impl RingBuffer {
    /// Capacity in samples (at least 2, one slot is always reserved)
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0.0; capacity.max(2)],
            read: 0,
            write: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Samples written but not yet drained
    #[inline]
    pub fn committed(&self) -> usize {
        (self.write + self.capacity() - self.read) % self.capacity()
    }

    /// Samples that can be written without catching up with `read`
    #[inline]
    pub fn free(&self) -> usize {
        self.capacity() - 1 - self.committed()
    }

    pub fn read_cursor(&self) -> usize {
        self.read
    }

    pub fn write_cursor(&self) -> usize {
        self.write
    }

    /// Raw storage, for inspection
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Append as much of `samples` as fits; returns the number written
    pub fn write(&mut self, samples: &[f32]) -> usize {
        let cap = self.capacity();
        let n = samples.len().min(self.free());
        let first = n.min(cap - self.write);

        self.data[self.write..self.write + first].copy_from_slice(&samples[..first]);
        self.data[..n - first].copy_from_slice(&samples[first..n]);

        self.write = (self.write + n) % cap;
        n
    }

    /// Move committed samples into `out`, zeroing what was drained
    ///
    /// Returns the number of samples copied; the rest of `out` is untouched.
    pub fn drain(&mut self, out: &mut [f32]) -> usize {
        let cap = self.capacity();
        let n = out.len().min(self.committed());
        let first = n.min(cap - self.read);

        let head = &mut self.data[self.read..self.read + first];
        out[..first].copy_from_slice(head);
        head.fill(0.0);

        let tail = &mut self.data[..n - first];
        out[first..n].copy_from_slice(tail);
        tail.fill(0.0);

        self.read = (self.read + n) % cap;
        n
    }

    /// [`drain`](Self::drain) into a native-endian byte buffer, whole samples only
    ///
    /// Returns the number of bytes written.
    pub fn drain_bytes(&mut self, out: &mut [u8]) -> usize {
        let cap = self.capacity();
        let n = (out.len() / 4).min(self.committed());
        for chunk in out.chunks_exact_mut(4).take(n) {
            let sample = std::mem::take(&mut self.data[self.read]);
            chunk.copy_from_slice(bytemuck::bytes_of(&sample));
            self.read = (self.read + 1) % cap;
        }
        n * 4
    }

    /// Zero the storage and rewind both cursors
    pub fn clear(&mut self) {
        self.data.fill(0.0);
        self.read = 0;
        self.write = 0;
    }

    /// Reallocate for a new capacity, empty
    pub fn resize(&mut self, capacity: usize) {
        let capacity = capacity.max(2);
        if capacity == self.capacity() {
            self.clear();
        } else {
            *self = Self::new(capacity);
        }
    }
}

/// Ring plus the signalling around it
#[derive(Debug)]
pub struct RingShared {
    ring: Mutex<RingBuffer>,
    /// Signalled after every drain and on stop
    space: Condvar,
    /// Generation thread keeps going while set; only changed under `ring`'s lock
    running: AtomicBool,
    underruns: AtomicU64,
}

impl RingShared {
    pub fn new(capacity: usize) -> Self {
        Self {
            ring: Mutex::new(RingBuffer::new(capacity)),
            space: Condvar::new(),
            running: AtomicBool::new(false),
            underruns: AtomicU64::new(0),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Hardware callback side
    // ─────────────────────────────────────────────────────────────────────

    /// Fill a device buffer from the ring and wake the generator
    ///
    /// Missing samples are filled with silence and, while running, counted
    /// as an underrun. Never allocates.
    pub fn fill_device(&self, out: &mut [f32]) {
        let drained = self.ring.lock().drain(out);
        out[drained..].fill(0.0);
        self.after_drain(drained < out.len());
    }

    /// Byte-oriented form of [`fill_device`](Self::fill_device)
    ///
    /// `out` holds native-endian f32 samples; a trailing partial sample is
    /// zeroed.
    pub fn fill_device_bytes(&self, out: &mut [u8]) {
        if let Ok(samples) = bytemuck::try_cast_slice_mut::<u8, f32>(out) {
            self.fill_device(samples);
            return;
        }
        // Unaligned or odd-sized buffer: copy sample by sample
        let written = self.ring.lock().drain_bytes(out);
        out[written..].fill(0);
        self.after_drain(written < out.len());
    }

    #[inline]
    fn after_drain(&self, short: bool) {
        if short && self.running.load(Ordering::Acquire) {
            self.underruns.fetch_add(1, Ordering::Relaxed);
        }
        self.space.notify_one();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Generation thread side
    // ─────────────────────────────────────────────────────────────────────

    /// Block until at least `min_free` samples are free
    ///
    /// Returns the free space, or `None` once running has been cleared.
    pub(crate) fn wait_for_space(&self, min_free: usize) -> Option<usize> {
        let mut ring = self.ring.lock();
        loop {
            if !self.running.load(Ordering::Acquire) {
                return None;
            }
            let free = ring.free();
            if free >= min_free {
                return Some(free);
            }
            self.space.wait(&mut ring);
        }
    }

    /// Append samples; returns how many fit
    pub fn write(&self, samples: &[f32]) -> usize {
        self.ring.lock().write(samples)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Coordinator side
    // ─────────────────────────────────────────────────────────────────────

    /// Set or clear running and wake the generator
    ///
    /// Changed under the ring lock so a generator between its running check
    /// and its wait cannot miss the wake-up.
    pub(crate) fn set_running(&self, running: bool) {
        {
            let _ring = self.ring.lock();
            self.running.store(running, Ordering::Release);
        }
        self.space.notify_all();
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Empty the ring at a (possibly new) capacity
    pub(crate) fn reset(&self, capacity: usize) {
        self.ring.lock().resize(capacity);
    }

    /// Zero contents and cursors, keep the capacity
    pub(crate) fn clear(&self) {
        self.ring.lock().clear();
    }

    pub fn underruns(&self) -> u64 {
        self.underruns.load(Ordering::Relaxed)
    }

    pub fn capacity(&self) -> usize {
        self.ring.lock().capacity()
    }

    pub fn committed(&self) -> usize {
        self.ring.lock().committed()
    }

    /// Inspect the ring under its lock
    pub fn with_ring<R>(&self, f: impl FnOnce(&RingBuffer) -> R) -> R {
        f(&self.ring.lock())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_and_full() {
        let mut ring = RingBuffer::new(8);
        assert_eq!(ring.committed(), 0);
        assert_eq!(ring.free(), 7);

        assert_eq!(ring.write(&[1.0; 10]), 7);
        assert_eq!(ring.committed(), 7);
        assert_eq!(ring.free(), 0);
        // Full never looks like empty
        assert_ne!(ring.read_cursor(), ring.write_cursor());
        assert_eq!(ring.write(&[1.0]), 0);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let mut ring = RingBuffer::new(8);
        ring.write(&[0.0, 1.0, 2.0, 3.0, 4.0]);
        let mut out = [0.0; 4];
        assert_eq!(ring.drain(&mut out), 4);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0]);

        // Crosses the end of storage
        assert_eq!(ring.write(&[5.0, 6.0, 7.0, 8.0, 9.0, 10.0]), 6);
        let mut out = [0.0; 7];
        assert_eq!(ring.drain(&mut out), 7);
        assert_eq!(out, [4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(ring.committed(), 0);
    }

    #[test]
    fn test_random_traffic_keeps_order_and_bounds() {
        let mut ring = RingBuffer::new(37);
        let mut seed = 0x2545_f491u32;
        let mut next = move |max: usize| {
            seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (seed >> 8) as usize % (max + 1)
        };

        let mut produced = 0u32;
        let mut consumed = 0u32;
        for _ in 0..2000 {
            let batch: Vec<f32> = (0..next(20)).map(|i| (produced + i as u32) as f32).collect();
            let written = ring.write(&batch);
            produced += written as u32;
            assert!(ring.committed() <= ring.capacity() - 1);

            let mut out = vec![-1.0; next(20)];
            let drained = ring.drain(&mut out);
            for &sample in &out[..drained] {
                assert_eq!(sample, consumed as f32);
                consumed += 1;
            }
            assert_eq!(ring.committed() as u32, produced - consumed);
        }
        assert!(produced > 1000);
    }

    #[test]
    fn test_drain_zeroes_source() {
        let mut ring = RingBuffer::new(8);
        ring.write(&[0.5; 6]);
        let mut out = [0.0; 6];
        ring.drain(&mut out);
        assert!(ring.as_slice().iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_short_drain_leaves_rest_untouched() {
        let mut ring = RingBuffer::new(8);
        ring.write(&[1.0, 2.0]);
        let mut out = [9.0; 4];
        assert_eq!(ring.drain(&mut out), 2);
        assert_eq!(out, [1.0, 2.0, 9.0, 9.0]);
    }

    #[test]
    fn test_drain_bytes() {
        let mut ring = RingBuffer::new(8);
        ring.write(&[0.25, -1.0, 3.5]);
        let mut out = [0u8; 10];
        assert_eq!(ring.drain_bytes(&mut out), 8);
        assert_eq!(f32::from_ne_bytes([out[0], out[1], out[2], out[3]]), 0.25);
        assert_eq!(f32::from_ne_bytes([out[4], out[5], out[6], out[7]]), -1.0);
        assert_eq!(ring.committed(), 1);
    }

    #[test]
    fn test_resize_and_clear() {
        let mut ring = RingBuffer::new(8);
        ring.write(&[1.0; 5]);
        ring.resize(16);
        assert_eq!(ring.capacity(), 16);
        assert_eq!(ring.committed(), 0);

        ring.write(&[1.0; 5]);
        ring.resize(16);
        assert_eq!(ring.committed(), 0);
        assert!(ring.as_slice().iter().all(|&x| x == 0.0));
        assert_eq!(RingBuffer::new(0).capacity(), 2);
    }

    #[test]
    fn test_fill_device_counts_underruns_only_while_running() {
        let shared = RingShared::new(16);
        let mut out = [1.0f32; 4];
        shared.fill_device(&mut out);
        assert_eq!(out, [0.0; 4]);
        assert_eq!(shared.underruns(), 0);

        shared.set_running(true);
        shared.write(&[0.5, 0.5]);
        let mut out = [1.0f32; 4];
        shared.fill_device(&mut out);
        assert_eq!(out, [0.5, 0.5, 0.0, 0.0]);
        assert_eq!(shared.underruns(), 1);

        shared.write(&[0.5; 4]);
        shared.fill_device(&mut out);
        assert_eq!(shared.underruns(), 1);
    }

    #[test]
    fn test_fill_device_bytes_matches_float_path() {
        let shared = RingShared::new(16);
        shared.write(&[0.1, 0.2, 0.3]);

        // Backed by f32 storage so the cast path is taken
        let mut storage = [0.0f32; 4];
        shared.fill_device_bytes(bytemuck::cast_slice_mut(&mut storage));
        assert_eq!(storage, [0.1, 0.2, 0.3, 0.0]);

        // Odd length forces the sample-by-sample path
        shared.write(&[0.75]);
        let mut odd = [0xffu8; 6];
        shared.fill_device_bytes(&mut odd);
        assert_eq!(f32::from_ne_bytes([odd[0], odd[1], odd[2], odd[3]]), 0.75);
        assert_eq!(&odd[4..], &[0, 0]);
    }

    #[test]
    fn test_wait_for_space_returns_none_when_stopped() {
        let shared = RingShared::new(16);
        assert_eq!(shared.wait_for_space(1), None);
        shared.set_running(true);
        assert_eq!(shared.wait_for_space(8), Some(15));
    }
}
