//! Decaying delay line used as the distance reverb

/// Circular feedback buffer
///
/// Every sample written with [`add`](ReverbBuffer::add) comes back one
/// delay later, scaled by `decay` once per trip around the buffer.
#[derive(Debug, Clone)]
pub struct ReverbBuffer {
    buffer: Vec<f32>,
    decay: f32,
    cursor: usize,
}

impl ReverbBuffer {
    /// `delay_seconds` is clamped so the buffer always holds one sample
    pub fn new(delay_seconds: f32, decay: f32, sampling_rate: u32) -> Self {
        let len = if delay_seconds.is_finite() && delay_seconds > 0.0 {
            ((delay_seconds * sampling_rate as f32).round() as usize).max(1)
        } else {
            1
        };
        Self {
            buffer: vec![0.0; len],
            decay,
            cursor: 0,
        }
    }

    /// Mix a sample into the current slot
    #[inline]
    pub fn add(&mut self, sample: f32) {
        self.buffer[self.cursor] += sample;
    }

    /// Decay the current slot, step forward and return the next one
    #[inline]
    pub fn step(&mut self) -> f32 {
        self.buffer[self.cursor] *= self.decay;
        self.cursor = (self.cursor + 1) % self.buffer.len();
        self.buffer[self.cursor]
    }

    pub fn clear(&mut self) {
        self.buffer.fill(0.0);
        self.cursor = 0;
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn decay(&self) -> f32 {
        self.decay
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_from_delay() {
        assert_eq!(ReverbBuffer::new(0.02, 0.1, 44100).len(), 882);
        assert_eq!(ReverbBuffer::new(0.0, 0.1, 44100).len(), 1);
        assert_eq!(ReverbBuffer::new(-1.0, 0.1, 44100).len(), 1);
        assert_eq!(ReverbBuffer::new(f32::NAN, 0.1, 44100).len(), 1);
    }

    #[test]
    fn test_echo_returns_after_delay() {
        let mut reverb = ReverbBuffer::new(4.0 / 1000.0, 0.5, 1000);
        assert_eq!(reverb.len(), 4);

        // One frame: read, then feed
        let mut out = Vec::new();
        for i in 0..12 {
            out.push(reverb.step());
            reverb.add(if i == 0 { 1.0 } else { 0.0 });
        }
        // Fed at slot 1, decayed each time the cursor leaves it
        assert_eq!(out[..5], [0.0, 0.0, 0.0, 0.0, 0.5]);
        assert_eq!(out[8], 0.25);
        assert!(out.iter().enumerate().all(|(i, &x)| x == 0.0 || i % 4 == 0));
    }

    #[test]
    fn test_zero_decay_single_slot_stays_silent() {
        let mut reverb = ReverbBuffer::new(0.0, 0.0, 44100);
        reverb.step();
        reverb.add(0.75);
        // Single slot: decayed before it is read back
        assert_eq!(reverb.step(), 0.0);
    }

    #[test]
    fn test_clear() {
        let mut reverb = ReverbBuffer::new(0.01, 0.9, 1000);
        reverb.add(1.0);
        reverb.clear();
        for _ in 0..20 {
            assert_eq!(reverb.step(), 0.0);
        }
    }
}
