//! Common types for Surround
//!
//! Speaker layouts with their fixed angle tables, the supported sampling
//! rates and their hardware block sizes.

use serde::{Deserialize, Serialize};

/// Default sampling rate requested from the device
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

/// Highest sampling rate the pipeline will ever request
pub const MAX_SAMPLE_RATE: u32 = 96000;

/// Default hardware block size (frames per channel)
pub const DEFAULT_BLOCK_SIZE: u32 = 512;

/// Ring buffer capacity in hardware blocks (jitter headroom)
pub const RING_BLOCKS: usize = 4;

/// Supported sampling rates and the hardware block size requested for each
///
/// High rates get a larger block so the callback cadence stays roughly
/// the same (~10ms).
pub const SAMPLING_RATES: [(u32, u32); 5] = [
    (22050, 512),
    (44100, 512),
    (48000, 512),
    (88200, 1024),
    (96000, 1024),
];

/// Block size requested for a sampling rate (512 for anything not in the table)
pub fn block_size_for(sampling_rate: u32) -> u32 {
    SAMPLING_RATES
        .iter()
        .find(|(rate, _)| *rate == sampling_rate)
        .map(|(_, block)| *block)
        .unwrap_or(DEFAULT_BLOCK_SIZE)
}

/// Degrees to radians factor for the angle tables
const DEG: f32 = std::f32::consts::PI / 180.0;

/// 7.1 speaker positions: FL, FR, C, LFE, RL, RR, CL, CR
pub const SURROUND_7_1_ANGLES: [f32; 8] = [
    337.5 * DEG,
    22.5 * DEG,
    0.0 * DEG,
    0.0 * DEG, // LFE, not panned into
    220.0 * DEG,
    140.0 * DEG,
    275.0 * DEG,
    85.0 * DEG,
];

/// 5.1 speaker positions: FL, FR, C, LFE, RL, RR
pub const SURROUND_5_1_ANGLES: [f32; 6] = [
    337.5 * DEG,
    22.5 * DEG,
    0.0 * DEG,
    0.0 * DEG, // LFE, not panned into
    220.0 * DEG,
    140.0 * DEG,
];

/// Stereo speaker positions: L, R (mono folds both into one channel)
pub const STEREO_ANGLES: [f32; 2] = [270.0 * DEG, 90.0 * DEG];

/// Index of the LFE channel in 5.1 and 7.1 frames
pub const LFE_CHANNEL: usize = 3;

/// Physical speaker layout of the output device
///
/// The set is closed: anything the device grants outside these four is
/// rejected at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SpeakerLayout {
    Mono,
    #[default]
    Stereo,
    #[serde(rename = "5.1")]
    Surround51,
    #[serde(rename = "7.1")]
    Surround71,
}

impl SpeakerLayout {
    /// All layouts in ascending channel order
    pub const ALL: [SpeakerLayout; 4] = [
        SpeakerLayout::Mono,
        SpeakerLayout::Stereo,
        SpeakerLayout::Surround51,
        SpeakerLayout::Surround71,
    ];

    /// Number of interleaved channels in one frame
    pub const fn channels(&self) -> usize {
        match self {
            SpeakerLayout::Mono => 1,
            SpeakerLayout::Stereo => 2,
            SpeakerLayout::Surround51 => 6,
            SpeakerLayout::Surround71 => 8,
        }
    }

    /// Map a device channel count to a layout
    pub fn from_channels(channels: usize) -> Option<Self> {
        match channels {
            1 => Some(SpeakerLayout::Mono),
            2 => Some(SpeakerLayout::Stereo),
            6 => Some(SpeakerLayout::Surround51),
            8 => Some(SpeakerLayout::Surround71),
            _ => None,
        }
    }

    /// Largest layout that fits into `channels` device channels
    pub fn fitting(channels: usize) -> Option<Self> {
        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|layout| layout.channels() <= channels)
    }

    /// Speaker angle table (radians, clockwise from front)
    pub fn angles(&self) -> &'static [f32] {
        match self {
            SpeakerLayout::Mono | SpeakerLayout::Stereo => &STEREO_ANGLES,
            SpeakerLayout::Surround51 => &SURROUND_5_1_ANGLES,
            SpeakerLayout::Surround71 => &SURROUND_7_1_ANGLES,
        }
    }

    /// Whether the layout has a dedicated LFE channel
    pub const fn has_lfe(&self) -> bool {
        matches!(self, SpeakerLayout::Surround51 | SpeakerLayout::Surround71)
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            SpeakerLayout::Mono => "mono",
            SpeakerLayout::Stereo => "stereo",
            SpeakerLayout::Surround51 => "5.1",
            SpeakerLayout::Surround71 => "7.1",
        }
    }
}

impl std::fmt::Display for SpeakerLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_channel_roundtrip() {
        for layout in SpeakerLayout::ALL {
            assert_eq!(SpeakerLayout::from_channels(layout.channels()), Some(layout));
            if layout.has_lfe() {
                assert_eq!(layout.angles().len(), layout.channels());
            } else {
                assert_eq!(layout.angles().len(), 2);
            }
        }
        assert_eq!(SpeakerLayout::from_channels(4), None);
    }

    #[test]
    fn test_fitting_layout() {
        assert_eq!(SpeakerLayout::fitting(2), Some(SpeakerLayout::Stereo));
        assert_eq!(SpeakerLayout::fitting(4), Some(SpeakerLayout::Stereo));
        assert_eq!(SpeakerLayout::fitting(7), Some(SpeakerLayout::Surround51));
        assert_eq!(SpeakerLayout::fitting(16), Some(SpeakerLayout::Surround71));
        assert_eq!(SpeakerLayout::fitting(0), None);
    }

    #[test]
    fn test_block_size_table() {
        assert_eq!(block_size_for(44100), 512);
        assert_eq!(block_size_for(96000), 1024);
        assert_eq!(block_size_for(12345), DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn test_lfe_slot_is_front() {
        assert!(SpeakerLayout::Surround51.has_lfe());
        assert!(!SpeakerLayout::Stereo.has_lfe());
        assert_eq!(SURROUND_7_1_ANGLES[LFE_CHANNEL], 0.0);
    }
}
