//! Comfort noise for lost packets.
//!
//! A lost frame is replaced by low-level noise rather than silence, sized like
//! the last frame that actually played so the sink keeps its cadence.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::sink::AudioFormat;

/// Length used before any packet has been played.
pub const DEFAULT_PACKET_LEN: usize = 1200;

pub struct ComfortNoise {
    last_len: usize,
    format: AudioFormat,
    rng: StdRng,
}

impl ComfortNoise {
    pub fn new(default_len: usize, format: AudioFormat) -> Self {
        Self {
            last_len: default_len,
            format,
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests.
    pub fn with_seed(default_len: usize, format: AudioFormat, seed: u64) -> Self {
        Self {
            last_len: default_len,
            format,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Length the next concealment buffer will have.
    pub fn last_len(&self) -> usize {
        self.last_len
    }

    /// Remember the decompressed length of a frame that was played.
    pub fn record_played(&mut self, len: usize) {
        self.last_len = len;
    }

    /// One buffer of `last_len` bytes whose samples are -1, 0 or 1 in the
    /// output format. A trailing partial sample is zero-filled.
    pub fn generate(&mut self) -> Vec<u8> {
        let width = (self.format.sample_bits as usize / 8).clamp(1, 4);
        // unsigned PCM is centred on half scale
        let bias: i64 = if self.format.signed {
            0
        } else {
            1i64 << (width * 8 - 1)
        };

        let mut buf = Vec::with_capacity(self.last_len);
        while buf.len() + width <= self.last_len {
            let sample = self.rng.gen_range(-1i64..=1) + bias;
            let be = sample.to_be_bytes();
            let bytes = &be[8 - width..];
            if self.format.big_endian {
                buf.extend_from_slice(bytes);
            } else {
                buf.extend(bytes.iter().rev());
            }
        }
        buf.resize(self.last_len, 0);
        buf
    }
}

impl Default for ComfortNoise {
    fn default() -> Self {
        Self::new(DEFAULT_PACKET_LEN, AudioFormat::default())
    }
}
