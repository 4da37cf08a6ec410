//! Audio output abstraction: a device that accepts raw PCM bytes and paces
//! them in real time.

use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::config::Config;

/// Fixed PCM output format. Matches what the sender encodes by convention,
/// nothing is negotiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub sample_rate: u32,
    /// Bits per sample (8 or 16)
    pub sample_bits: u16,
    pub channels: u16,
    /// Signed linear PCM
    pub signed: bool,
    pub big_endian: bool,
}

impl AudioFormat {
    /// Bytes per frame (one sample for every channel).
    pub fn frame_bytes(&self) -> usize {
        (self.sample_bits as usize / 8).max(1) * self.channels as usize
    }

    /// Bytes the device consumes per second.
    pub fn byte_rate(&self) -> usize {
        self.frame_bytes() * self.sample_rate as usize
    }

    /// Playback duration of `len` bytes.
    pub fn duration_of(&self, len: usize) -> Duration {
        let rate = self.byte_rate();
        if rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((len as u64).saturating_mul(1_000_000_000) / rate as u64)
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self {
            sample_rate: 11025,
            sample_bits: 8,
            channels: 1,
            signed: true,
            big_endian: true,
        }
    }
}

impl From<&Config> for AudioFormat {
    fn from(config: &Config) -> Self {
        Self {
            sample_rate: config.playback_sample_rate,
            sample_bits: config.playback_sample_bits,
            channels: config.playback_channels,
            signed: true,
            big_endian: config.playback_big_endian,
        }
    }
}

/// An opened output stream.
///
/// `write` blocks until the device accepted the whole buffer; that blocking
/// is what throttles a channel to real time.
pub trait AudioSink: Send {
    fn start(&mut self) -> Result<()>;

    fn write(&mut self, pcm: &[u8]) -> Result<()>;

    /// Release the device. Called at most once per sink.
    fn close(&mut self);
}

/// Opens one sink per channel.
pub trait SinkProvider: Send + Sync {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn AudioSink>>;
}

/// Sink that drops the audio but sleeps for as long as a real device would
/// take to play it. Lets the client run on hosts without a sound card.
pub struct PacedSink {
    format: AudioFormat,
    started: bool,
}

impl PacedSink {
    pub fn new(format: AudioFormat) -> Self {
        Self {
            format,
            started: false,
        }
    }
}

impl AudioSink for PacedSink {
    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> Result<()> {
        if !self.started {
            anyhow::bail!("write before start");
        }
        thread::sleep(self.format.duration_of(pcm.len()));
        Ok(())
    }

    fn close(&mut self) {
        self.started = false;
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PacedSinkProvider;

impl SinkProvider for PacedSinkProvider {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn AudioSink>> {
        Ok(Box::new(PacedSink::new(*format)))
    }
}
