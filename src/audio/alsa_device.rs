//! ALSA PCM playback sink.

use alsa::pcm::{Access, Format, HwParams, PCM};
use alsa::{Direction, ValueOr};
use anyhow::{Context, Result};

use super::sink::{AudioFormat, AudioSink, SinkProvider};

/// Parameters negotiated with the ALSA hardware.
#[derive(Debug, Clone)]
pub struct AlsaParams {
    /// Actual sample rate after negotiation
    pub sample_rate: u32,
    /// Actual number of channels
    pub channels: u32,
    /// Period size in frames
    pub period_size: usize,
}

fn pcm_format(format: &AudioFormat) -> Result<Format> {
    match (format.sample_bits, format.signed, format.big_endian) {
        (8, true, _) => Ok(Format::S8),
        (8, false, _) => Ok(Format::U8),
        (16, true, true) => Ok(Format::S16BE),
        (16, true, false) => Ok(Format::S16LE),
        (16, false, true) => Ok(Format::U16BE),
        (16, false, false) => Ok(Format::U16LE),
        (bits, ..) => anyhow::bail!("Unsupported sample width: {} bits", bits),
    }
}

/// Open a PCM device for playback with a fixed format.
pub fn open_playback(device: &str, format: &AudioFormat) -> Result<(PCM, AlsaParams)> {
    let pcm = PCM::new(device, Direction::Playback, false)
        .with_context(|| format!("Failed to open PCM device '{}' for Playback", device))?;

    // Configure hardware parameters
    {
        let hwp = HwParams::any(&pcm).with_context(|| "Failed to initialize HwParams")?;
        hwp.set_access(Access::RWInterleaved)?;
        hwp.set_format(pcm_format(format)?)?;
        hwp.set_channels(format.channels as u32)?;
        hwp.set_rate(format.sample_rate, ValueOr::Nearest)
            .with_context(|| format!("Device '{}' rejected {} Hz", device, format.sample_rate))?;
        pcm.hw_params(&hwp)?;
    }

    let params = {
        let hwp = pcm.hw_params_current()?;
        AlsaParams {
            sample_rate: hwp.get_rate()?,
            channels: hwp.get_channels()?,
            period_size: hwp.get_period_size()? as usize,
        }
    };

    log::info!(
        "ALSA Playback: device={}, rate={}, channels={}, period_size={}",
        device,
        params.sample_rate,
        params.channels,
        params.period_size,
    );

    Ok((pcm, params))
}

pub struct AlsaSink {
    pcm: Option<PCM>,
    frame_bytes: usize,
}

impl AudioSink for AlsaSink {
    fn start(&mut self) -> Result<()> {
        let pcm = self.pcm.as_ref().context("PCM already closed")?;
        pcm.prepare()?;
        Ok(())
    }

    fn write(&mut self, buf: &[u8]) -> Result<()> {
        let pcm = self.pcm.as_ref().context("PCM already closed")?;
        let io = pcm.io_bytes();

        // Short writes are retried; an xrun gets exactly one prepare() before
        // the write counts as failed.
        let total_frames = buf.len() / self.frame_bytes;
        let mut frames_written = 0;
        let mut recovered = false;
        while frames_written < total_frames {
            let offset = frames_written * self.frame_bytes;
            match io.writei(&buf[offset..total_frames * self.frame_bytes]) {
                Ok(n) => {
                    frames_written += n;
                    recovered = false;
                }
                Err(e) if !recovered => {
                    log::warn!("ALSA XRUN or error: {}, recovering...", e);
                    pcm.prepare().context("Failed to recover PCM playback")?;
                    recovered = true;
                }
                Err(e) => return Err(e).context("ALSA write failed after recovery"),
            }
        }
        Ok(())
    }

    fn close(&mut self) {
        if let Some(pcm) = self.pcm.take() {
            if let Err(e) = pcm.drain() {
                log::debug!("ALSA drain on close: {}", e);
            }
        }
    }
}

/// Opens one PCM stream per channel on the configured device.
pub struct AlsaSinkProvider {
    device: String,
}

impl AlsaSinkProvider {
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl SinkProvider for AlsaSinkProvider {
    fn open(&self, format: &AudioFormat) -> Result<Box<dyn AudioSink>> {
        let (pcm, _params) = open_playback(&self.device, format)?;
        Ok(Box::new(AlsaSink {
            pcm: Some(pcm),
            frame_bytes: format.frame_bytes(),
        }))
    }
}
