//! audio - Per-peer voice playback
//!
//! Each remote speaker gets a [`Channel`]: a mailbox filled by the network
//! side and a dedicated thread that decompresses voice blocks, masks lost
//! packets with comfort noise and writes PCM to an [`AudioSink`].

#[cfg(feature = "alsa")]
mod alsa_device;
mod channel;
pub mod clock;
mod codec;
mod concealment;
mod error;
mod sink;

#[cfg(feature = "alsa")]
pub use alsa_device::{AlsaSink, AlsaSinkProvider};
pub use channel::{Channel, ChannelConfig, ChannelId, ChannelState, IDLE_POLL, IDLE_TIMEOUT};
pub use codec::{GzipCodec, PayloadCodec};
pub use concealment::{ComfortNoise, DEFAULT_PACKET_LEN};
pub use error::{ChannelError, ChannelResult};
pub use sink::{AudioFormat, AudioSink, PacedSink, PacedSinkProvider, SinkProvider};
