//! Voice chat playback path: per-peer packet queues drained to the sound
//! device at its own pace, with comfort noise for lost packets and idle
//! channel reaping.

pub mod audio;
pub mod config;
pub mod protocol;
pub mod receiver;

pub use audio::{Channel, ChannelConfig, ChannelError, ChannelId};
pub use protocol::{SoundPacket, VoiceMessage};
