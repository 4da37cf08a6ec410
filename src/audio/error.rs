use std::io;

use thiserror::Error;

use super::channel::ChannelId;

/// Everything that can end a channel or stop it from starting.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("audio sink unavailable: {0:#}")]
    SinkUnavailable(anyhow::Error),

    #[error("corrupt payload: {0}")]
    CorruptPayload(#[source] io::Error),

    #[error("audio sink write failed: {0:#}")]
    SinkWriteFailure(anyhow::Error),

    #[error("channel {0} already started")]
    AlreadyStarted(ChannelId),

    #[error("channel {0} was shut down")]
    Dead(ChannelId),

    #[error("failed to spawn playback thread: {0}")]
    Spawn(#[source] io::Error),
}

pub type ChannelResult<T> = Result<T, ChannelError>;
