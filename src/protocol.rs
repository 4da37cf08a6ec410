//! Voice message envelope and its datagram framing.
//!
//! One UDP datagram carries one [`VoiceMessage`]:
//!
//! | first byte | meaning                                   |
//! |------------|-------------------------------------------|
//! | `0x01`     | sound packet, rest is one gzip block      |
//! | `0x00`     | sound packet lost by the sender           |
//! | `{`        | JSON control message                      |
//! | other      | unknown kind, kept as an opaque control   |

use bytes::Bytes;
use serde::Deserialize;

pub const TAG_SOUND: u8 = 0x01;
pub const TAG_LOST: u8 = 0x00;

/// One audio frame's worth of compressed voice.
///
/// `payload == None` means the sender skipped this frame and the playback side
/// should mask the gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundPacket {
    pub payload: Option<Bytes>,
}

impl SoundPacket {
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: Some(payload.into()),
        }
    }

    pub fn lost() -> Self {
        Self { payload: None }
    }

    pub fn is_lost(&self) -> bool {
        self.payload.is_none()
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ControlMessage {
    #[serde(rename = "type")]
    pub msg_type: String,
    pub text: Option<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceMessage {
    Sound(SoundPacket),
    Control(ControlMessage),
}

impl From<SoundPacket> for VoiceMessage {
    fn from(packet: SoundPacket) -> Self {
        VoiceMessage::Sound(packet)
    }
}

impl VoiceMessage {
    /// Parse one datagram. Empty datagrams carry nothing and yield `None`.
    pub fn from_datagram(data: &[u8]) -> Option<Self> {
        let (&tag, rest) = data.split_first()?;
        let msg = match tag {
            TAG_SOUND => VoiceMessage::Sound(SoundPacket::new(Bytes::copy_from_slice(rest))),
            TAG_LOST => VoiceMessage::Sound(SoundPacket::lost()),
            b'{' => match serde_json::from_slice::<ControlMessage>(data) {
                Ok(ctrl) => VoiceMessage::Control(ctrl),
                Err(e) => {
                    log::debug!("Unparseable control message: {}", e);
                    VoiceMessage::Control(ControlMessage {
                        msg_type: "invalid".to_string(),
                        ..Default::default()
                    })
                }
            },
            other => VoiceMessage::Control(ControlMessage {
                msg_type: format!("0x{:02x}", other),
                ..Default::default()
            }),
        };
        Some(msg)
    }
}
