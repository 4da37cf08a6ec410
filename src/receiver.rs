//! UDP voice receiver and per-peer channel registry.
//!
//! Every sender address gets its own [`Channel`]; the reaper tears down
//! channels that went quiet or died on their own.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

use tokio::net::UdpSocket;

use crate::audio::{Channel, ChannelConfig, ChannelId, SinkProvider};
use crate::config::Config;
use crate::protocol::VoiceMessage;

/// Channel identity for a peer: address bits mixed with the port.
pub fn channel_id(addr: &SocketAddr) -> ChannelId {
    match addr.ip() {
        IpAddr::V4(ip) => ((u32::from(ip) as u64) << 16) | addr.port() as u64,
        IpAddr::V6(ip) => {
            let mut hasher = DefaultHasher::new();
            ip.hash(&mut hasher);
            addr.port().hash(&mut hasher);
            hasher.finish()
        }
    }
}

/// Live channels by peer.
pub struct ChannelRegistry {
    channels: Mutex<HashMap<ChannelId, Arc<Channel>>>,
    config: ChannelConfig,
    provider: Arc<dyn SinkProvider>,
}

impl ChannelRegistry {
    pub fn new(config: ChannelConfig, provider: Arc<dyn SinkProvider>) -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
            config,
            provider,
        }
    }

    /// Route one message to its peer's channel, creating and starting the
    /// channel on first contact. A channel that died stays in place, and
    /// swallows its peer's traffic, until `reap` removes it.
    pub fn dispatch(&self, id: ChannelId, msg: VoiceMessage) -> anyhow::Result<()> {
        let channel = {
            let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
            match channels.get(&id) {
                Some(ch) => ch.clone(),
                None => {
                    let ch = Arc::new(Channel::new(id, self.config.clone()));
                    ch.start(self.provider.clone())?;
                    log::info!("New voice channel {}", id);
                    channels.insert(id, ch.clone());
                    ch
                }
            }
        };
        if channel.is_terminated() {
            log::trace!("Dropping voice for terminated channel {}", id);
            return Ok(());
        }
        channel.enqueue(msg);
        Ok(())
    }

    /// Shut down and forget channels that timed out or terminated.
    /// Returns the ids that were removed.
    pub fn reap(&self) -> Vec<ChannelId> {
        let dead: Vec<Arc<Channel>> = {
            let mut channels = self.channels.lock().unwrap_or_else(|e| e.into_inner());
            let ids: Vec<ChannelId> = channels
                .iter()
                .filter(|(_, ch)| ch.is_idle_timeout() || ch.is_terminated())
                .map(|(id, _)| *id)
                .collect();
            ids.iter().filter_map(|id| channels.remove(id)).collect()
        };

        // join outside the registry lock
        dead.iter()
            .map(|ch| {
                ch.shutdown();
                log::info!("Reaped voice channel {}", ch.id());
                ch.id()
            })
            .collect()
    }

    pub fn get(&self, id: ChannelId) -> Option<Arc<Channel>> {
        self.channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.channels.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn shutdown_all(&self) {
        let all: Vec<Arc<Channel>> = self
            .channels
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain()
            .map(|(_, ch)| ch)
            .collect();
        for ch in all {
            ch.shutdown();
        }
    }
}

pub struct VoiceReceiver {
    socket: Arc<UdpSocket>,
    buffer_size: usize,
    registry: Arc<ChannelRegistry>,
}

impl VoiceReceiver {
    pub async fn new(config: &Config, registry: Arc<ChannelRegistry>) -> anyhow::Result<Self> {
        let socket = UdpSocket::bind(format!(
            "{}:{}",
            config.receiver_local_ip, config.receiver_local_port
        ))
        .await?;
        Ok(Self::from_socket(socket, config.receiver_buffer_size, registry))
    }

    pub fn from_socket(
        socket: UdpSocket,
        buffer_size: usize,
        registry: Arc<ChannelRegistry>,
    ) -> Self {
        Self {
            socket: Arc::new(socket),
            buffer_size,
            registry,
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub async fn run(&self) -> anyhow::Result<()> {
        let mut buf = vec![0u8; self.buffer_size];
        loop {
            let (len, peer) = self.socket.recv_from(&mut buf).await?;
            let Some(msg) = VoiceMessage::from_datagram(&buf[..len]) else {
                continue;
            };
            let id = channel_id(&peer);
            if let Err(e) = self.registry.dispatch(id, msg) {
                log::error!("Failed to dispatch voice from {} (channel {}): {}", peer, id, e);
            }
        }
    }
}
