//! Per-peer playback channel.
//!
//! A channel is a mailbox that the network side fills and a dedicated OS
//! thread that drains it into an audio sink at the device's pace. Uses
//! std::thread (NOT tokio tasks) because sink writes block in real time.
//!
//! ```text
//! enqueue() ──► mailbox ──► playback thread ──► decompress / comfort noise ──► sink
//!                                 ▲
//!            shutdown() ── running flag + condvar wakeup
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use super::clock::{Clock, SystemClock};
use super::codec::{GzipCodec, PayloadCodec};
use super::concealment::{ComfortNoise, DEFAULT_PACKET_LEN};
use super::error::{ChannelError, ChannelResult};
use super::sink::{AudioFormat, AudioSink, SinkProvider};
use crate::config::Config;
use crate::protocol::{SoundPacket, VoiceMessage};

/// Identifies a remote peer. Derived by the receiver, used for logging only.
pub type ChannelId = u64;

pub const IDLE_TIMEOUT: Duration = Duration::from_secs(5);
pub const IDLE_POLL: Duration = Duration::from_millis(10);

/// Per-channel playback settings.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Output format the sink is opened with
    pub format: AudioFormat,
    /// Comfort noise length before any packet has played
    pub default_packet_len: usize,
    /// No dequeue for longer than this and the channel may be reaped
    pub idle_timeout: Duration,
    /// Longest wait on an empty mailbox before re-checking
    pub idle_poll: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            format: AudioFormat::default(),
            default_packet_len: DEFAULT_PACKET_LEN,
            idle_timeout: IDLE_TIMEOUT,
            idle_poll: IDLE_POLL,
        }
    }
}

impl From<&Config> for ChannelConfig {
    fn from(config: &Config) -> Self {
        Self {
            format: AudioFormat::from(config),
            default_packet_len: config.default_packet_len,
            idle_timeout: Duration::from_millis(config.idle_timeout_ms),
            idle_poll: Duration::from_millis(config.idle_poll_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChannelState {
    /// Created, playback thread not spawned yet
    Created = 0,
    Running = 1,
    /// Stopped by error or shutdown; never restarts
    Terminated = 2,
}

impl ChannelState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => ChannelState::Created,
            1 => ChannelState::Running,
            _ => ChannelState::Terminated,
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the channel handle and its playback thread.
struct Shared {
    id: ChannelId,
    config: ChannelConfig,
    mailbox: Mutex<VecDeque<VoiceMessage>>,
    wakeup: Condvar,
    running: AtomicBool,
    state: AtomicU8,
    sink: Mutex<Option<Box<dyn AudioSink>>>,
    clock: Arc<dyn Clock>,
    epoch: Instant,
    /// Nanoseconds after `epoch` of the last dequeue
    last_dequeue: AtomicU64,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn elapsed_nanos(&self) -> u64 {
        self.clock.now().saturating_duration_since(self.epoch).as_nanos() as u64
    }

    fn touch(&self) {
        self.last_dequeue.store(self.elapsed_nanos(), Ordering::Release);
    }

    /// Pop the mailbox head, waiting at most one idle poll interval for it.
    fn next_message(&self) -> Option<VoiceMessage> {
        let mut mailbox = lock(&self.mailbox);
        if mailbox.is_empty() {
            if !self.is_running() {
                return None;
            }
            mailbox = self
                .wakeup
                .wait_timeout(mailbox, self.config.idle_poll)
                .map(|(guard, _)| guard)
                .unwrap_or_else(|e| e.into_inner().0);
        }
        let msg = mailbox.pop_front()?;
        drop(mailbox);
        self.touch();
        Some(msg)
    }

    /// Hand the opened sink over. Returns false (and closes it) when a
    /// shutdown already happened.
    fn install_sink(&self, mut sink: Box<dyn AudioSink>) -> bool {
        let mut slot = lock(&self.sink);
        if !self.is_running() {
            sink.close();
            return false;
        }
        *slot = Some(sink);
        true
    }

    fn write(&self, pcm: &[u8]) -> ChannelResult<()> {
        let mut slot = lock(&self.sink);
        // no writes once cancellation was requested
        if !self.is_running() {
            return Ok(());
        }
        match slot.as_mut() {
            Some(sink) => sink.write(pcm).map_err(ChannelError::SinkWriteFailure),
            None => Ok(()),
        }
    }

    fn release_sink(&self) {
        let sink = lock(&self.sink).take();
        if let Some(mut sink) = sink {
            sink.close();
            log::debug!("Channel {} released audio sink", self.id);
        }
    }
}

/// Decode side of the playback thread.
struct Player<'a> {
    shared: &'a Shared,
    codec: Box<dyn PayloadCodec>,
    noise: ComfortNoise,
}

impl Player<'_> {
    fn run(&mut self, provider: &dyn SinkProvider) -> ChannelResult<()> {
        let id = self.shared.id;
        let format = self.shared.config.format;

        let mut sink = provider.open(&format).map_err(ChannelError::SinkUnavailable)?;
        if let Err(e) = sink.start() {
            sink.close();
            return Err(ChannelError::SinkUnavailable(e));
        }
        if !self.shared.install_sink(sink) {
            return Ok(());
        }

        log::info!(
            "Channel {} playback started: rate={}, bits={}, ch={}",
            id,
            format.sample_rate,
            format.sample_bits,
            format.channels,
        );

        while self.shared.is_running() {
            if let Some(msg) = self.shared.next_message() {
                self.play(msg)?;
            }
        }
        Ok(())
    }

    fn play(&mut self, msg: VoiceMessage) -> ChannelResult<()> {
        match msg {
            VoiceMessage::Sound(SoundPacket {
                payload: Some(block),
            }) => {
                let pcm = self
                    .codec
                    .decompress(&block)
                    .map_err(ChannelError::CorruptPayload)?;
                if pcm.is_empty() {
                    return Ok(());
                }
                self.shared.write(&pcm)?;
                self.noise.record_played(pcm.len());
            }
            VoiceMessage::Sound(SoundPacket { payload: None }) => {
                // 发送端丢包，播放舒适噪声
                let noise = self.noise.generate();
                log::trace!("Channel {} concealing lost packet ({} bytes)", self.shared.id, noise.len());
                self.shared.write(&noise)?;
            }
            VoiceMessage::Control(ctrl) => {
                log::debug!(
                    "Channel {} dropping non-sound message '{}'",
                    self.shared.id,
                    ctrl.msg_type
                );
            }
        }
        Ok(())
    }
}

fn playback_thread(
    shared: Arc<Shared>,
    provider: Arc<dyn SinkProvider>,
    codec: Box<dyn PayloadCodec>,
) {
    let mut player = Player {
        shared: &shared,
        codec,
        noise: ComfortNoise::new(shared.config.default_packet_len, shared.config.format),
    };

    match player.run(provider.as_ref()) {
        Ok(()) => log::info!("Channel {} playback stopped", shared.id),
        Err(e) => log::error!("Channel {} error: {}", shared.id, e),
    }

    // single cleanup path for errors and shutdown alike
    shared.running.store(false, Ordering::Release);
    shared.release_sink();
    shared
        .state
        .store(ChannelState::Terminated as u8, Ordering::Release);
}

/// Playback channel for one remote peer.
pub struct Channel {
    shared: Arc<Shared>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Channel {
    pub fn new(id: ChannelId, config: ChannelConfig) -> Self {
        Self::with_clock(id, config, Arc::new(SystemClock))
    }

    pub fn with_clock(id: ChannelId, config: ChannelConfig, clock: Arc<dyn Clock>) -> Self {
        let epoch = clock.now();
        Self {
            shared: Arc::new(Shared {
                id,
                config,
                mailbox: Mutex::new(VecDeque::new()),
                wakeup: Condvar::new(),
                running: AtomicBool::new(true),
                state: AtomicU8::new(ChannelState::Created as u8),
                sink: Mutex::new(None),
                clock,
                epoch,
                last_dequeue: AtomicU64::new(0),
            }),
            handle: Mutex::new(None),
        }
    }

    pub fn id(&self) -> ChannelId {
        self.shared.id
    }

    pub fn state(&self) -> ChannelState {
        ChannelState::from_u8(self.shared.state.load(Ordering::Acquire))
    }

    pub fn is_terminated(&self) -> bool {
        self.state() == ChannelState::Terminated
    }

    /// Number of messages waiting to be played.
    pub fn pending(&self) -> usize {
        lock(&self.shared.mailbox).len()
    }

    /// Start playback with gzip payloads.
    pub fn start(&self, provider: Arc<dyn SinkProvider>) -> ChannelResult<()> {
        self.start_with_codec(provider, Box::new(GzipCodec))
    }

    /// Spawn the playback thread. The sink is opened on that thread.
    pub fn start_with_codec(
        &self,
        provider: Arc<dyn SinkProvider>,
        codec: Box<dyn PayloadCodec>,
    ) -> ChannelResult<()> {
        let mut handle = lock(&self.handle);
        if let Err(current) = self.shared.state.compare_exchange(
            ChannelState::Created as u8,
            ChannelState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            return match ChannelState::from_u8(current) {
                ChannelState::Terminated => Err(ChannelError::Dead(self.id())),
                _ => Err(ChannelError::AlreadyStarted(self.id())),
            };
        }

        let shared = self.shared.clone();
        let spawned = thread::Builder::new()
            .name(format!("voice-ch-{}", self.id()))
            .spawn(move || playback_thread(shared, provider, codec));

        match spawned {
            Ok(h) => {
                *handle = Some(h);
                Ok(())
            }
            Err(e) => {
                self.shared.running.store(false, Ordering::Release);
                self.shared
                    .state
                    .store(ChannelState::Terminated as u8, Ordering::Release);
                Err(ChannelError::Spawn(e))
            }
        }
    }

    /// Append to the mailbox tail. Never blocks on playback.
    pub fn enqueue(&self, msg: impl Into<VoiceMessage>) {
        lock(&self.shared.mailbox).push_back(msg.into());
        self.shared.wakeup.notify_one();
    }

    /// True once nothing was dequeued for longer than the idle timeout.
    pub fn is_idle_timeout(&self) -> bool {
        let last = self.shared.last_dequeue.load(Ordering::Acquire);
        let idle = self.shared.elapsed_nanos().saturating_sub(last);
        Duration::from_nanos(idle) > self.shared.config.idle_timeout
    }

    /// Release the sink and stop the playback thread. Safe to call repeatedly
    /// and before `start`.
    pub fn shutdown(&self) {
        let was_running = self.shared.running.swap(false, Ordering::AcqRel);
        {
            let _mailbox = lock(&self.shared.mailbox);
            self.shared.wakeup.notify_all();
        }
        self.shared.release_sink();

        let handle = lock(&self.handle).take();
        if let Some(h) = handle {
            let _ = h.join();
        }
        self.shared
            .state
            .store(ChannelState::Terminated as u8, Ordering::Release);

        if was_running {
            log::info!("Channel {} shut down", self.id());
        }
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("pending", &self.pending())
            .finish()
    }
}
