#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use flate2::write::GzEncoder;
use flate2::Compression;
use voicechat_playback::audio::{AudioFormat, AudioSink, SinkProvider};

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::fast());
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Poll `cond` until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[derive(Default)]
pub struct Recorder {
    pub opens: AtomicUsize,
    pub starts: AtomicUsize,
    pub closes: AtomicUsize,
    pub writes: Mutex<Vec<Vec<u8>>>,
}

impl Recorder {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn write_count(&self) -> usize {
        self.writes.lock().unwrap().len()
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fail {
    Never,
    Open,
    Start,
    Write,
}

pub struct MockSink {
    recorder: Arc<Recorder>,
    fail: Fail,
    write_delay: Duration,
}

impl AudioSink for MockSink {
    fn start(&mut self) -> anyhow::Result<()> {
        self.recorder.starts.fetch_add(1, Ordering::SeqCst);
        if self.fail == Fail::Start {
            anyhow::bail!("device busy");
        }
        Ok(())
    }

    fn write(&mut self, pcm: &[u8]) -> anyhow::Result<()> {
        if self.fail == Fail::Write {
            anyhow::bail!("device unplugged");
        }
        // stands in for real-time device pacing
        thread::sleep(self.write_delay);
        self.recorder.writes.lock().unwrap().push(pcm.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.recorder.closes.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct MockProvider {
    pub recorder: Arc<Recorder>,
    pub fail: Fail,
    pub write_delay: Duration,
}

impl MockProvider {
    pub fn new(fail: Fail) -> (Arc<dyn SinkProvider>, Arc<Recorder>) {
        Self::with_delay(fail, Duration::ZERO)
    }

    /// Sink whose writes block for `write_delay` each.
    pub fn slow(write_delay: Duration) -> (Arc<dyn SinkProvider>, Arc<Recorder>) {
        Self::with_delay(Fail::Never, write_delay)
    }

    fn with_delay(fail: Fail, write_delay: Duration) -> (Arc<dyn SinkProvider>, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let provider: Arc<dyn SinkProvider> = Arc::new(MockProvider {
            recorder: recorder.clone(),
            fail,
            write_delay,
        });
        (provider, recorder)
    }
}

impl SinkProvider for MockProvider {
    fn open(&self, _format: &AudioFormat) -> anyhow::Result<Box<dyn AudioSink>> {
        self.recorder.opens.fetch_add(1, Ordering::SeqCst);
        if self.fail == Fail::Open {
            anyhow::bail!("no such device");
        }
        Ok(Box::new(MockSink {
            recorder: self.recorder.clone(),
            fail: self.fail,
            write_delay: self.write_delay,
        }))
    }
}
