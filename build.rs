use std::fs;
use std::path::Path;
use serde::Deserialize;

#[derive(Deserialize)]
struct Config {
    application: Application,
    playback: Playback,
    receiver: Receiver,
}

#[derive(Deserialize)]
struct Application {
    name: String,
    version: String,
}

#[derive(Deserialize)]
struct Playback {
    device: String,
    sample_rate: u32,
    sample_bits: u16,
    channels: u16,
    big_endian: bool,
    default_packet_len: usize,
    idle_timeout_ms: u64,
    idle_poll_ms: u64,
}

#[derive(Deserialize)]
struct Receiver {
    local_ip: String,
    local_port: u16,
    buffer_size: usize,
    reap_interval_ms: u64,
}

// 在编译时读取 config.toml 并设置环境变量
fn main() {
    println!("cargo:rerun-if-changed=config.toml");

    let config_path = Path::new("config.toml");
    if !config_path.exists() {
        panic!("config.toml not found!");
    }

    let config_str = fs::read_to_string(config_path).expect("Failed to read config.toml");
    let config: Config = toml::from_str(&config_str).expect("Failed to parse config.toml");

    println!("cargo:rustc-env=APP_NAME={}", config.application.name);
    println!("cargo:rustc-env=APP_VERSION={}", config.application.version);

    // 播放配置
    println!("cargo:rustc-env=PLAYBACK_DEVICE={}", config.playback.device);
    println!("cargo:rustc-env=PLAYBACK_SAMPLE_RATE={}", config.playback.sample_rate);
    println!("cargo:rustc-env=PLAYBACK_SAMPLE_BITS={}", config.playback.sample_bits);
    println!("cargo:rustc-env=PLAYBACK_CHANNELS={}", config.playback.channels);
    println!("cargo:rustc-env=PLAYBACK_BIG_ENDIAN={}", config.playback.big_endian);
    println!("cargo:rustc-env=PLAYBACK_DEFAULT_PACKET_LEN={}", config.playback.default_packet_len);
    println!("cargo:rustc-env=PLAYBACK_IDLE_TIMEOUT_MS={}", config.playback.idle_timeout_ms);
    println!("cargo:rustc-env=PLAYBACK_IDLE_POLL_MS={}", config.playback.idle_poll_ms);

    // 接收端配置
    println!("cargo:rustc-env=RECEIVER_LOCAL_IP={}", config.receiver.local_ip);
    println!("cargo:rustc-env=RECEIVER_LOCAL_PORT={}", config.receiver.local_port);
    println!("cargo:rustc-env=RECEIVER_BUFFER_SIZE={}", config.receiver.buffer_size);
    println!("cargo:rustc-env=RECEIVER_REAP_INTERVAL_MS={}", config.receiver.reap_interval_ms);
}
