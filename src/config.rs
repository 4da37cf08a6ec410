#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: &'static str,
    pub app_version: &'static str,

    // 播放配置
    pub playback_device: &'static str,
    pub playback_sample_rate: u32,
    pub playback_sample_bits: u16,
    pub playback_channels: u16,
    pub playback_big_endian: bool,
    pub default_packet_len: usize,
    pub idle_timeout_ms: u64,
    pub idle_poll_ms: u64,

    // 接收端配置
    pub receiver_local_ip: &'static str,
    pub receiver_local_port: u16,
    pub receiver_buffer_size: usize,
    pub reap_interval_ms: u64,
}

impl Config {
    /// 从编译时设置的环境变量创建配置
    /// 所有参数都在编译时从 config.toml 中读取
    pub fn new() -> Result<Self, &'static str> {
        Ok(Self {
            app_name: env!("APP_NAME"),
            app_version: env!("APP_VERSION"),

            playback_device: env!("PLAYBACK_DEVICE"),
            playback_sample_rate: env!("PLAYBACK_SAMPLE_RATE").parse()
                .map_err(|_| "Failed to parse PLAYBACK_SAMPLE_RATE")?,
            playback_sample_bits: env!("PLAYBACK_SAMPLE_BITS").parse()
                .map_err(|_| "Failed to parse PLAYBACK_SAMPLE_BITS")?,
            playback_channels: env!("PLAYBACK_CHANNELS").parse()
                .map_err(|_| "Failed to parse PLAYBACK_CHANNELS")?,
            playback_big_endian: env!("PLAYBACK_BIG_ENDIAN").parse()
                .map_err(|_| "Failed to parse PLAYBACK_BIG_ENDIAN")?,
            default_packet_len: env!("PLAYBACK_DEFAULT_PACKET_LEN").parse()
                .map_err(|_| "Failed to parse PLAYBACK_DEFAULT_PACKET_LEN")?,
            idle_timeout_ms: env!("PLAYBACK_IDLE_TIMEOUT_MS").parse()
                .map_err(|_| "Failed to parse PLAYBACK_IDLE_TIMEOUT_MS")?,
            idle_poll_ms: env!("PLAYBACK_IDLE_POLL_MS").parse()
                .map_err(|_| "Failed to parse PLAYBACK_IDLE_POLL_MS")?,

            receiver_local_ip: env!("RECEIVER_LOCAL_IP"),
            receiver_local_port: env!("RECEIVER_LOCAL_PORT").parse()
                .map_err(|_| "Failed to parse RECEIVER_LOCAL_PORT")?,
            receiver_buffer_size: env!("RECEIVER_BUFFER_SIZE").parse()
                .map_err(|_| "Failed to parse RECEIVER_BUFFER_SIZE")?,
            reap_interval_ms: env!("RECEIVER_REAP_INTERVAL_MS").parse()
                .map_err(|_| "Failed to parse RECEIVER_REAP_INTERVAL_MS")?,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new().expect("Failed to create default Config from build-time environment variables")
    }
}
