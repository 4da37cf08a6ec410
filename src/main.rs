use std::sync::Arc;
use std::time::Duration;

use tokio::signal;
use voicechat_playback::audio::{ChannelConfig, SinkProvider};
use voicechat_playback::config::Config;
use voicechat_playback::receiver::{ChannelRegistry, VoiceReceiver};

#[cfg(feature = "alsa")]
fn sink_provider(config: &Config) -> Arc<dyn SinkProvider> {
    Arc::new(voicechat_playback::audio::AlsaSinkProvider::new(config.playback_device))
}

#[cfg(not(feature = "alsa"))]
fn sink_provider(_config: &Config) -> Arc<dyn SinkProvider> {
    log::warn!("Built without the `alsa` feature, audio is paced but not played");
    Arc::new(voicechat_playback::audio::PacedSinkProvider)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    env_logger::init();

    // 加载配置
    let config = Config::new().unwrap_or_default();
    log::info!("{} v{} starting", config.app_name, config.app_version);

    let channel_config = ChannelConfig::from(&config);
    log::info!(
        "Playback format: {} Hz, {} bit, {} ch, idle timeout {:?}",
        channel_config.format.sample_rate,
        channel_config.format.sample_bits,
        channel_config.format.channels,
        channel_config.idle_timeout,
    );

    let registry = Arc::new(ChannelRegistry::new(channel_config, sink_provider(&config)));

    let receiver = VoiceReceiver::new(&config, registry.clone()).await?;
    log::info!("Listening for voice on {}", receiver.local_addr()?);
    let receiver_task = tokio::spawn(async move {
        if let Err(e) = receiver.run().await {
            log::error!("VoiceReceiver error: {}", e);
        }
    });

    // 定期回收空闲通道
    let reaper_registry = registry.clone();
    let reap_interval = Duration::from_millis(config.reap_interval_ms);
    let reaper_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(reap_interval);
        loop {
            ticker.tick().await;
            let registry = reaper_registry.clone();
            match tokio::task::spawn_blocking(move || registry.reap()).await {
                Ok(reaped) if !reaped.is_empty() => {
                    log::debug!("Reaped {} idle channel(s)", reaped.len());
                }
                Ok(_) => {}
                Err(e) => log::error!("Reaper task failed: {}", e),
            }
        }
    });

    signal::ctrl_c().await?;
    log::info!("Ctrl-C received, shutting down");

    receiver_task.abort();
    reaper_task.abort();
    tokio::task::spawn_blocking(move || registry.shutdown_all()).await?;

    log::info!("Bye");
    Ok(())
}
