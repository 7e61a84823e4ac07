//! Railvox - 车站广播生成与播放
//!
//! 用法: `railvox [配置文件路径]`
//!
//! 加载模板与参考数据 → 生成一条播报 → 输出文本与 Token → 播放直至结束

use std::path::PathBuf;
use std::sync::Arc;

use railvox::application::{AnnouncementSession, PlaybackScheduler};
use railvox::config::{load_config_from_path, print_config, AppConfig};
use railvox::infrastructure::{RodioOutput, RoutingClipSource, SymphoniaDecoder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = load_config_from_path(config_path.as_deref())
        .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("Railvox - 车站广播生成与播放");
    print_config(&config);

    let mut session = AnnouncementSession::from_files(
        &config.template.document,
        &config.template.database,
        config.template.root.clone(),
        config.template.seed,
    )?;

    let text = session.generate()?.to_text();
    let tokens = session.tokens()?;

    println!("{}", text);
    println!("{}", serde_json::to_string(&tokens)?);

    if !config.playback.speak {
        return Ok(());
    }

    let source = Arc::new(RoutingClipSource::with_defaults()?);
    let output = RodioOutput::open(config.effects.effects_config())?;
    let mut scheduler = PlaybackScheduler::new(
        config.playback.scheduler_config(),
        source,
        Arc::new(SymphoniaDecoder::new()),
        Box::new(output),
    );

    scheduler.speak(tokens, config.voice.voice());

    let interrupted = tokio::select! {
        _ = scheduler.run_until_idle() => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    if interrupted {
        tracing::info!("Received shutdown signal");
        scheduler.stop();
    }

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let log_filter = format!("{},railvox={}", config.log.level, config.log.level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    // stdout 留给播报文本与 Token
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
