//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（railvox.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::AppConfig;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["railvox", "railvox.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `RAILVOX_`，层级分隔符 `__`）
/// 2. 配置文件（railvox.toml 或 railvox.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `RAILVOX_TEMPLATE__SEED=42`
/// - `RAILVOX_VOICE__BASE_PATH=https://cdn.example/vox/en`
/// - `RAILVOX_PLAYBACK__SPEAK=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("template.document", "data/templates.json")?
        .set_default("template.database", "data/database.json")?
        .set_default("template.root", "root")?
        .set_default("voice.name", "default")?
        .set_default("voice.language", "en-GB")?
        .set_default("voice.base_path", "data/vox")?
        .set_default("playback.pump_interval_ms", 100)?
        .set_default("playback.max_pending_requests", 10)?
        .set_default("playback.max_scheduled_buffers", 5)?
        .set_default("playback.latency_correction_secs", 0.15)?
        .set_default("playback.speak", true)?
        .set_default("effects.reverb_amplitude", 0.3)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: RAILVOX_VOICE__NAME=female
    builder = builder.add_source(
        Environment::with_prefix("RAILVOX")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.template.document.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Template document path cannot be empty".to_string(),
        ));
    }

    if config.template.database.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "Reference database path cannot be empty".to_string(),
        ));
    }

    if config.template.root.is_empty() {
        return Err(ConfigError::ValidationError(
            "Root reference cannot be empty".to_string(),
        ));
    }

    if config.voice.base_path.is_empty() {
        return Err(ConfigError::ValidationError(
            "Voice base path cannot be empty".to_string(),
        ));
    }

    if config.playback.pump_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "Pump interval cannot be 0".to_string(),
        ));
    }

    if config.playback.max_pending_requests == 0 || config.playback.max_scheduled_buffers == 0 {
        return Err(ConfigError::ValidationError(
            "Request and buffer pool sizes must be at least 1".to_string(),
        ));
    }

    let correction = config.playback.latency_correction_secs;
    if correction.is_nan() || correction < 0.0 {
        return Err(ConfigError::ValidationError(
            "Latency correction cannot be negative".to_string(),
        ));
    }

    if config.effects.low_pass_hz == Some(0) {
        return Err(ConfigError::ValidationError(
            "Low-pass cutoff cannot be 0 Hz".to_string(),
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Template Document: {}", config.template.document.display());
    tracing::info!("Reference Database: {}", config.template.database.display());
    tracing::info!("Root Reference: {}", config.template.root);
    if let Some(seed) = config.template.seed {
        tracing::info!("Seed: {}", seed);
    }
    tracing::info!(
        "Voice: {} ({}) at {}",
        config.voice.name,
        config.voice.language,
        config.voice.base_path
    );
    tracing::info!("Speak: {}", config.playback.speak);
    if config.playback.speak {
        tracing::info!("Pump Interval: {}ms", config.playback.pump_interval_ms);
        tracing::info!(
            "Pools: {} pending / {} scheduled",
            config.playback.max_pending_requests,
            config.playback.max_scheduled_buffers
        );
        tracing::info!("Latency Correction: {}s", config.playback.latency_correction_secs);
    }
    if let Some(hz) = config.effects.low_pass_hz {
        tracing::info!("Low-pass: {}Hz", hz);
    }
    if let Some(ms) = config.effects.reverb_ms {
        tracing::info!("Reverb: {}ms x{}", ms, config.effects.reverb_amplitude);
    }
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_passes_for_default_config() {
        let config = AppConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_validation_error_for_zero_pump_interval() {
        let mut config = AppConfig::default();
        config.playback.pump_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_pools() {
        let mut config = AppConfig::default();
        config.playback.max_scheduled_buffers = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_negative_latency() {
        let mut config = AppConfig::default();
        config.playback.latency_correction_secs = -0.1;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_empty_voice_path() {
        let mut config = AppConfig::default();
        config.voice.base_path = String::new();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("railvox.toml");
        std::fs::write(
            &path,
            r#"
[template]
root = "departure"
seed = 42

[voice]
name = "female"
base_path = "https://cdn.example/vox/en"

[effects]
low_pass_hz = 3000
"#,
        )
        .unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.template.root, "departure");
        assert_eq!(config.template.seed, Some(42));
        assert_eq!(config.voice.name, "female");
        assert_eq!(config.voice.language, "en-GB");
        assert!(config.voice.voice().is_remote());
        assert_eq!(config.effects.low_pass_hz, Some(3000));
        assert_eq!(config.playback.max_pending_requests, 10);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("railvox.toml");
        std::fs::write(&path, "[playback]\npump_interval_ms = 0\n").unwrap();

        assert!(matches!(
            load_config_from_path(Some(&path)),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert!(load_config_from_path(Some(&path)).is_err());
    }
}
