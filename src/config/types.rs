//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::application::playback::SchedulerConfig;
use crate::domain::vox::Voice;
use crate::infrastructure::adapters::EffectsConfig;

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 模板与参考数据
    #[serde(default)]
    pub template: TemplateConfig,

    /// 声音配置
    #[serde(default)]
    pub voice: VoiceConfig,

    /// 播放调度配置
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// 音效配置
    #[serde(default)]
    pub effects: EffectsSettings,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 模板配置
#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    /// 模板文档路径（JSON）
    #[serde(default = "default_document")]
    pub document: PathBuf,

    /// 参考数据库路径（JSON）
    #[serde(default = "default_database")]
    pub database: PathBuf,

    /// 根引用
    #[serde(default = "default_root")]
    pub root: String,

    /// 随机种子；设置后生成结果可复现
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_document() -> PathBuf {
    PathBuf::from("data/templates.json")
}

fn default_database() -> PathBuf {
    PathBuf::from("data/database.json")
}

fn default_root() -> String {
    "root".to_string()
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            document: default_document(),
            database: default_database(),
            root: default_root(),
            seed: None,
        }
    }
}

/// 声音配置
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceConfig {
    /// 声音名称
    #[serde(default = "default_voice_name")]
    pub name: String,

    /// 语言标签（BCP-47）
    #[serde(default = "default_language")]
    pub language: String,

    /// 片段目录：本地路径或 http(s) URL
    #[serde(default = "default_base_path")]
    pub base_path: String,
}

fn default_voice_name() -> String {
    "default".to_string()
}

fn default_language() -> String {
    "en-GB".to_string()
}

fn default_base_path() -> String {
    "data/vox".to_string()
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            name: default_voice_name(),
            language: default_language(),
            base_path: default_base_path(),
        }
    }
}

impl VoiceConfig {
    pub fn voice(&self) -> Voice {
        Voice::new(&self.name, &self.language, &self.base_path)
    }
}

/// 播放调度配置
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// 轮询间隔（毫秒）
    #[serde(default = "default_pump_interval")]
    pub pump_interval_ms: u64,

    /// 同时获取中的请求上限
    #[serde(default = "default_max_pending")]
    pub max_pending_requests: usize,

    /// 同时已调度的缓冲区上限
    #[serde(default = "default_max_scheduled")]
    pub max_scheduled_buffers: usize,

    /// 输出延迟修正（秒）
    #[serde(default = "default_latency_correction")]
    pub latency_correction_secs: f64,

    /// 生成后是否播放
    #[serde(default = "default_speak")]
    pub speak: bool,
}

fn default_pump_interval() -> u64 {
    100
}

fn default_max_pending() -> usize {
    10
}

fn default_max_scheduled() -> usize {
    5
}

fn default_latency_correction() -> f64 {
    0.15
}

fn default_speak() -> bool {
    true
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pump_interval_ms: default_pump_interval(),
            max_pending_requests: default_max_pending(),
            max_scheduled_buffers: default_max_scheduled(),
            latency_correction_secs: default_latency_correction(),
            speak: default_speak(),
        }
    }
}

impl PlaybackConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            pump_interval: Duration::from_millis(self.pump_interval_ms),
            max_pending: self.max_pending_requests,
            max_scheduled: self.max_scheduled_buffers,
            latency_correction: self.latency_correction_secs,
        }
    }
}

/// 音效配置
#[derive(Debug, Clone, Deserialize)]
pub struct EffectsSettings {
    /// 低通截止频率（Hz），不设置则不过滤
    #[serde(default)]
    pub low_pass_hz: Option<u32>,

    /// 混响延迟（毫秒），不设置则无混响
    #[serde(default)]
    pub reverb_ms: Option<u64>,

    /// 混响增益
    #[serde(default = "default_reverb_amplitude")]
    pub reverb_amplitude: f32,
}

fn default_reverb_amplitude() -> f32 {
    0.3
}

impl Default for EffectsSettings {
    fn default() -> Self {
        Self {
            low_pass_hz: None,
            reverb_ms: None,
            reverb_amplitude: default_reverb_amplitude(),
        }
    }
}

impl EffectsSettings {
    pub fn effects_config(&self) -> EffectsConfig {
        EffectsConfig {
            low_pass_hz: self.low_pass_hz,
            reverb: self.reverb_ms.map(Duration::from_millis),
            reverb_amplitude: self.reverb_amplitude,
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
