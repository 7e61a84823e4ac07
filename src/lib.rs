//! Railvox - 车站广播生成与播放系统
//!
//! 架构设计: DDD + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Grammar: 播报模板语法与模板文档
//! - Database: 车站、车次、致歉理由等参考数据
//! - Context: 上下文状态（每个 context-key 最近一次选取的值）
//! - Announcement / Vox: 具体播报树与语音 Token
//!
//! 应用层 (application/):
//! - Engine: 模板展开
//! - Resolver: 播报树 → 语音 Token
//! - Session: 显式会话对象
//! - Playback: 片段请求与播放调度
//! - Ports: 端口定义（ClipSource, ClipDecoder, AudioOutput）
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: 本地 / HTTP 片段源、symphonia 解码、rodio 输出

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use application::{AnnouncementSession, PlaybackScheduler};
pub use config::{load_config, AppConfig};
