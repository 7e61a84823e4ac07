//! 应用层 - 用例编排
//!
//! 包含：
//! - engine: 模板展开引擎
//! - resolver: Token 解析器
//! - session: 播报会话（持有上下文状态与随机源）
//! - playback: 片段请求与播放调度
//! - ports: 六边形架构端口定义（ClipSource、ClipDecoder、AudioOutput）
//! - error: 应用层错误定义

pub mod engine;
pub mod error;
pub mod playback;
pub mod ports;
pub mod resolver;
pub mod session;

// Re-exports
pub use engine::{GenerateError, TemplateEngine};
pub use error::ApplicationError;
pub use playback::{ClipRequest, PlaybackScheduler, SchedulerConfig, SchedulerState};
pub use ports::{
    AudioBuffer, AudioOutputPort, ClipDecoderPort, ClipError, ClipSourcePort, OutputError,
    PlaybackNode,
};
pub use resolver::{ResolveError, TokenResolver};
pub use session::AnnouncementSession;
