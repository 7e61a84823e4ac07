//! Clip Source Port - 语音片段获取抽象
//!
//! 按完整路径（本地文件或 URL）获取片段的原始字节，
//! 具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;

/// 片段获取 / 解码错误
///
/// 由调度器吸收：缺失或损坏的片段直接跳过
#[derive(Debug, Clone, Error)]
pub enum ClipError {
    #[error("Clip not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decoding error: {0}")]
    Decode(String),

    #[error("Request cancelled")]
    Cancelled,
}

/// Clip Source Port
#[async_trait]
pub trait ClipSourcePort: Send + Sync {
    /// 获取片段字节
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ClipError>;
}
