//! Clip Decoder Port - 音频解码抽象

use super::{AudioBuffer, ClipError};

/// Clip Decoder Port
///
/// 将压缩音频（MP3 / WAV）解码为交错的 f32 PCM；同步执行，调用方负责放到阻塞线程
pub trait ClipDecoderPort: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<AudioBuffer, ClipError>;
}
