//! Audio Output Port - 音频输出图抽象
//!
//! 输出图接受已解码的缓冲区，在指定的输出时钟时刻开始播放

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Audio device error: {0}")]
    Device(String),

    #[error("Playback error: {0}")]
    Playback(String),
}

/// 已解码的线性 PCM 缓冲区（交错 f32）
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioBuffer {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// 时长（秒）
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// 已接入输出图的播放节点
pub trait PlaybackNode: Send {
    /// 播放是否已结束（含被停止）
    fn is_finished(&self) -> bool;

    /// 立即停止并断开
    fn stop(&mut self);
}

/// Audio Output Port
///
/// 由调度器独占；时间单位均为秒，基于输出设备自身的时钟
pub trait AudioOutputPort {
    /// 输出时钟当前时刻
    fn current_time(&self) -> f64;

    /// 设备固有的输出延迟
    fn base_latency(&self) -> f64 {
        0.0
    }

    /// 创建缓冲源节点并在 `start` 时刻开始播放
    fn play_at(&mut self, buffer: AudioBuffer, start: f64) -> Result<Box<dyn PlaybackNode>, OutputError>;
}
