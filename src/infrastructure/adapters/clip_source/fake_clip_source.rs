//! Fake Clip Source - 用于测试的片段源
//!
//! 按片段 ID 返回合成的静音 WAV，可配置获取延迟；未配置的 ID 视为缺失

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::application::ports::{ClipError, ClipSourcePort};

/// 合成 WAV 的采样率
pub const FAKE_SAMPLE_RATE: u32 = 8_000;

#[derive(Debug, Clone, Copy)]
struct FakeClip {
    duration_secs: f64,
    delay_ms: u64,
}

/// Fake Clip Source
///
/// 片段 ID 取自路径的文件名（去掉 `.mp3`），与声音目录无关
#[derive(Debug, Default)]
pub struct FakeClipSource {
    clips: HashMap<String, FakeClip>,
    fetches: AtomicUsize,
}

impl FakeClipSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个片段：时长（秒）与获取延迟（毫秒）
    pub fn with_clip(mut self, clip_id: &str, duration_secs: f64, delay_ms: u64) -> Self {
        self.clips.insert(
            clip_id.to_string(),
            FakeClip {
                duration_secs,
                delay_ms,
            },
        );
        self
    }

    /// 已发起的获取次数
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClipSourcePort for FakeClipSource {
    async fn fetch(&self, path: &str) -> Result<Vec<u8>, ClipError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        let clip_id = Path::new(path)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(path);
        let clip = *self
            .clips
            .get(clip_id)
            .ok_or_else(|| ClipError::NotFound(path.to_string()))?;

        if clip.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(clip.delay_ms)).await;
        }

        let frames = (clip.duration_secs * FAKE_SAMPLE_RATE as f64).round() as usize;
        Ok(encode_wav(&vec![0.0; frames], FAKE_SAMPLE_RATE, 1))
    }
}

/// 将 PCM f32 样本编码为 16-bit WAV
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Vec<u8> {
    let bits_per_sample: u16 = 16;
    let byte_rate = sample_rate * channels as u32 * (bits_per_sample / 8) as u32;
    let block_align = channels * (bits_per_sample / 8);

    let data_size = samples.len() * 2;
    let file_size = 36 + data_size;

    let mut wav = Vec::with_capacity(44 + data_size);

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(file_size as u32).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&sample_rate.to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&(data_size as u32).to_le_bytes());
    for &s in samples {
        let sample = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
        wav.extend_from_slice(&sample.to_le_bytes());
    }

    wav
}
