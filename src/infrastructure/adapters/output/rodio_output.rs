//! Rodio Output - 基于 rodio 的音频输出
//!
//! 每个缓冲区一个 Sink，起播时刻之前用静音补齐；
//! 可选效果链：低通滤波 → 混响

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamHandle, Sink, Source};
use std::time::{Duration, Instant};

use crate::application::ports::{AudioBuffer, AudioOutputPort, OutputError, PlaybackNode};

/// 效果链配置
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectsConfig {
    /// 低通截止频率（Hz）
    pub low_pass_hz: Option<u32>,
    /// 混响延迟
    pub reverb: Option<Duration>,
    /// 混响增益
    pub reverb_amplitude: f32,
}

impl EffectsConfig {
    pub fn is_enabled(&self) -> bool {
        self.low_pass_hz.is_some() || self.reverb.is_some()
    }
}

/// Rodio 输出
///
/// 持有默认输出设备；时钟从创建时刻起算
pub struct RodioOutput {
    // 设备流必须存活，否则所有 Sink 静音
    _stream: OutputStream,
    handle: OutputStreamHandle,
    epoch: Instant,
    effects: EffectsConfig,
}

impl RodioOutput {
    /// 打开默认输出设备
    pub fn open(effects: EffectsConfig) -> Result<Self, OutputError> {
        let (stream, handle) =
            OutputStream::try_default().map_err(|e| OutputError::Device(e.to_string()))?;

        tracing::info!(
            low_pass_hz = ?effects.low_pass_hz,
            reverb = ?effects.reverb,
            "Audio output opened"
        );

        Ok(Self {
            _stream: stream,
            handle,
            epoch: Instant::now(),
            effects,
        })
    }
}

/// 按配置串联效果链：低通 → 混响
pub fn apply_effects<S>(source: S, effects: &EffectsConfig) -> Box<dyn Source<Item = f32> + Send>
where
    S: Source<Item = f32> + Send + 'static,
{
    let mut source: Box<dyn Source<Item = f32> + Send> = Box::new(source);
    if let Some(hz) = effects.low_pass_hz {
        source = Box::new(source.low_pass(hz));
    }
    if let Some(delay) = effects.reverb {
        // 混响需要可克隆的源
        source = Box::new(source.buffered().reverb(delay, effects.reverb_amplitude));
    }
    source
}

impl AudioOutputPort for RodioOutput {
    fn current_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn play_at(&mut self, buffer: AudioBuffer, start: f64) -> Result<Box<dyn PlaybackNode>, OutputError> {
        let sink = Sink::try_new(&self.handle).map_err(|e| OutputError::Playback(e.to_string()))?;

        let source = SamplesBuffer::new(buffer.channels, buffer.sample_rate, buffer.samples);
        let wait = (start - self.current_time()).max(0.0);
        let source = apply_effects(source, &self.effects).delay(Duration::from_secs_f64(wait));

        sink.append(source);
        Ok(Box::new(RodioNode { sink }))
    }
}

struct RodioNode {
    sink: Sink,
}

impl PlaybackNode for RodioNode {
    fn is_finished(&self) -> bool {
        self.sink.empty()
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effects_enabled() {
        assert!(!EffectsConfig::default().is_enabled());
        let effects = EffectsConfig {
            low_pass_hz: Some(3_000),
            ..Default::default()
        };
        assert!(effects.is_enabled());
    }

    fn ramp() -> SamplesBuffer<f32> {
        let samples = (0..1_000).map(|i| (i % 50) as f32 / 50.0 - 0.5).collect::<Vec<_>>();
        SamplesBuffer::new(1, 1_000, samples)
    }

    #[test]
    fn test_no_effects_passes_samples_through() {
        let source = apply_effects(ramp(), &EffectsConfig::default());
        let out: Vec<f32> = source.collect();
        let expected: Vec<f32> = ramp().collect();
        assert_eq!(out, expected);
    }

    #[test]
    fn test_full_effects_chain() {
        let effects = EffectsConfig {
            low_pass_hz: Some(200),
            reverb: Some(Duration::from_millis(20)),
            reverb_amplitude: 0.3,
        };
        let source = apply_effects(ramp(), &effects);
        assert_eq!(source.channels(), 1);
        assert_eq!(source.sample_rate(), 1_000);

        let out: Vec<f32> = source.collect();
        assert!(out.len() >= 1_000);
        assert!(out.iter().all(|s| s.is_finite()));
    }
}
