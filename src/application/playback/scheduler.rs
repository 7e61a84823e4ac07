//! Playback Scheduler - 语音片段播放调度
//!
//! 将 Token 序列转换为首尾相接的音频播放：
//! - 请求按 Token 顺序进入 FIFO 队列，只检查队首，播放顺序与 Token 顺序严格一致
//! - 获取池（默认 10）与已调度池（默认 5）均有上限
//! - 静音 Token 只累加为下一片段的起播延迟
//!
//! 单线程轮询：所有调度决策都在 `tick` 中同步完成，
//! 异步部分只有片段获取与解码（见 `ClipRequest`）。

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::application::ports::{AudioOutputPort, ClipDecoderPort, ClipSourcePort, PlaybackNode};
use crate::domain::vox::{Voice, VoxToken};

use super::clip_request::ClipRequest;

/// 调度器配置
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 轮询间隔
    pub pump_interval: Duration,
    /// 同时获取中的请求上限
    pub max_pending: usize,
    /// 同时已调度的缓冲区上限
    pub max_scheduled: usize,
    /// 每个片段之后从运行时钟扣除的固定输出延迟修正（秒）
    pub latency_correction: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            pump_interval: Duration::from_millis(100),
            max_pending: 10,
            max_scheduled: 5,
            latency_correction: 0.15,
        }
    }
}

/// 调度器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Speaking,
}

/// 播放调度器
///
/// 独占音频输出图；同一时刻只有一段语音在播放
pub struct PlaybackScheduler {
    config: SchedulerConfig,
    source: Arc<dyn ClipSourcePort>,
    decoder: Arc<dyn ClipDecoderPort>,
    output: Box<dyn AudioOutputPort>,
    state: SchedulerState,
    voice: Option<Voice>,
    tokens: VecDeque<VoxToken>,
    pending: VecDeque<ClipRequest>,
    scheduled: Vec<Box<dyn PlaybackNode>>,
    /// 运行时钟：下一片段的基准起播时刻
    next_begin: Option<f64>,
    /// 已累计、尚未附着到片段的静音
    pending_delay: f32,
    utterance: Option<Uuid>,
}

impl PlaybackScheduler {
    pub fn new(
        config: SchedulerConfig,
        source: Arc<dyn ClipSourcePort>,
        decoder: Arc<dyn ClipDecoderPort>,
        output: Box<dyn AudioOutputPort>,
    ) -> Self {
        Self {
            config,
            source,
            decoder,
            output,
            state: SchedulerState::Idle,
            voice: None,
            tokens: VecDeque::new(),
            pending: VecDeque::new(),
            scheduled: Vec::new(),
            next_begin: None,
            pending_delay: 0.0,
            utterance: None,
        }
    }

    /// 开始播放一段语音；正在播放的内容先被完全取消
    pub fn speak(&mut self, tokens: Vec<VoxToken>, voice: Voice) -> Uuid {
        self.stop();

        let utterance = Uuid::new_v4();
        tracing::info!(
            utterance = %utterance,
            voice = %voice.name,
            tokens = tokens.len(),
            "Speaking started"
        );

        self.tokens = tokens.into();
        self.voice = Some(voice);
        self.utterance = Some(utterance);
        self.state = SchedulerState::Speaking;
        utterance
    }

    /// 立即停止：取消获取中的请求、停止已调度节点、清空队列并重置运行时钟
    pub fn stop(&mut self) {
        if self.state == SchedulerState::Idle && self.pending.is_empty() && self.scheduled.is_empty() {
            return;
        }

        for request in self.pending.drain(..) {
            request.cancel();
        }
        for mut node in self.scheduled.drain(..) {
            node.stop();
        }
        self.tokens.clear();
        self.next_begin = None;
        self.pending_delay = 0.0;
        self.state = SchedulerState::Idle;

        if let Some(utterance) = self.utterance.take() {
            tracing::info!(utterance = %utterance, "Speaking stopped");
        }
    }

    /// 单次轮询：调度 → 填充 → 终止判定
    pub fn tick(&mut self) -> SchedulerState {
        if self.state == SchedulerState::Idle {
            return self.state;
        }

        self.scheduled.retain(|node| !node.is_finished());
        self.schedule_step();
        self.fill_step();

        if self.tokens.is_empty() && self.pending.is_empty() && self.scheduled.is_empty() {
            self.state = SchedulerState::Idle;
            self.next_begin = None;
            self.pending_delay = 0.0;
            if let Some(utterance) = self.utterance.take() {
                tracing::info!(utterance = %utterance, "Speaking finished");
            }
        }
        self.state
    }

    /// 以固定间隔轮询直到空闲
    pub async fn run_until_idle(&mut self) {
        let mut interval = tokio::time::interval(self.config.pump_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while self.state == SchedulerState::Speaking {
            interval.tick().await;
            self.tick();
        }
    }

    fn schedule_step(&mut self) {
        // 失败的请求直接跳过，继续检查下一个，不留空隙
        while self.scheduled.len() < self.config.max_scheduled {
            let Some(head) = self.pending.front_mut() else {
                return;
            };
            if !head.is_done() {
                return;
            }
            let Some(mut request) = self.pending.pop_front() else {
                return;
            };

            let buffer = match request.take() {
                Some(Ok(buffer)) => buffer,
                Some(Err(e)) => {
                    tracing::debug!(path = %request.path(), error = %e, "Clip skipped");
                    continue;
                }
                None => continue,
            };

            let now = self.output.current_time();
            let begin = self.next_begin.map_or(now, |t| t.max(now));
            let delay = request.delay() as f64;
            let start = begin + delay;
            let duration = buffer.duration();

            match self.output.play_at(buffer, start) {
                Ok(node) => {
                    tracing::trace!(path = %request.path(), start, duration, "Clip scheduled");
                    self.scheduled.push(node);
                    self.next_begin = Some(
                        start + duration
                            - (self.output.base_latency() + self.config.latency_correction),
                    );
                }
                Err(e) => {
                    tracing::warn!(path = %request.path(), error = %e, "Failed to schedule clip");
                }
            }
            return;
        }
    }

    fn fill_step(&mut self) {
        let Some(voice) = self.voice.as_ref() else {
            return;
        };

        while self.pending.len() < self.config.max_pending {
            let Some(token) = self.tokens.pop_front() else {
                return;
            };
            match token {
                VoxToken::Silence(seconds) => self.pending_delay += seconds,
                VoxToken::Clip(id) => {
                    let request = ClipRequest::spawn(
                        voice.clip_path(&id),
                        self.pending_delay,
                        self.source.clone(),
                        self.decoder.clone(),
                    );
                    self.pending.push_back(request);
                    self.pending_delay = 0.0;
                }
            }
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn is_speaking(&self) -> bool {
        self.state == SchedulerState::Speaking
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn scheduled_count(&self) -> usize {
        self.scheduled.len()
    }

    pub fn remaining_tokens(&self) -> usize {
        self.tokens.len()
    }
}

impl Drop for PlaybackScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::{FakeClipSource, ManualClockOutput, SymphoniaDecoder};

    fn voice() -> Voice {
        Voice::new("test", "en-GB", "vox")
    }

    fn scheduler(source: FakeClipSource, output: ManualClockOutput) -> PlaybackScheduler {
        PlaybackScheduler::new(
            SchedulerConfig::default(),
            Arc::new(source),
            Arc::new(SymphoniaDecoder::new()),
            Box::new(output),
        )
    }

    /// 轮询直到条件满足，不推进输出时钟
    async fn pump_until(
        scheduler: &mut PlaybackScheduler,
        mut done: impl FnMut(&PlaybackScheduler) -> bool,
    ) {
        for _ in 0..400 {
            scheduler.tick();
            if done(scheduler) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("scheduler did not reach the expected state");
    }

    #[tokio::test]
    async fn test_clips_queue_back_to_back() {
        let source = FakeClipSource::new()
            .with_clip("clipA", 2.0, 40)
            .with_clip("clipB", 1.5, 0);
        let output = ManualClockOutput::new();
        output.set_time(10.0);
        let mut scheduler = scheduler(source, output.clone());

        scheduler.speak(
            vec![VoxToken::clip("clipA"), VoxToken::Silence(0.5), VoxToken::clip("clipB")],
            voice(),
        );
        pump_until(&mut scheduler, |s| s.scheduled_count() == 2).await;

        let played = output.played();
        assert_eq!(played.len(), 2);
        // clipB 先完成获取，但仍排在 clipA 之后
        assert!((played[0].duration - 2.0).abs() < 1e-6);
        assert!((played[1].duration - 1.5).abs() < 1e-6);

        let a = played[0].start;
        let b = played[1].start;
        assert!((a - 10.0).abs() < 1e-9);
        assert!((b - (a + 2.0 + 0.5 - 0.15)).abs() < 1e-6, "clipB started at {}", b);
    }

    #[tokio::test]
    async fn test_missing_clip_is_skipped_without_gap() {
        let source = FakeClipSource::new()
            .with_clip("first", 1.0, 0)
            .with_clip("last", 1.0, 0);
        let output = ManualClockOutput::new();
        let mut scheduler = scheduler(source, output.clone());

        scheduler.speak(
            vec![VoxToken::clip("first"), VoxToken::clip("missing"), VoxToken::clip("last")],
            voice(),
        );
        pump_until(&mut scheduler, |s| s.pending_count() == 0 && s.remaining_tokens() == 0).await;

        let played = output.played();
        assert_eq!(played.len(), 2);
        assert!((played[1].start - (played[0].start + 1.0 - 0.15)).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_pools_stay_bounded() {
        let source = FakeClipSource::new().with_clip("word", 0.25, 1);
        let output = ManualClockOutput::new();
        let mut scheduler = scheduler(source, output.clone());

        let tokens = (0..1_000)
            .map(|i| {
                if i % 3 == 0 {
                    VoxToken::Silence(0.1)
                } else {
                    VoxToken::clip("word")
                }
            })
            .collect();
        scheduler.speak(tokens, voice());

        for _ in 0..5_000 {
            let state = scheduler.tick();
            assert!(scheduler.pending_count() <= 10);
            assert!(scheduler.scheduled_count() <= 5);
            if state == SchedulerState::Idle {
                break;
            }
            output.advance(0.5);
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(output.played().len(), 666);
    }

    #[tokio::test]
    async fn test_stop_clears_everything() {
        let source = FakeClipSource::new().with_clip("word", 1.0, 0);
        let output = ManualClockOutput::new();
        let mut scheduler = scheduler(source, output.clone());

        scheduler.speak(vec![VoxToken::clip("word"); 50], voice());
        pump_until(&mut scheduler, |s| s.scheduled_count() > 0).await;

        scheduler.stop();
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.scheduled_count(), 0);
        assert_eq!(scheduler.remaining_tokens(), 0);
        assert!(output.played().iter().all(|p| p.stopped));
    }

    #[tokio::test]
    async fn test_speak_replaces_current_utterance() {
        let source = FakeClipSource::new()
            .with_clip("old", 1.0, 0)
            .with_clip("new", 1.0, 0);
        let output = ManualClockOutput::new();
        let mut scheduler = scheduler(source, output.clone());

        let first = scheduler.speak(vec![VoxToken::clip("old"); 20], voice());
        pump_until(&mut scheduler, |s| s.scheduled_count() > 0).await;

        let second = scheduler.speak(vec![VoxToken::clip("new")], voice());
        assert_ne!(first, second);
        assert_eq!(scheduler.scheduled_count(), 0);
        assert_eq!(scheduler.remaining_tokens(), 1);

        pump_until(&mut scheduler, |s| s.scheduled_count() == 1).await;
        let played = output.played();
        assert!(played[..played.len() - 1].iter().all(|p| p.stopped));
        assert!(!played[played.len() - 1].stopped);
    }

    #[tokio::test]
    async fn test_becomes_idle_after_playback_ends() {
        let source = FakeClipSource::new().with_clip("only", 1.0, 0);
        let output = ManualClockOutput::new();
        let mut scheduler = scheduler(source, output.clone());

        scheduler.speak(
            vec![VoxToken::Silence(0.5), VoxToken::clip("only"), VoxToken::Silence(0.5)],
            voice(),
        );
        pump_until(&mut scheduler, |s| s.scheduled_count() == 1).await;
        assert!(scheduler.is_speaking());
        assert!((output.played()[0].start - 0.5).abs() < 1e-9);

        output.advance(2.0);
        assert_eq!(scheduler.tick(), SchedulerState::Idle);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
