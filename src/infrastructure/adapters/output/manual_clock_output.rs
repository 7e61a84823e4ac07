//! Manual Clock Output - 用于测试的音频输出
//!
//! 时钟只在调用 `advance` / `set_time` 时前进；记录每次播放的起点与时长

use std::sync::{Arc, Mutex, MutexGuard};

use crate::application::ports::{AudioBuffer, AudioOutputPort, OutputError, PlaybackNode};

/// 一次播放记录
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedClip {
    pub start: f64,
    pub duration: f64,
    pub stopped: bool,
}

#[derive(Debug, Default)]
struct ClockState {
    now: f64,
    base_latency: f64,
    played: Vec<PlayedClip>,
}

/// Manual Clock Output
///
/// 克隆共享同一状态，测试在调度器拿走所有权后仍可推进时钟
#[derive(Debug, Clone, Default)]
pub struct ManualClockOutput {
    state: Arc<Mutex<ClockState>>,
}

fn lock(state: &Mutex<ClockState>) -> MutexGuard<'_, ClockState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ManualClockOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_latency(self, latency: f64) -> Self {
        lock(&self.state).base_latency = latency;
        self
    }

    pub fn advance(&self, seconds: f64) {
        lock(&self.state).now += seconds;
    }

    pub fn set_time(&self, now: f64) {
        lock(&self.state).now = now;
    }

    /// 按调度顺序返回全部播放记录
    pub fn played(&self) -> Vec<PlayedClip> {
        lock(&self.state).played.clone()
    }
}

impl AudioOutputPort for ManualClockOutput {
    fn current_time(&self) -> f64 {
        lock(&self.state).now
    }

    fn base_latency(&self) -> f64 {
        lock(&self.state).base_latency
    }

    fn play_at(&mut self, buffer: AudioBuffer, start: f64) -> Result<Box<dyn PlaybackNode>, OutputError> {
        let mut state = lock(&self.state);
        state.played.push(PlayedClip {
            start,
            duration: buffer.duration(),
            stopped: false,
        });
        let index = state.played.len() - 1;
        Ok(Box::new(ManualNode {
            state: self.state.clone(),
            index,
        }))
    }
}

struct ManualNode {
    state: Arc<Mutex<ClockState>>,
    index: usize,
}

impl PlaybackNode for ManualNode {
    fn is_finished(&self) -> bool {
        let state = lock(&self.state);
        let clip = &state.played[self.index];
        clip.stopped || state.now >= clip.start + clip.duration
    }

    fn stop(&mut self) {
        lock(&self.state).played[self.index].stopped = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_finishes_when_clock_passes_end() {
        let mut output = ManualClockOutput::new().with_base_latency(0.02);
        assert_eq!(output.base_latency(), 0.02);

        let buffer = AudioBuffer::new(vec![0.0; 8_000], 8_000, 1);
        let node = output.play_at(buffer, 0.5).unwrap();
        assert!(!node.is_finished());

        output.advance(1.0);
        assert!(!node.is_finished());
        output.advance(0.5);
        assert!(node.is_finished());
    }

    #[test]
    fn test_stop_marks_clip() {
        let mut output = ManualClockOutput::new();
        let buffer = AudioBuffer::new(vec![0.0; 100], 100, 1);
        let mut node = output.play_at(buffer, 0.0).unwrap();
        node.stop();
        assert!(node.is_finished());
        assert!(output.played()[0].stopped);
    }
}
