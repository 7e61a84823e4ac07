//! Playback - 语音片段的获取与调度

mod clip_request;
mod scheduler;

pub use clip_request::ClipRequest;
pub use scheduler::{PlaybackScheduler, SchedulerConfig, SchedulerState};
