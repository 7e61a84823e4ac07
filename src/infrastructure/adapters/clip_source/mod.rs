//! Clip Source Adapters

mod fake_clip_source;
mod file_clip_source;
mod http_clip_source;
mod routing_clip_source;

pub use fake_clip_source::{encode_wav, FakeClipSource, FAKE_SAMPLE_RATE};
pub use file_clip_source::FileClipSource;
pub use http_clip_source::{HttpClipSource, HttpClipSourceConfig};
pub use routing_clip_source::RoutingClipSource;
