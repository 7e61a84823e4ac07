//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_output;
mod clip_decoder;
mod clip_source;

pub use audio_output::{AudioBuffer, AudioOutputPort, OutputError, PlaybackNode};
pub use clip_decoder::ClipDecoderPort;
pub use clip_source::{ClipError, ClipSourcePort};
