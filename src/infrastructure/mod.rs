//! Infrastructure Layer - 基础设施层
//!
//! 提供所有端口的具体实现：片段源、解码器、音频输出

pub mod adapters;

pub use adapters::{
    EffectsConfig, FileClipSource, HttpClipSource, RodioOutput, RoutingClipSource,
    SymphoniaDecoder,
};
