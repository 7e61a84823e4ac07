//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod clip_source;
pub mod decoder;
pub mod output;

pub use clip_source::*;
pub use decoder::*;
pub use output::*;
