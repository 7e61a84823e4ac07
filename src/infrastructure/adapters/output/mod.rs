//! Audio Output Adapters

mod manual_clock_output;
mod rodio_output;

pub use manual_clock_output::{ManualClockOutput, PlayedClip};
pub use rodio_output::{apply_effects, EffectsConfig, RodioOutput};
