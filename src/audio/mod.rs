// Audio module - capture and overlapping window extraction

pub mod engine;
pub mod window_buffer;

pub use engine::AudioEngine;
pub use window_buffer::{AnalysisWindow, OverlapWindowBuffer};
