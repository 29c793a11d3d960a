//! Insight generation services

pub mod image_loader;
pub mod insight_pipeline;
pub mod prompt_builder;

pub use image_loader::ImageLoader;
pub use insight_pipeline::{InsightPipeline, ProcessResult};
