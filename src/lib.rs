pub mod alignment;
pub mod cli;
pub mod commands;
pub mod config;
pub mod dates;
pub mod error;
pub mod interpolation;
pub mod masking;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod smoothing;
pub mod stages;
pub mod weights;

// Main entry point
pub mod cli_main;

// Re-export commonly used items
pub use error::{PipelineError, Result};
pub use models::{AlignedSeries, ObservationBatch, RawObservation};
pub use pipeline::{Pipeline, PipelineConfig, PipelineResult};
