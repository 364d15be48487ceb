pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod subtitle;
pub mod synthesize;
pub mod transcribe;
pub mod translate;

pub use config::Config;
pub use error::{RedubError, Result};
pub use pipeline::{
    print_summary, run_pipeline, Collaborators, PipelineConfig, PipelineResult, PipelineStats,
};
pub use subtitle::TimedSpan;
