pub mod annotate;
pub mod config;
pub mod detectors;
pub mod error;
pub mod io;
pub mod metrics;
pub mod plot;
pub mod signal;
pub mod synth;

pub use annotate::{
    analyze, analyze_waveform, analyze_with_config, AnalysisResult, AnnotationRecord, Summary,
};
pub use config::{load_config, EngineConfig};
pub use detectors::*;
pub use error::{EngineError, Result};
pub use metrics::*;
pub use signal::*;
