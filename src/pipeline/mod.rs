//! Contrast orchestration: parameters, the pipeline driver and its report

mod orchestrator;
mod params;

pub use orchestrator::{
    ContrastOutcome, ContrastRun, DgePipeline, EngineFailure, EngineRun, RunReport,
};
pub use params::{ErrorMode, OrganismInfo, RunParameters};
