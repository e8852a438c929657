//! Black hole escape planner.
//!
//! Assesses a learner's standing in a project-based curriculum and builds a
//! deadline-aware weekly plan for the gating projects still outstanding.
//!
//! Data flows one way: raw records are resolved into a [`deadline::Deadline`]
//! and a [`progress::ProgressState`], classified into a [`risk::RiskLevel`],
//! scheduled by [`scheduler`], and assembled into a [`plan::Plan`].
//! Every stage after the record source is a pure function of its inputs.

pub mod catalog;
pub mod config;
pub mod db;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod logging;
pub mod models;
pub mod plan;
pub mod progress;
pub mod report;
pub mod risk;
pub mod scheduler;
pub mod source;

pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use report::AnalysisReport;
pub use source::{Analyzer, MemorySource, RecordSource};
