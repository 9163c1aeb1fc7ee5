//! Taint Analysis Application Layer
//!
//! Use cases wiring config, ports and infrastructure into one analysis run.

pub mod ifds_taint_service;

pub use ifds_taint_service::{IFDSTaintService, ReportSummary, TaintAnalysisReport};
