//! Feature modules

/// Interprocedural IFDS taint analysis
pub mod taint_analysis;
