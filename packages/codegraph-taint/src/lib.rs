/*
 * Codegraph Taint - Interprocedural IFDS Taint Engine
 *
 * Feature-First Hexagonal Architecture:
 * - config/    : IFDS configuration (presets, YAML, validation)
 * - errors     : Unified error type
 * - features/  : taint_analysis vertical slice
 *     domain         : Symbols, access paths, facts, findings
 *     ports          : Operation IR, SymbolIndex, TaintPolicy, seeds
 *     infrastructure : ICFG, flow functions, solver, trace extraction
 *     application    : IFDSTaintService (config → solver → findings)
 *
 * Performance:
 * - Rayon work-stealing over worklist rounds
 * - DashMap-backed node arena and summary tables
 */

// Crate-level lint configuration
#![allow(clippy::type_complexity)] // Concurrent map types are necessary for the solver
#![allow(clippy::new_without_default)] // Default impl not always needed
#![allow(clippy::module_inception)] // Module naming intentional

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports
// ═══════════════════════════════════════════════════════════════════════════

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

/// Feature modules
pub mod features;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{ConfigError, ConfigResult, IFDSConfig, Preset, TraceMode};
pub use errors::{Result, TaintError};
pub use features::taint_analysis::{
    AccessPath, AnalysisWarning, CancellationToken, Diagnostic, EntryPointSeed, Fact, IFDSTaintService,
    Severity, SolveOutcome, Symbol, SymbolIndex, TaintAnalysisReport, TaintFact, TaintFinding,
    TaintPolicy,
};
