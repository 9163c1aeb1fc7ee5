// Interprocedural taint analysis
//
// Hexagonal Architecture:
// - domain: Facts, access paths, program points, findings, warnings
// - ports: Operation IR and the external collaborators (SymbolIndex, TaintPolicy, seeds)
// - infrastructure: ICFG, flow functions, IFDS solver, trace extraction
// - application: IFDSTaintService orchestration

pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod ports;

// Re-export application layer (primary interface)
pub use application::{IFDSTaintService, ReportSummary, TaintAnalysisReport};

// Re-export domain types
pub use domain::{
    AccessPath, AnalysisWarning, BlockId, Diagnostic, DiagnosticTemplate, Fact, IcfgNode,
    NodeKind, OpPosition, Severity, SourceLocation, Symbol, TaintFact, TaintFinding, TraceStep,
    WarningKind,
};

pub use infrastructure::{
    CancellationToken, ExplodedNode, FlowFunctions, IFDSAnalysisResult, IFDSStatistics,
    InMemorySymbolIndex, MethodHandle, SinkSpec, SolveOutcome, StaticTaintPolicy,
};
pub use ports::{
    BasicBlock, BasicBlockGraph, EntryPointSeed, Invocation, Operation, OperationKind,
    SymbolIndex, TaintPolicy, Value,
};
