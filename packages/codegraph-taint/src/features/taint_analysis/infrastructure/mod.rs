//! Taint Analysis Infrastructure
//!
//! - `icfg`: on-demand interprocedural CFG over a [`SymbolIndex`](super::ports::SymbolIndex)
//! - `flow_functions`: Normal / Call / CallToReturn / Return transfer functions
//! - `ifds_solver`: parallel IFDS tabulation with summary reuse
//! - `trace_extractor`: sink scan, provenance traces
//! - `in_memory_index`, `static_policy`: ready-made port implementations

pub mod cancellation;
pub mod flow_functions;
pub mod icfg;
pub mod ifds_solver;
pub mod in_memory_index;
pub mod static_policy;
pub mod trace_extractor;

pub use cancellation::CancellationToken;
pub use flow_functions::{FlowFunctions, TaintFlowFunctions};
pub use icfg::{CallerSite, EdgeKind, Icfg, IcfgEdge, MethodContext, NodeId, OperationRef};
pub use ifds_solver::{
    ExplodedNode, IFDSAnalysisResult, IFDSSolver, IFDSStatistics, PathEdge, SolveOutcome,
};
pub use in_memory_index::{InMemorySymbolIndex, MethodHandle};
pub use static_policy::{SinkSpec, StaticTaintPolicy};
pub use trace_extractor::TraceExtractor;
