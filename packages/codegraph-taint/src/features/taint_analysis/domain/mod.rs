//! Taint Analysis Domain Layer
//!
//! Pure value types shared by every other layer: symbols, program points,
//! access paths, dataflow facts, findings and warnings.

pub mod fact;
pub mod finding;
pub mod program_point;
pub mod symbol;
pub mod warning;

pub use fact::{AccessPath, Fact, TaintFact};
pub use finding::{Diagnostic, DiagnosticTemplate, Severity, TaintFinding, TraceStep};
pub use program_point::{BlockId, IcfgNode, NodeKind, OpPosition};
pub use symbol::{SourceLocation, Symbol};
pub use warning::{AnalysisWarning, WarningKind, WarningLog};
