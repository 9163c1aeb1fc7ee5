//! Taint Analysis Ports
//!
//! Boundaries to the external collaborators: the operation IR front ends
//! lower into, the symbol database, the policy oracle and entry-point seeds.

pub mod operation;
pub mod policy;
pub mod seed;
pub mod symbol_index;

pub use operation::{BasicBlock, BasicBlockGraph, Invocation, Operation, OperationKind, Value};
pub use policy::TaintPolicy;
pub use seed::EntryPointSeed;
pub use symbol_index::SymbolIndex;
