//! Symbol / Operation database port
//!
//! The engine is language-agnostic: any front end that can hand out method
//! bodies, resolve overrides and describe signatures can drive it.

use std::sync::Arc;

use super::operation::BasicBlockGraph;
use crate::features::taint_analysis::domain::Symbol;

/// Semantic database consumed by the ICFG builder and the flow functions
///
/// Implementations must be safe to query from several worker threads.
pub trait SymbolIndex: Send + Sync {
    /// Intraprocedural CFG of `method`, or `None` when it has no analyzable
    /// body (abstract, external, unparsable). Called at most once per method
    /// per run.
    fn control_flow_graph(&self, method: Symbol) -> Option<Arc<BasicBlockGraph>>;

    /// Every override / implementation of `method` (not including `method`)
    fn resolve_overrides_or_implementations(&self, method: Symbol) -> Vec<Symbol>;

    fn is_virtual(&self, method: Symbol) -> bool;

    fn is_abstract(&self, method: Symbol) -> bool;

    /// Formal parameters in declaration order, excluding `this`.
    /// `None` when the signature is unknown.
    fn parameters(&self, method: Symbol) -> Option<Vec<Symbol>>;

    /// The implicit receiver parameter of an instance method
    fn this_parameter(&self, _method: Symbol) -> Option<Symbol> {
        None
    }

    /// Human readable name used in diagnostics
    fn display_name(&self, symbol: Symbol) -> String {
        symbol.to_string()
    }

    /// Signature string used by catalog-based policies
    fn signature(&self, _method: Symbol) -> Option<String> {
        None
    }
}

impl<T: SymbolIndex + ?Sized> SymbolIndex for Arc<T> {
    fn control_flow_graph(&self, method: Symbol) -> Option<Arc<BasicBlockGraph>> {
        (**self).control_flow_graph(method)
    }

    fn resolve_overrides_or_implementations(&self, method: Symbol) -> Vec<Symbol> {
        (**self).resolve_overrides_or_implementations(method)
    }

    fn is_virtual(&self, method: Symbol) -> bool {
        (**self).is_virtual(method)
    }

    fn is_abstract(&self, method: Symbol) -> bool {
        (**self).is_abstract(method)
    }

    fn parameters(&self, method: Symbol) -> Option<Vec<Symbol>> {
        (**self).parameters(method)
    }

    fn this_parameter(&self, method: Symbol) -> Option<Symbol> {
        (**self).this_parameter(method)
    }

    fn display_name(&self, symbol: Symbol) -> String {
        (**self).display_name(symbol)
    }

    fn signature(&self, method: Symbol) -> Option<String> {
        (**self).signature(method)
    }
}
