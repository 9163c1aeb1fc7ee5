//! In-memory [`SymbolIndex`]
//!
//! Programs are declared through a small builder API. Used by front ends
//! that already hold lowered bodies in memory, and by the test suite.
//! Body requests are counted per method so callers can observe how often
//! the engine walked into a method.

use std::sync::Arc;

use dashmap::DashMap;
use rustc_hash::FxHashMap;

use crate::features::taint_analysis::domain::Symbol;
use crate::features::taint_analysis::ports::{BasicBlockGraph, SymbolIndex};

/// Declared method plus its formal parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodHandle {
    pub method: Symbol,
    pub parameters: Vec<Symbol>,
}

impl MethodHandle {
    /// Formal parameter by position
    pub fn param(&self, index: usize) -> Option<Symbol> {
        self.parameters.get(index).copied()
    }
}

#[derive(Debug, Default)]
struct MethodInfo {
    parameters: Option<Vec<Symbol>>,
    this_parameter: Option<Symbol>,
    body: Option<Arc<BasicBlockGraph>>,
    is_virtual: bool,
    is_abstract: bool,
    signature: Option<String>,
    overriders: Vec<Symbol>,
}

#[derive(Debug, Default)]
pub struct InMemorySymbolIndex {
    names: Vec<String>,
    methods: FxHashMap<Symbol, MethodInfo>,
    cfg_requests: DashMap<Symbol, usize>,
}

impl InMemorySymbolIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh symbol; names need not be unique
    pub fn symbol(&mut self, name: &str) -> Symbol {
        let symbol = Symbol::new(self.names.len() as u32);
        self.names.push(name.to_string());
        symbol
    }

    /// Declare a method with a known signature and no body yet
    pub fn declare_method(&mut self, name: &str, parameters: &[&str]) -> MethodHandle {
        let method = self.symbol(name);
        let parameters: Vec<Symbol> = parameters.iter().map(|p| self.symbol(p)).collect();
        self.methods.insert(
            method,
            MethodInfo {
                parameters: Some(parameters.clone()),
                ..MethodInfo::default()
            },
        );
        MethodHandle { method, parameters }
    }

    /// Declare a method whose signature is unknown
    pub fn declare_opaque(&mut self, name: &str) -> Symbol {
        let method = self.symbol(name);
        self.methods.insert(method, MethodInfo::default());
        method
    }

    pub fn set_body(&mut self, method: Symbol, body: BasicBlockGraph) {
        self.info_mut(method).body = Some(Arc::new(body));
    }

    /// Give `method` an implicit receiver parameter
    pub fn declare_this(&mut self, method: Symbol) -> Symbol {
        let this = self.symbol("this");
        self.info_mut(method).this_parameter = Some(this);
        this
    }

    pub fn mark_virtual(&mut self, method: Symbol) {
        self.info_mut(method).is_virtual = true;
    }

    /// Abstract methods are virtual
    pub fn mark_abstract(&mut self, method: Symbol) {
        let info = self.info_mut(method);
        info.is_virtual = true;
        info.is_abstract = true;
    }

    pub fn add_override(&mut self, base: Symbol, overrider: Symbol) {
        self.info_mut(base).overriders.push(overrider);
    }

    pub fn set_signature(&mut self, method: Symbol, signature: impl Into<String>) {
        self.info_mut(method).signature = Some(signature.into());
    }

    /// Times the body of `method` was requested
    pub fn cfg_requests(&self, method: Symbol) -> usize {
        self.cfg_requests.get(&method).map(|count| *count).unwrap_or(0)
    }

    pub fn total_cfg_requests(&self) -> usize {
        self.cfg_requests.iter().map(|entry| *entry.value()).sum()
    }

    fn info_mut(&mut self, method: Symbol) -> &mut MethodInfo {
        self.methods.entry(method).or_default()
    }
}

impl SymbolIndex for InMemorySymbolIndex {
    fn control_flow_graph(&self, method: Symbol) -> Option<Arc<BasicBlockGraph>> {
        *self.cfg_requests.entry(method).or_insert(0) += 1;
        self.methods.get(&method).and_then(|info| info.body.clone())
    }

    fn resolve_overrides_or_implementations(&self, method: Symbol) -> Vec<Symbol> {
        self.methods
            .get(&method)
            .map(|info| info.overriders.clone())
            .unwrap_or_default()
    }

    fn is_virtual(&self, method: Symbol) -> bool {
        self.methods.get(&method).is_some_and(|info| info.is_virtual)
    }

    fn is_abstract(&self, method: Symbol) -> bool {
        self.methods.get(&method).is_some_and(|info| info.is_abstract)
    }

    fn parameters(&self, method: Symbol) -> Option<Vec<Symbol>> {
        self.methods.get(&method).and_then(|info| info.parameters.clone())
    }

    fn this_parameter(&self, method: Symbol) -> Option<Symbol> {
        self.methods.get(&method).and_then(|info| info.this_parameter)
    }

    fn display_name(&self, symbol: Symbol) -> String {
        self.names
            .get(symbol.raw() as usize)
            .cloned()
            .unwrap_or_else(|| symbol.to_string())
    }

    fn signature(&self, method: Symbol) -> Option<String> {
        self.methods.get(&method).and_then(|info| info.signature.clone())
    }
}
