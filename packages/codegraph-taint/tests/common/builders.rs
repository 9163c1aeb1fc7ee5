//! Program builders
//!
//! Thin layer over `InMemorySymbolIndex` + `StaticTaintPolicy` so tests
//! read like the source programs they model.

use std::sync::Arc;

use codegraph_taint::features::taint_analysis::{
    AccessPath, BasicBlockGraph, EntryPointSeed, IFDSTaintService, InMemorySymbolIndex,
    Invocation, MethodHandle, Operation, Severity, StaticTaintPolicy, Symbol,
    TaintAnalysisReport, Value,
};
use codegraph_taint::{CancellationToken, IFDSConfig};

/// Config used by default in integration tests
pub fn test_config() -> IFDSConfig {
    IFDSConfig::default().worker_threads(2)
}

/// Install a test subscriber once; `RUST_LOG=debug` shows solver rounds
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
pub struct ProgramBuilder {
    pub index: InMemorySymbolIndex,
    policy: StaticTaintPolicy,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(&mut self, name: &str, parameters: &[&str]) -> MethodHandle {
        self.index.declare_method(name, parameters)
    }

    pub fn local(&mut self, name: &str) -> Symbol {
        self.index.symbol(name)
    }

    /// Straight-line body
    pub fn body(&mut self, method: Symbol, operations: Vec<Operation>) {
        self.index
            .set_body(method, BasicBlockGraph::straight_line(operations));
    }

    pub fn graph(&mut self, method: Symbol, graph: BasicBlockGraph) {
        self.index.set_body(method, graph);
    }

    /// Body-less source method `name()`
    pub fn source(&mut self, name: &str) -> Symbol {
        let method = self.index.declare_method(name, &[]).method;
        self.policy = std::mem::take(&mut self.policy).source(method);
        method
    }

    /// Body-less sink `name(value)` checked on argument 0
    pub fn sink(&mut self, name: &str) -> Symbol {
        let method = self.index.declare_method(name, &["value"]).method;
        self.policy = std::mem::take(&mut self.policy).sink_on(method, vec![0], Severity::High);
        method
    }

    /// Body-less sanitizer `name(value)`
    pub fn sanitizer(&mut self, name: &str) -> Symbol {
        let method = self.index.declare_method(name, &["value"]).method;
        self.policy = std::mem::take(&mut self.policy).sanitizer(method);
        method
    }

    pub fn build(self) -> Program {
        Program {
            index: Arc::new(self.index),
            policy: Arc::new(self.policy),
        }
    }
}

/// Finished program plus its policy
pub struct Program {
    pub index: Arc<InMemorySymbolIndex>,
    pub policy: Arc<StaticTaintPolicy>,
}

impl Program {
    pub fn service(&self, config: IFDSConfig) -> IFDSTaintService {
        IFDSTaintService::new(config, self.index.clone(), self.policy.clone())
            .expect("test config is valid")
    }

    pub fn analyze(&self, seeds: &[EntryPointSeed]) -> TaintAnalysisReport {
        self.analyze_with(test_config(), seeds)
    }

    pub fn analyze_with(&self, config: IFDSConfig, seeds: &[EntryPointSeed]) -> TaintAnalysisReport {
        self.service(config).analyze(seeds, &CancellationToken::new())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Operation shorthands
// ═══════════════════════════════════════════════════════════════════════════

/// `target = from`
pub fn copy(target: impl Into<AccessPath>, from: impl Into<AccessPath>) -> Operation {
    Operation::assign(target, Value::path(from))
}

/// `method(args..);`
pub fn call(method: Symbol, args: &[Symbol]) -> Operation {
    Operation::invoke(invocation(method, args))
}

/// `target = method(args..)`
pub fn call_into(target: impl Into<AccessPath>, method: Symbol, args: &[Symbol]) -> Operation {
    Operation::assign(target, Value::Invoke(invocation(method, args)))
}

/// `return value`
pub fn ret(value: Symbol) -> Operation {
    Operation::ret(Some(Value::path(value)))
}

pub fn invocation(method: Symbol, args: &[Symbol]) -> Invocation {
    Invocation::new(method, args.iter().map(|&arg| Value::path(arg)))
}

pub fn nops(count: usize) -> Vec<Operation> {
    (0..count).map(|_| Operation::nop()).collect()
}
