/*
 * Taint Flow Functions
 *
 * One transfer function per ICFG edge kind:
 *
 *   Normal        x = v        : keep facts (minus those under x with strong
 *                                updates), rebase facts matching v onto x
 *                                (matching: same base, or overlapping field
 *                                chains with field-sensitive matching)
 *                 return v     : facts matching v also taint ReturnOf(method)
 *   Call          f(a0..an)    : a_i matches fact -> fact rebased on formal_i
 *                                callee is a source -> ReturnOf(callee)
 *   CallToReturn  x = f(..)    : identity minus facts under x
 *   Return        ReturnOf(f)  : -> x (assignment) / ReturnOf(caller) (return f(..))
 *                 formal-rooted: dropped (meaningless in the caller)
 *
 * Zero rule: every function maps Zero to Zero plus whatever it generates.
 * All functions are pure; errors mean "this edge contributes nothing".
 */

use std::sync::Arc;

use crate::config::IFDSConfig;
use crate::errors::{Result, TaintError};
use crate::features::taint_analysis::domain::{AccessPath, Fact, IcfgNode, Symbol, TaintFact};
use crate::features::taint_analysis::ports::{Invocation, Operation, OperationKind, TaintPolicy};

use super::icfg::{Icfg, OperationRef};

/// Transfer functions consumed by the solver
///
/// Each returns the facts holding at the edge target given `fact` at the
/// edge source.
pub trait FlowFunctions: Send + Sync {
    fn normal_flow(&self, from: &IcfgNode, to: &IcfgNode, fact: &Fact) -> Result<Vec<Fact>>;

    /// Facts at the entry of `callee`
    fn call_flow(&self, call_site: &IcfgNode, callee: Symbol, fact: &Fact) -> Result<Vec<Fact>>;

    fn call_to_return_flow(
        &self,
        call_site: &IcfgNode,
        return_site: &IcfgNode,
        fact: &Fact,
    ) -> Result<Vec<Fact>>;

    /// Facts at `return_site` given `exit_fact` at the exit of `callee`
    fn return_flow(
        &self,
        call_site: &IcfgNode,
        callee: Symbol,
        exit_fact: &Fact,
        return_site: &IcfgNode,
    ) -> Result<Vec<Fact>>;
}

/// Access-path taint transfer functions
pub struct TaintFlowFunctions {
    icfg: Arc<Icfg>,
    policy: Arc<dyn TaintPolicy>,
    max_access_path_length: usize,
    strong_updates: bool,
    field_sensitive: bool,
    opaque_calls_propagate: bool,
}

impl TaintFlowFunctions {
    pub fn new(icfg: Arc<Icfg>, policy: Arc<dyn TaintPolicy>, config: &IFDSConfig) -> Self {
        Self {
            icfg,
            policy,
            max_access_path_length: config.max_access_path_length,
            strong_updates: config.strong_updates,
            field_sensitive: config.field_sensitive_matching,
            opaque_calls_propagate: config.opaque_calls_propagate,
        }
    }

    fn call_operation(&self, call_site: &IcfgNode) -> Result<OperationRef> {
        let operation = self
            .icfg
            .operation(call_site)
            .ok_or_else(|| TaintError::malformed_operation(call_site, "operation not found"))?;
        if !operation.is_invocation() {
            return Err(TaintError::malformed_operation(call_site, "call site without invocation"));
        }
        Ok(operation)
    }

    fn path_fact(&self, path: AccessPath) -> Fact {
        Fact::path(path.truncated(self.max_access_path_length))
    }

    /// Strong update: `target` overwrites `fact` entirely
    fn is_overwritten(&self, target: Option<&AccessPath>, fact: &AccessPath) -> bool {
        self.strong_updates && target.is_some_and(|target| target.is_prefix_of(fact))
    }

    /// `fact` carried by `matched` into the value produced by `operation`
    fn result_fact(
        &self,
        operation: &Operation,
        method: Symbol,
        fact: &AccessPath,
        matched: &AccessPath,
    ) -> Option<Fact> {
        if operation.is_return() {
            Some(Fact::return_of(method))
        } else {
            operation
                .assignment_target()
                .map(|target| self.path_fact(fact.rebase(matched, target)))
        }
    }

    /// Result facts of an opaque call reading `fact` through an argument or
    /// the receiver
    fn opaque_results(
        &self,
        operation: &Operation,
        invocation: &Invocation,
        method: Symbol,
        fact: &AccessPath,
    ) -> Vec<Fact> {
        let receiver = invocation
            .receiver
            .as_ref()
            .filter(|receiver| receiver.applies_to(fact, self.field_sensitive));
        invocation
            .arguments
            .iter()
            .flat_map(|argument| argument.matching_paths(fact, self.field_sensitive))
            .chain(receiver)
            .filter_map(|matched| self.result_fact(operation, method, fact, matched))
            .collect()
    }
}

fn dedup(mut facts: Vec<Fact>) -> Vec<Fact> {
    facts.sort();
    facts.dedup();
    facts
}

impl FlowFunctions for TaintFlowFunctions {
    fn normal_flow(&self, from: &IcfgNode, _to: &IcfgNode, fact: &Fact) -> Result<Vec<Fact>> {
        let Some(operation) = self.icfg.operation(from) else {
            // Entry / Exit
            return Ok(vec![fact.clone()]);
        };

        let Some(path) = fact.access_path() else {
            return Ok(vec![fact.clone()]);
        };

        let mut out = Vec::new();
        match &operation.kind {
            OperationKind::Assign { target, value } => {
                if !self.is_overwritten(Some(target), path) {
                    out.push(fact.clone());
                }
                // Sanitizer results are clean; other calls are handled on call edges
                if value.as_invocation().is_none() {
                    for matched in value.matching_paths(path, self.field_sensitive) {
                        out.push(self.path_fact(path.rebase(matched, target)));
                    }
                }
            }
            OperationKind::Return(Some(value)) => {
                out.push(fact.clone());
                if !value.matching_paths(path, self.field_sensitive).is_empty() {
                    out.push(Fact::return_of(from.method));
                }
            }
            OperationKind::Return(None) | OperationKind::Invoke(_) | OperationKind::Nop => {
                out.push(fact.clone());
            }
        }
        Ok(dedup(out))
    }

    fn call_flow(&self, call_site: &IcfgNode, callee: Symbol, fact: &Fact) -> Result<Vec<Fact>> {
        let operation = self.call_operation(call_site)?;
        let invocation = operation
            .invocation()
            .ok_or_else(|| TaintError::malformed_operation(call_site, "call site without invocation"))?;

        let mut out = Vec::new();
        if fact.is_zero() {
            out.push(Fact::Zero);
        }
        if self.policy.is_source(callee) {
            out.push(Fact::return_of(callee));
        }

        let Some(path) = fact.access_path() else {
            // Zero and pending return values never enter a callee
            return Ok(dedup(out));
        };
        if self.policy.is_sanitizer(callee) {
            return Ok(dedup(out));
        }

        let index = self.icfg.index();
        let mut formals: Option<Vec<Symbol>> = None;
        for (position, argument) in invocation.arguments.iter().enumerate() {
            let matched = argument.matching_paths(path, self.field_sensitive);
            if matched.is_empty() {
                continue;
            }
            if formals.is_none() {
                formals = Some(
                    index
                        .parameters(callee)
                        .ok_or(TaintError::MissingSignature(callee))?,
                );
            }
            let parameters = formals.as_deref().unwrap_or_default();
            let formal = parameters.get(position).ok_or(TaintError::ArityMismatch {
                callee,
                arguments: invocation.arguments.len(),
                parameters: parameters.len(),
            })?;
            let formal = AccessPath::new(*formal);
            for matched in matched {
                out.push(self.path_fact(path.rebase(matched, &formal)));
            }
        }

        if let Some(receiver) = &invocation.receiver {
            if receiver.applies_to(path, self.field_sensitive) {
                if let Some(this) = index.this_parameter(callee) {
                    out.push(self.path_fact(path.rebase(receiver, &AccessPath::new(this))));
                }
            }
        }

        Ok(dedup(out))
    }

    fn call_to_return_flow(
        &self,
        call_site: &IcfgNode,
        _return_site: &IcfgNode,
        fact: &Fact,
    ) -> Result<Vec<Fact>> {
        let operation = self.call_operation(call_site)?;
        let invocation = operation
            .invocation()
            .ok_or_else(|| TaintError::malformed_operation(call_site, "call site without invocation"))?;
        let unresolved = self.icfg.resolve_callees(invocation.target).is_empty();

        let path = match fact {
            Fact::Zero => {
                let mut out = vec![Fact::Zero];
                if unresolved && self.policy.is_source(invocation.target) {
                    if operation.is_return() {
                        out.push(Fact::return_of(call_site.method));
                    } else if let Some(target) = operation.assignment_target() {
                        out.push(self.path_fact(target.clone()));
                    }
                }
                return Ok(out);
            }
            Fact::Taint(TaintFact::ReturnOf(_)) => return Ok(vec![fact.clone()]),
            Fact::Taint(TaintFact::Path(path)) => path,
        };

        let mut out = Vec::new();
        if !self.is_overwritten(operation.assignment_target(), path) {
            out.push(fact.clone());
        }
        if unresolved
            && self.opaque_calls_propagate
            && !self.policy.is_sanitizer(invocation.target)
        {
            out.extend(self.opaque_results(&operation, invocation, call_site.method, path));
        }
        Ok(dedup(out))
    }

    fn return_flow(
        &self,
        call_site: &IcfgNode,
        callee: Symbol,
        exit_fact: &Fact,
        _return_site: &IcfgNode,
    ) -> Result<Vec<Fact>> {
        let operation = self.call_operation(call_site)?;

        match exit_fact {
            Fact::Zero => Ok(vec![Fact::Zero]),
            Fact::Taint(TaintFact::ReturnOf(method)) if *method == callee => {
                if self.policy.is_sanitizer(callee) {
                    return Ok(Vec::new());
                }
                if operation.is_return() {
                    Ok(vec![Fact::return_of(call_site.method)])
                } else if let Some(target) = operation.assignment_target() {
                    Ok(vec![self.path_fact(target.clone())])
                } else {
                    Ok(vec![exit_fact.clone()])
                }
            }
            Fact::Taint(TaintFact::ReturnOf(_)) => Ok(vec![exit_fact.clone()]),
            Fact::Taint(TaintFact::Path(path)) => {
                let index = self.icfg.index();
                let base = path.base();
                let rooted_at_formal = index
                    .parameters(callee)
                    .is_some_and(|formals| formals.contains(&base))
                    || index.this_parameter(callee) == Some(base);
                if !rooted_at_formal {
                    return Ok(vec![exit_fact.clone()]);
                }

                let opaque = self.opaque_calls_propagate
                    && !self.policy.is_sanitizer(callee)
                    && !self.icfg.has_body(callee);
                if !opaque {
                    return Ok(Vec::new());
                }
                Ok(self
                    .result_fact(&operation, call_site.method, path, &AccessPath::new(base))
                    .into_iter()
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::taint_analysis::domain::{OpPosition, WarningLog};
    use crate::features::taint_analysis::infrastructure::in_memory_index::InMemorySymbolIndex;
    use crate::features::taint_analysis::infrastructure::static_policy::StaticTaintPolicy;
    use crate::features::taint_analysis::ports::{BasicBlockGraph, Value};
    use pretty_assertions::assert_eq;

    struct Fixture {
        flow: TaintFlowFunctions,
        method: Symbol,
    }

    impl Fixture {
        fn new(index: InMemorySymbolIndex, policy: StaticTaintPolicy, method: Symbol) -> Self {
            Self::with_config(index, policy, method, &IFDSConfig::default())
        }

        fn with_config(
            index: InMemorySymbolIndex,
            policy: StaticTaintPolicy,
            method: Symbol,
            config: &IFDSConfig,
        ) -> Self {
            let icfg = Arc::new(Icfg::new(Arc::new(index), Arc::new(WarningLog::new())));
            Self {
                flow: TaintFlowFunctions::new(icfg, Arc::new(policy), config),
                method,
            }
        }

        fn node(&self, index: u32, call: bool) -> IcfgNode {
            IcfgNode::at(self.method, OpPosition::new(0, index), call)
        }
    }

    fn sorted(mut facts: Vec<Fact>) -> Vec<Fact> {
        facts.sort();
        facts
    }

    #[test]
    fn test_assignment_rebases_with_suffix() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let (x, y, a, b) = (index.symbol("x"), index.symbol("y"), index.symbol("a"), index.symbol("b"));
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![
                Operation::assign(y, Value::Path(AccessPath::with_fields(x, [a]))),
                Operation::ret(None),
            ]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new(), m);

        let fact = Fact::path(AccessPath::with_fields(x, [a, b]));
        let out = fx.flow.normal_flow(&fx.node(0, false), &fx.node(1, false), &fact).unwrap();
        assert_eq!(
            out,
            sorted(vec![fact.clone(), Fact::path(AccessPath::with_fields(y, [b]))])
        );

        // Base match: a sibling field still taints the target as a whole
        let other = Fact::path(AccessPath::with_fields(x, [b]));
        let out = fx.flow.normal_flow(&fx.node(0, false), &fx.node(1, false), &other).unwrap();
        assert_eq!(out, sorted(vec![other.clone(), Fact::path(y)]));
    }

    #[test]
    fn test_field_sensitive_assignment_ignores_sibling_fields() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let (x, y, a, b) = (index.symbol("x"), index.symbol("y"), index.symbol("a"), index.symbol("b"));
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![
                Operation::assign(y, Value::Path(AccessPath::with_fields(x, [a]))),
                Operation::ret(None),
            ]),
        );
        let config = IFDSConfig::default().field_sensitive_matching(true);
        let fx = Fixture::with_config(index, StaticTaintPolicy::new(), m, &config);

        let other = Fact::path(AccessPath::with_fields(x, [b]));
        let out = fx.flow.normal_flow(&fx.node(0, false), &fx.node(1, false), &other).unwrap();
        assert_eq!(out, vec![other]);

        let nested = Fact::path(AccessPath::with_fields(x, [a, b]));
        let out = fx.flow.normal_flow(&fx.node(0, false), &fx.node(1, false), &nested).unwrap();
        assert_eq!(out, sorted(vec![nested.clone(), Fact::path(AccessPath::with_fields(y, [b]))]));
    }

    #[test]
    fn test_strong_update_kills_overwritten_fact() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let (x, f) = (index.symbol("x"), index.symbol("f"));
        index.set_body(m, BasicBlockGraph::straight_line(vec![Operation::assign(x, Value::Literal)]));

        let fx = Fixture::with_config(
            index,
            StaticTaintPolicy::new(),
            m,
            &IFDSConfig::default().strong_updates(true),
        );
        let killed = Fact::path(AccessPath::with_fields(x, [f]));
        let out = fx.flow.normal_flow(&fx.node(0, false), &IcfgNode::exit(m), &killed).unwrap();
        assert!(out.is_empty());

        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let x = index.symbol("x");
        index.set_body(m, BasicBlockGraph::straight_line(vec![Operation::assign(x, Value::Literal)]));
        let weak = Fixture::new(index, StaticTaintPolicy::new(), m);
        let fact = Fact::path(x);
        let out = weak.flow.normal_flow(&weak.node(0, false), &IcfgNode::exit(m), &fact).unwrap();
        assert_eq!(out, vec![fact]);
    }

    #[test]
    fn test_sanitizer_assignment_does_not_rebase() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let sanitize = index.declare_method("Sanitize", &["v"]).method;
        let (x, y) = (index.symbol("x"), index.symbol("y"));
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![Operation::assign(
                x,
                Value::Invoke(Invocation::new(sanitize, [Value::path(y)])),
            )]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new().sanitizer(sanitize), m);

        let fact = Fact::path(y);
        let out = fx.flow.normal_flow(&fx.node(0, false), &IcfgNode::exit(m), &fact).unwrap();
        assert!(out.iter().all(|f| f.access_path().map(AccessPath::base) != Some(x)));
        assert_eq!(out, vec![fact]);
    }

    #[test]
    fn test_return_statement_taints_return_value() {
        let mut index = InMemorySymbolIndex::new();
        let handle = index.declare_method("Id", &["p"]);
        let p = handle.parameters[0];
        index.set_body(
            handle.method,
            BasicBlockGraph::straight_line(vec![Operation::ret(Some(Value::path(p)))]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new(), handle.method);

        let out = fx
            .flow
            .normal_flow(&fx.node(0, false), &IcfgNode::exit(handle.method), &Fact::path(p))
            .unwrap();
        assert_eq!(out, sorted(vec![Fact::path(p), Fact::return_of(handle.method)]));
    }

    fn call_fixture(
        policy: impl FnOnce(Symbol) -> StaticTaintPolicy,
    ) -> (Fixture, Symbol, Symbol, Symbol, Symbol) {
        call_fixture_with(policy, true, &IFDSConfig::default())
    }

    fn call_fixture_with(
        policy: impl FnOnce(Symbol) -> StaticTaintPolicy,
        callee_has_body: bool,
        config: &IFDSConfig,
    ) -> (Fixture, Symbol, Symbol, Symbol, Symbol) {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let callee = index.declare_method("Callee", &["p"]);
        if callee_has_body {
            index.set_body(callee.method, BasicBlockGraph::straight_line(vec![Operation::ret(None)]));
        }
        let (x, y) = (index.symbol("x"), index.symbol("y"));
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![
                Operation::assign(y, Value::Invoke(Invocation::new(callee.method, [Value::path(x)]))),
                Operation::ret(None),
            ]),
        );
        let p = callee.parameters[0];
        let fx = Fixture::with_config(index, policy(callee.method), m, config);
        (fx, callee.method, p, x, y)
    }

    #[test]
    fn test_call_maps_argument_to_formal() {
        let (fx, callee, p, x, _) = call_fixture(|_| StaticTaintPolicy::new());
        let out = fx.flow.call_flow(&fx.node(0, true), callee, &Fact::path(x)).unwrap();
        assert_eq!(out, vec![Fact::path(p)]);

        let out = fx.flow.call_flow(&fx.node(0, true), callee, &Fact::Zero).unwrap();
        assert_eq!(out, vec![Fact::Zero]);
    }

    #[test]
    fn test_source_callee_generates_return_fact_for_any_input() {
        let (fx, callee, p, x, _) = call_fixture(|callee| StaticTaintPolicy::new().source(callee));

        let out = fx.flow.call_flow(&fx.node(0, true), callee, &Fact::Zero).unwrap();
        assert_eq!(out, vec![Fact::Zero, Fact::return_of(callee)]);

        let out = fx.flow.call_flow(&fx.node(0, true), callee, &Fact::path(x)).unwrap();
        assert_eq!(out, sorted(vec![Fact::path(p), Fact::return_of(callee)]));

        let out = fx
            .flow
            .call_flow(&fx.node(0, true), callee, &Fact::return_of(Symbol::new(77)))
            .unwrap();
        assert_eq!(out, vec![Fact::return_of(callee)]);
    }

    #[test]
    fn test_sanitizer_callee_receives_nothing() {
        let (fx, callee, _, x, _) = call_fixture(|callee| StaticTaintPolicy::new().sanitizer(callee));
        let out = fx.flow.call_flow(&fx.node(0, true), callee, &Fact::path(x)).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_call_errors_on_arity_and_missing_signature() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let narrow = index.declare_method("Narrow", &[]).method;
        let unknown = index.declare_opaque("Unknown");
        let x = index.symbol("x");
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![
                Operation::invoke(Invocation::new(narrow, [Value::path(x)])),
                Operation::invoke(Invocation::new(unknown, [Value::path(x)])),
            ]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new(), m);

        let err = fx.flow.call_flow(&fx.node(0, true), narrow, &Fact::path(x)).unwrap_err();
        assert!(matches!(err, TaintError::ArityMismatch { arguments: 1, parameters: 0, .. }));

        let err = fx.flow.call_flow(&fx.node(1, true), unknown, &Fact::path(x)).unwrap_err();
        assert!(matches!(err, TaintError::MissingSignature(s) if s == unknown));

        // Unrelated facts never consult the signature
        let unrelated = index_free_symbol();
        assert!(fx.flow.call_flow(&fx.node(1, true), unknown, &Fact::path(unrelated)).is_ok());

        let err = fx.flow.call_flow(&IcfgNode::entry(m), narrow, &Fact::Zero).unwrap_err();
        assert!(matches!(err, TaintError::MalformedOperation { .. }));
    }

    fn index_free_symbol() -> Symbol {
        Symbol::new(10_000)
    }

    #[test]
    fn test_receiver_maps_to_this() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let run = index.declare_method("Run", &[]).method;
        let this = index.declare_this(run);
        let (obj, f) = (index.symbol("obj"), index.symbol("f"));
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![Operation::invoke(
                Invocation::new(run, []).with_receiver(obj),
            )]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new(), m);

        let out = fx
            .flow
            .call_flow(&fx.node(0, true), run, &Fact::path(AccessPath::with_fields(obj, [f])))
            .unwrap();
        assert_eq!(out, vec![Fact::path(AccessPath::with_fields(this, [f]))]);
    }

    #[test]
    fn test_call_to_return_kills_assignment_target() {
        let (weak, _, _, _, y) = call_fixture(|_| StaticTaintPolicy::new());
        let out = weak.flow.call_to_return_flow(&weak.node(0, true), &weak.node(1, false), &Fact::path(y));
        assert_eq!(out.unwrap(), vec![Fact::path(y)]);

        let strong = IFDSConfig::default().strong_updates(true);
        let (fx, _, _, x, y) = call_fixture_with(|_| StaticTaintPolicy::new(), true, &strong);
        let ret = fx.node(1, false);

        assert!(fx.flow.call_to_return_flow(&fx.node(0, true), &ret, &Fact::path(y)).unwrap().is_empty());
        assert_eq!(
            fx.flow.call_to_return_flow(&fx.node(0, true), &ret, &Fact::path(x)).unwrap(),
            vec![Fact::path(x)]
        );
        assert_eq!(
            fx.flow.call_to_return_flow(&fx.node(0, true), &ret, &Fact::Zero).unwrap(),
            vec![Fact::Zero]
        );
    }

    #[test]
    fn test_call_to_return_for_unresolved_calls() {
        let mut index = InMemorySymbolIndex::new();
        let m = index.declare_method("M", &[]).method;
        let iface = index.declare_method("IReader.Read", &["v"]).method;
        index.mark_abstract(iface);
        let (x, y) = (index.symbol("x"), index.symbol("y"));
        index.set_body(
            m,
            BasicBlockGraph::straight_line(vec![Operation::assign(
                y,
                Value::Invoke(Invocation::new(iface, [Value::path(x)])),
            )]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new().source(iface), m);
        let call = fx.node(0, true);

        let out = fx.flow.call_to_return_flow(&call, &IcfgNode::exit(m), &Fact::Zero).unwrap();
        assert_eq!(out, vec![Fact::Zero, Fact::path(y)]);

        let out = fx.flow.call_to_return_flow(&call, &IcfgNode::exit(m), &Fact::path(x)).unwrap();
        assert_eq!(out, sorted(vec![Fact::path(x), Fact::path(y)]));
    }

    #[test]
    fn test_return_rebases_return_value() {
        let (fx, callee, p, _, y) = call_fixture(|_| StaticTaintPolicy::new());
        let call = fx.node(0, true);
        let ret = fx.node(1, false);

        let out = fx.flow.return_flow(&call, callee, &Fact::return_of(callee), &ret).unwrap();
        assert_eq!(out, vec![Fact::path(y)]);

        // Facts on the callee's formals mean nothing in the caller
        assert!(fx.flow.return_flow(&call, callee, &Fact::path(p), &ret).unwrap().is_empty());

        // Everything else passes unchanged
        let global = Fact::path(index_free_symbol());
        assert_eq!(fx.flow.return_flow(&call, callee, &global, &ret).unwrap(), vec![global]);
        assert_eq!(fx.flow.return_flow(&call, callee, &Fact::Zero, &ret).unwrap(), vec![Fact::Zero]);
    }

    #[test]
    fn test_return_from_sanitizer_is_clean() {
        let (fx, callee, _, _, _) = call_fixture(|callee| StaticTaintPolicy::new().sanitizer(callee));
        let out = fx
            .flow
            .return_flow(&fx.node(0, true), callee, &Fact::return_of(callee), &fx.node(1, false))
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_return_of_nested_call_forwards_to_caller() {
        let mut index = InMemorySymbolIndex::new();
        let outer = index.declare_method("Outer", &[]).method;
        let inner = index.declare_method("Inner", &[]).method;
        index.set_body(
            outer,
            BasicBlockGraph::straight_line(vec![Operation::ret(Some(Value::Invoke(Invocation::new(
                inner,
                [],
            ))))]),
        );
        let fx = Fixture::new(index, StaticTaintPolicy::new(), outer);

        let out = fx
            .flow
            .return_flow(&fx.node(0, true), inner, &Fact::return_of(inner), &IcfgNode::exit(outer))
            .unwrap();
        assert_eq!(out, vec![Fact::return_of(outer)]);
    }

    #[test]
    fn test_opaque_callee_forwards_formal_taint_to_result() {
        let (fx, callee, p, _, y) = call_fixture_with(|_| StaticTaintPolicy::new(), false, &IFDSConfig::default());
        let out = fx
            .flow
            .return_flow(&fx.node(0, true), callee, &Fact::path(p), &fx.node(1, false))
            .unwrap();
        assert_eq!(out, vec![Fact::path(y)]);
    }
}
