/*
 * Trace / Diagnostic Extractor
 *
 * 1. Scan every call-site node with facts for invocations of a sink
 *    (declared target or any resolved callee)
 * 2. For each checked argument, pick the smallest fact the argument reads
 * 3. Walk predecessors backward from (sink node, fact) to a seed:
 *    smallest unvisited predecessor first, stop at Zero / no predecessor.
 *    Crossing a Return backward pushes the return site; at the callee's
 *    Entry the walk leaves through the call site owning that return site
 * 4. Shape the trace (transitions or full) and cap its length
 *
 * Transitions mode keeps the first state of every run of equal facts plus
 * the sink state, e.g. for `s = input; Sink(s);`:
 *   (entry, input) → (Sink(s), s)
 */

use rustc_hash::FxHashSet;

use crate::config::{IFDSConfig, TraceMode};
use crate::features::taint_analysis::domain::{
    Fact, IcfgNode, NodeKind, Symbol, TaintFact, TaintFinding, TraceStep,
};
use crate::features::taint_analysis::ports::TaintPolicy;

use super::icfg::Icfg;
use super::ifds_solver::{ExplodedNode, IFDSAnalysisResult};

pub struct TraceExtractor<'a> {
    icfg: &'a Icfg,
    policy: &'a dyn TaintPolicy,
    trace_mode: TraceMode,
    max_trace_length: usize,
    field_sensitive: bool,
}

impl<'a> TraceExtractor<'a> {
    pub fn new(icfg: &'a Icfg, policy: &'a dyn TaintPolicy, config: &IFDSConfig) -> Self {
        Self {
            icfg,
            policy,
            trace_mode: config.trace_mode,
            max_trace_length: config.max_trace_length.max(1),
            field_sensitive: config.field_sensitive_matching,
        }
    }

    /// All findings, sorted by sink node, sink and argument
    pub fn extract(&self, result: &IFDSAnalysisResult) -> Vec<TaintFinding> {
        let mut findings = Vec::new();

        for (node, facts) in &result.result_map {
            if node.kind != NodeKind::CallSite || facts.is_empty() {
                continue;
            }
            let Some(operation) = self.icfg.operation(node) else {
                continue;
            };
            let Some(invocation) = operation.invocation() else {
                continue;
            };

            for sink in self.sinks_of(invocation.target) {
                let checked: Vec<usize> = match self.policy.sink_arguments(sink) {
                    Some(indices) => indices,
                    None => (0..invocation.arguments.len()).collect(),
                };

                for arg_index in checked {
                    let Some(argument) = invocation.arguments.get(arg_index) else {
                        continue;
                    };
                    let matched = facts
                        .iter()
                        .filter(|fact| {
                            fact.access_path()
                                .is_some_and(|path| {
                                    !argument.matching_paths(path, self.field_sensitive).is_empty()
                                })
                        })
                        .min();
                    let Some(fact) = matched else {
                        continue;
                    };

                    findings.push(TaintFinding {
                        sink,
                        arg_index,
                        sink_node: *node,
                        fact: fact.clone(),
                        trace: self.trace(result, *node, fact),
                        severity: self.policy.sink_severity(sink),
                        location: operation.location.clone(),
                    });
                }
            }
        }

        findings.sort_by(|a, b| {
            (a.sink_node, a.sink, a.arg_index).cmp(&(b.sink_node, b.sink, b.arg_index))
        });
        findings
    }

    /// Sink methods a call to `target` may reach
    fn sinks_of(&self, target: Symbol) -> Vec<Symbol> {
        let mut sinks: Vec<Symbol> = std::iter::once(target)
            .chain(self.icfg.resolve_callees(target).iter().copied())
            .filter(|&method| self.policy.is_sink(method))
            .collect();
        sinks.sort();
        sinks.dedup();
        sinks
    }

    /// Seed → sink states for `fact` at `sink_node`
    pub fn trace(&self, result: &IFDSAnalysisResult, sink_node: IcfgNode, fact: &TaintFact) -> Vec<TraceStep> {
        let mut current = ExplodedNode::new(sink_node, Fact::Taint(fact.clone()));
        let mut visited = FxHashSet::default();
        visited.insert(current.clone());
        let mut chain = vec![current.clone()];
        // Return sites of the calls the walk is currently inside of
        let mut pending_returns: Vec<IcfgNode> = Vec::new();

        loop {
            let next = result
                .predecessors(&current)
                .and_then(|preds| self.choose_predecessor(&current, preds, &visited, &pending_returns));
            match next {
                Some(pred) if !pred.fact.is_zero() => {
                    if pred.node.kind == NodeKind::Exit {
                        pending_returns.push(current.node);
                    } else if current.node.kind == NodeKind::Entry {
                        pending_returns.pop();
                    }
                    visited.insert(pred.clone());
                    chain.push(pred.clone());
                    current = pred;
                }
                _ => break,
            }
        }
        chain.reverse();

        let states = match self.trace_mode {
            TraceMode::Full => chain,
            TraceMode::Transitions => {
                let sink_state = chain.last().cloned();
                let mut kept: Vec<ExplodedNode> = Vec::new();
                for state in chain {
                    if kept.last().map(|last| &last.fact) != Some(&state.fact) {
                        kept.push(state);
                    }
                }
                // The sink occurrence always ends the trace
                if let Some(sink_state) = sink_state {
                    if kept.last() != Some(&sink_state) {
                        kept.push(sink_state);
                    }
                }
                kept
            }
        };

        self.cap(states)
            .into_iter()
            .map(|state| TraceStep {
                location: self
                    .icfg
                    .operation(&state.node)
                    .and_then(|operation| operation.location.clone()),
                node: state.node,
                fact: state.fact,
            })
            .collect()
    }

    /// Smallest unvisited predecessor; at an Entry, callers matching the
    /// innermost pending return site come first
    fn choose_predecessor(
        &self,
        current: &ExplodedNode,
        preds: &FxHashSet<ExplodedNode>,
        visited: &FxHashSet<ExplodedNode>,
        pending_returns: &[IcfgNode],
    ) -> Option<ExplodedNode> {
        let unvisited = || preds.iter().filter(|pred| !visited.contains(*pred));

        if current.node.kind == NodeKind::Entry {
            if let Some(return_site) = pending_returns.last() {
                let matching = unvisited()
                    .filter(|pred| self.returns_to(&pred.node, return_site))
                    .min();
                if matching.is_some() {
                    return matching.cloned();
                }
            }
        }
        unvisited().min().cloned()
    }

    fn returns_to(&self, call_site: &IcfgNode, return_site: &IcfgNode) -> bool {
        if call_site.kind != NodeKind::CallSite {
            return false;
        }
        let return_id = self.icfg.intern(*return_site);
        self.icfg
            .return_sites(self.icfg.intern(*call_site))
            .is_ok_and(|sites| sites.contains(&return_id))
    }

    /// Keep the seed and the states closest to the sink
    fn cap(&self, mut states: Vec<ExplodedNode>) -> Vec<ExplodedNode> {
        if states.len() <= self.max_trace_length {
            return states;
        }
        if self.max_trace_length == 1 {
            return states.split_off(states.len() - 1);
        }
        let tail = states.split_off(states.len() - (self.max_trace_length - 1));
        states.truncate(1);
        states.extend(tail);
        states
    }
}
