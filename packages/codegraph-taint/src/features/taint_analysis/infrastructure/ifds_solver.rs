/*
 * IFDS Tabulation Algorithm (Solver)
 *
 * Implements the worklist-based tabulation algorithm from:
 * Reps, Horwitz, Sagiv (1995): "Precise Interprocedural Dataflow Analysis via Graph Reachability"
 *
 * Algorithm Overview:
 * 1. Seed (0, entry, 0) per root and (f, entry, f) per seeded fact
 * 2. Drain the frontier of path edges (d1, n, d2) in parallel rounds
 * 3. For each outgoing ICFG edge of n:
 *    - Intraprocedural / CallToReturn: flow(d2) = {d3, ...} → (d1, m, d3)
 *    - Call: entry facts d3 → (d3, calleeEntry, d3); caller registered under
 *      (calleeEntry, d3); a memoized summary is applied directly instead
 * 4. Exit (d1, exit, d2): record d2 in the summary of (entry, d1), return it
 *    to every caller registered under that key
 * 5. Repeat until the frontier is empty, cancellation, or the budget is spent
 *
 * Concurrency:
 * - Path edges: DashSet, atomic test-and-insert is the "new edge" check
 * - Summaries: one parking_lot Mutex per (calleeEntry, d1) guarding callers
 *   AND exit facts, so a caller never misses an exit fact and vice versa
 * - Outgoing edges of one state are processed with a nested par_iter
 *
 * References:
 * - Reps, Horwitz, Sagiv (1995): Original IFDS paper
 * - Naeem, Lhoták, Rodriguez (2010): Practical extensions
 */

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::IFDSConfig;
use crate::errors::{Result, TaintError};
use crate::features::taint_analysis::domain::{
    AnalysisWarning, Fact, IcfgNode, NodeKind, Symbol, TaintFact, WarningKind, WarningLog,
};
use crate::features::taint_analysis::ports::EntryPointSeed;

use super::cancellation::CancellationToken;
use super::flow_functions::FlowFunctions;
use super::icfg::{EdgeKind, Icfg, IcfgEdge, NodeId};

/// Exploded-graph state in structural form (reported to callers)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExplodedNode {
    pub node: IcfgNode,
    pub fact: Fact,
}

impl ExplodedNode {
    pub fn new(node: IcfgNode, fact: Fact) -> Self {
        Self { node, fact }
    }
}

/// Exploded-graph state keyed by arena id (solver internal)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct State {
    node: NodeId,
    fact: Fact,
}

/// Jump function (d1, n, d2): `target_fact` holds at `target_node` when
/// `source_fact` held at the entry of its method
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathEdge {
    pub source_fact: Fact,
    pub target_node: NodeId,
    pub target_fact: Fact,
}

impl PathEdge {
    pub fn new(source_fact: Fact, target_node: NodeId, target_fact: Fact) -> Self {
        Self {
            source_fact,
            target_node,
            target_fact,
        }
    }

    fn target(&self) -> State {
        State {
            node: self.target_node,
            fact: self.target_fact.clone(),
        }
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolveOutcome {
    /// Fixed point reached
    Completed,
    /// Cancellation was observed; results are partial
    Cancelled,
    /// `max_iterations` path edges were processed; results are partial
    IterationLimitReached,
}

impl SolveOutcome {
    pub fn is_complete(&self) -> bool {
        matches!(self, SolveOutcome::Completed)
    }
}

/// IFDS Analysis Statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IFDSStatistics {
    /// Number of path edges processed
    pub num_iterations: usize,

    /// Number of worklist rounds
    pub num_rounds: usize,

    /// Number of distinct path edges computed
    pub num_path_edges: usize,

    /// Number of (entry state, exit fact) summary edges
    pub num_summary_edges: usize,

    /// Number of summary edge reuses
    /// Higher is better - indicates callee re-analysis was avoided
    pub num_summary_reuses: usize,

    /// Number of edges skipped because a flow function failed
    pub num_flow_errors: usize,

    /// Number of method bodies loaded
    pub num_cfg_loads: usize,

    /// Number of ICFG nodes materialized
    pub num_icfg_nodes: usize,

    /// Analysis time (milliseconds)
    pub analysis_time_ms: u64,
}

/// Solver output
#[derive(Debug, Clone)]
pub struct IFDSAnalysisResult {
    pub outcome: SolveOutcome,

    /// Node → taint facts holding there (Zero excluded)
    pub result_map: FxHashMap<IcfgNode, FxHashSet<TaintFact>>,

    /// State → immediate predecessor states (provenance only)
    pub path_edges: FxHashMap<ExplodedNode, FxHashSet<ExplodedNode>>,

    /// Callee entry state → facts at the callee's exit
    pub summary_edges: FxHashMap<ExplodedNode, FxHashSet<Fact>>,

    /// Method → number of distinct entry facts its body was tabulated for
    pub entry_tabulations: FxHashMap<Symbol, usize>,

    pub statistics: IFDSStatistics,
}

impl IFDSAnalysisResult {
    pub fn facts_at(&self, node: &IcfgNode) -> Option<&FxHashSet<TaintFact>> {
        self.result_map.get(node)
    }

    pub fn is_fact_at_node(&self, node: &IcfgNode, fact: &TaintFact) -> bool {
        self.result_map
            .get(node)
            .is_some_and(|facts| facts.contains(fact))
    }

    /// Nodes where `fact` holds
    pub fn nodes_with_fact(&self, fact: &TaintFact) -> Vec<IcfgNode> {
        let mut nodes: Vec<IcfgNode> = self
            .result_map
            .iter()
            .filter(|(_, facts)| facts.contains(fact))
            .map(|(node, _)| *node)
            .collect();
        nodes.sort();
        nodes
    }

    pub fn predecessors(&self, state: &ExplodedNode) -> Option<&FxHashSet<ExplodedNode>> {
        self.path_edges.get(state)
    }

    /// Exit facts memoized for `method` entered with `entry_fact`
    pub fn summary(&self, method: Symbol, entry_fact: &Fact) -> Option<&FxHashSet<Fact>> {
        self.summary_edges
            .get(&ExplodedNode::new(IcfgNode::entry(method), entry_fact.clone()))
    }

    pub fn entry_tabulations(&self, method: Symbol) -> usize {
        self.entry_tabulations.get(&method).copied().unwrap_or(0)
    }

    pub fn statistics(&self) -> &IFDSStatistics {
        &self.statistics
    }
}

/// Caller waiting on a callee entry state
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CallerContext {
    call_site: NodeId,
    return_site: NodeId,
    /// Context fact of the caller's jump function
    source_fact: Fact,
}

#[derive(Debug, Default)]
struct SummaryEntry {
    callers: FxHashSet<CallerContext>,
    exit_facts: FxHashSet<Fact>,
}

type SummaryKey = (NodeId, Fact);

/// IFDS solver over an on-demand ICFG
///
/// One solver instance performs one run.
pub struct IFDSSolver {
    icfg: Arc<Icfg>,
    flow: Box<dyn FlowFunctions>,
    warnings: Arc<WarningLog>,
    max_iterations: usize,
    worker_threads: usize,

    path_edges: DashSet<PathEdge>,
    predecessors: DashMap<State, FxHashSet<State>>,
    results: DashMap<NodeId, FxHashSet<TaintFact>>,
    summaries: DashMap<SummaryKey, Arc<Mutex<SummaryEntry>>>,
    entry_facts: DashMap<Symbol, FxHashSet<Fact>>,
    worklist: Mutex<Vec<PathEdge>>,

    iterations: AtomicUsize,
    rounds: AtomicUsize,
    summary_reuses: AtomicUsize,
    flow_errors: AtomicUsize,
    limit_reached: AtomicBool,
}

impl IFDSSolver {
    pub fn new(
        icfg: Arc<Icfg>,
        flow: Box<dyn FlowFunctions>,
        config: &IFDSConfig,
        warnings: Arc<WarningLog>,
    ) -> Self {
        Self {
            icfg,
            flow,
            warnings,
            max_iterations: config.max_iterations,
            worker_threads: config.effective_worker_threads(),
            path_edges: DashSet::new(),
            predecessors: DashMap::new(),
            results: DashMap::new(),
            summaries: DashMap::new(),
            entry_facts: DashMap::new(),
            worklist: Mutex::new(Vec::new()),
            iterations: AtomicUsize::new(0),
            rounds: AtomicUsize::new(0),
            summary_reuses: AtomicUsize::new(0),
            flow_errors: AtomicUsize::new(0),
            limit_reached: AtomicBool::new(false),
        }
    }

    /// Run to a fixed point (or until cancelled / out of budget)
    pub fn solve(self, seeds: &[EntryPointSeed], token: &CancellationToken) -> IFDSAnalysisResult {
        let start = Instant::now();
        info!(
            roots = seeds.len(),
            workers = self.worker_threads,
            max_iterations = self.max_iterations,
            "IFDS solve started"
        );

        self.seed(seeds);

        let outcome = match self.build_pool() {
            Some(pool) => pool.install(|| self.run(token)),
            None => self.run(token),
        };

        let result = self.into_result(outcome, start.elapsed());
        let stats = &result.statistics;
        info!(
            outcome = ?result.outcome,
            iterations = stats.num_iterations,
            rounds = stats.num_rounds,
            path_edges = stats.num_path_edges,
            summary_edges = stats.num_summary_edges,
            summary_reuses = stats.num_summary_reuses,
            flow_errors = stats.num_flow_errors,
            time_ms = stats.analysis_time_ms,
            "IFDS solve finished"
        );
        result
    }

    fn build_pool(&self) -> Option<rayon::ThreadPool> {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(self.worker_threads)
            .thread_name(|i| format!("ifds-worker-{}", i))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(err) => {
                warn!(error = %err, "Failed to build IFDS worker pool, using global pool");
                self.warnings.push(AnalysisWarning::new(
                    WarningKind::WorkerPoolFallback,
                    None,
                    format!("dedicated worker pool unavailable: {}", err),
                ));
                None
            }
        }
    }

    fn seed(&self, seeds: &[EntryPointSeed]) {
        for seed in seeds {
            let entry = self.icfg.entry_node(seed.method);
            self.propagate(PathEdge::new(Fact::Zero, entry, Fact::Zero), None);
            for fact in &seed.facts {
                let fact = Fact::Taint(fact.clone());
                self.propagate(PathEdge::new(fact.clone(), entry, fact), None);
            }
        }
    }

    fn run(&self, token: &CancellationToken) -> SolveOutcome {
        loop {
            if let Err(err) = token.check() {
                debug!(rounds = self.rounds.load(Ordering::Relaxed), error = %err, "Stopping IFDS run");
                return SolveOutcome::Cancelled;
            }
            if self.limit_reached.load(Ordering::Acquire) {
                return SolveOutcome::IterationLimitReached;
            }

            let frontier = std::mem::take(&mut *self.worklist.lock());
            if frontier.is_empty() {
                return SolveOutcome::Completed;
            }
            let round = self.rounds.fetch_add(1, Ordering::Relaxed) + 1;
            debug!(round, frontier = frontier.len(), "IFDS round");

            frontier.par_iter().for_each(|edge| self.process(edge, token));
        }
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Propagate
    // ═══════════════════════════════════════════════════════════════════════

    /// Record `edge` (and its predecessor) and enqueue it if new.
    /// Idempotent; returns whether the path edge was new.
    fn propagate(&self, edge: PathEdge, predecessor: Option<&State>) -> bool {
        let target = edge.target();

        if let Fact::Taint(taint) = &edge.target_fact {
            self.results
                .entry(edge.target_node)
                .or_default()
                .insert(taint.clone());
        }

        if let Some(predecessor) = predecessor {
            if *predecessor != target {
                self.predecessors
                    .entry(target.clone())
                    .or_default()
                    .insert(predecessor.clone());
            }
        }

        if !self.path_edges.insert(edge.clone()) {
            return false;
        }

        if let Ok(node) = self.icfg.node(edge.target_node) {
            if node.kind == NodeKind::Entry {
                self.entry_facts
                    .entry(node.method)
                    .or_default()
                    .insert(edge.target_fact.clone());
            }
        }

        self.worklist.lock().push(edge);
        true
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Processing
    // ═══════════════════════════════════════════════════════════════════════

    fn process(&self, edge: &PathEdge, token: &CancellationToken) {
        if token.is_cancelled() || self.limit_reached.load(Ordering::Relaxed) {
            // Unprocessed edges stay recorded; the run ends after this round
            return;
        }
        if self.iterations.fetch_add(1, Ordering::Relaxed) >= self.max_iterations {
            self.limit_reached.store(true, Ordering::Release);
            return;
        }

        let node = match self.icfg.node(edge.target_node) {
            Ok(node) => node,
            Err(err) => return self.skip_edge(None, err),
        };

        if node.kind == NodeKind::Exit {
            if let Err(err) = self.process_exit(edge, &node) {
                self.skip_edge(Some(node.method), err);
            }
            return;
        }

        let outgoing = match self.icfg.outgoing_edges(edge.target_node) {
            Ok(outgoing) => outgoing,
            Err(err) => return self.skip_edge(Some(node.method), err),
        };

        outgoing.par_iter().for_each(|icfg_edge| {
            match self.process_edge(edge, &node, icfg_edge, token) {
                Ok(()) => {}
                // Ends the run at the next round boundary, never a warning
                Err(err) if err.is_fatal() => {}
                Err(err) => self.skip_edge(Some(node.method), err),
            }
        });
    }

    fn process_edge(
        &self,
        edge: &PathEdge,
        node: &IcfgNode,
        icfg_edge: &IcfgEdge,
        token: &CancellationToken,
    ) -> Result<()> {
        token.check()?;
        let source = edge.target();
        let to = self.icfg.node(icfg_edge.to)?;

        let facts = match icfg_edge.kind {
            EdgeKind::Intraprocedural => self.flow.normal_flow(node, &to, &edge.target_fact)?,
            EdgeKind::CallToReturn => {
                self.flow.call_to_return_flow(node, &to, &edge.target_fact)?
            }
            EdgeKind::Call => return self.process_call(edge, node, icfg_edge.to, &to),
            EdgeKind::Return => {
                return Err(TaintError::malformed_operation(node, "return edge outside exit"));
            }
        };

        for fact in facts {
            self.propagate(
                PathEdge::new(edge.source_fact.clone(), icfg_edge.to, fact),
                Some(&source),
            );
        }
        Ok(())
    }

    fn process_call(
        &self,
        edge: &PathEdge,
        call_node: &IcfgNode,
        callee_entry: NodeId,
        callee_entry_node: &IcfgNode,
    ) -> Result<()> {
        let callee = callee_entry_node.method;
        let call_state = edge.target();
        let entry_facts = self
            .flow
            .call_flow(call_node, callee, &edge.target_fact)?;
        if entry_facts.is_empty() {
            return Ok(());
        }
        let return_sites = self.icfg.return_sites(edge.target_node)?;
        let exit = self.icfg.exit_node(callee);

        for entry_fact in entry_facts {
            let summary = self
                .summaries
                .entry((callee_entry, entry_fact.clone()))
                .or_default()
                .clone();

            let cached_exits: Vec<Fact> = {
                let mut summary = summary.lock();
                for &return_site in &return_sites {
                    summary.callers.insert(CallerContext {
                        call_site: edge.target_node,
                        return_site,
                        source_fact: edge.source_fact.clone(),
                    });
                }
                summary.exit_facts.iter().cloned().collect()
            };

            // Records the call as a predecessor of the entry; no-op re-walk if already tabulated
            self.propagate(
                PathEdge::new(entry_fact.clone(), callee_entry, entry_fact.clone()),
                Some(&call_state),
            );

            if cached_exits.is_empty() {
                continue;
            }

            self.summary_reuses.fetch_add(1, Ordering::Relaxed);
            debug!(callee = %callee, entry_fact = %entry_fact, exits = cached_exits.len(), "Summary reuse");

            for exit_fact in &cached_exits {
                let exit_state = State {
                    node: exit,
                    fact: exit_fact.clone(),
                };
                for &return_site in &return_sites {
                    self.apply_return(
                        call_node,
                        callee,
                        exit_fact,
                        &edge.source_fact,
                        return_site,
                        &exit_state,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn process_exit(&self, edge: &PathEdge, exit_node: &IcfgNode) -> Result<()> {
        let callee = exit_node.method;
        let entry = self.icfg.entry_node(callee);

        let summary = self
            .summaries
            .entry((entry, edge.source_fact.clone()))
            .or_default()
            .clone();

        let callers: Vec<CallerContext> = {
            let mut summary = summary.lock();
            if !summary.exit_facts.insert(edge.target_fact.clone()) {
                return Ok(());
            }
            summary.callers.iter().cloned().collect()
        };

        let exit_state = edge.target();
        for caller in callers {
            let call_node = self.icfg.node(caller.call_site)?;
            if let Err(err) = self.apply_return(
                &call_node,
                callee,
                &edge.target_fact,
                &caller.source_fact,
                caller.return_site,
                &exit_state,
            ) {
                self.skip_edge(Some(call_node.method), err);
            }
        }
        Ok(())
    }

    fn apply_return(
        &self,
        call_node: &IcfgNode,
        callee: Symbol,
        exit_fact: &Fact,
        caller_fact: &Fact,
        return_site: NodeId,
        exit_state: &State,
    ) -> Result<()> {
        let return_node = self.icfg.node(return_site)?;
        let facts = self
            .flow
            .return_flow(call_node, callee, exit_fact, &return_node)?;
        for fact in facts {
            self.propagate(
                PathEdge::new(caller_fact.clone(), return_site, fact),
                Some(exit_state),
            );
        }
        Ok(())
    }

    fn skip_edge(&self, method: Option<Symbol>, err: TaintError) {
        self.flow_errors.fetch_add(1, Ordering::Relaxed);
        warn!(method = ?method, error = %err, "Skipping edge");
        self.warnings.push(AnalysisWarning::new(
            WarningKind::EdgeSkipped,
            method,
            err.to_string(),
        ));
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Result
    // ═══════════════════════════════════════════════════════════════════════

    fn into_result(self, outcome: SolveOutcome, elapsed: Duration) -> IFDSAnalysisResult {
        let nodes = self.icfg.nodes_snapshot();
        let structural = |id: NodeId| nodes.get(id.index()).copied();
        let exploded = |state: &State| {
            structural(state.node).map(|node| ExplodedNode::new(node, state.fact.clone()))
        };

        let result_map: FxHashMap<IcfgNode, FxHashSet<TaintFact>> = self
            .results
            .into_iter()
            .filter_map(|(id, facts)| structural(id).map(|node| (node, facts)))
            .collect();

        let path_edges: FxHashMap<ExplodedNode, FxHashSet<ExplodedNode>> = self
            .predecessors
            .iter()
            .filter_map(|entry| {
                let target = exploded(entry.key())?;
                let preds = entry.value().iter().filter_map(&exploded).collect();
                Some((target, preds))
            })
            .collect();

        let mut num_summary_edges = 0;
        let summary_edges: FxHashMap<ExplodedNode, FxHashSet<Fact>> = self
            .summaries
            .iter()
            .filter_map(|entry| {
                let (node, fact) = entry.key();
                let exits = entry.value().lock().exit_facts.clone();
                num_summary_edges += exits.len();
                Some((ExplodedNode::new(structural(*node)?, fact.clone()), exits))
            })
            .collect();

        let entry_tabulations: FxHashMap<Symbol, usize> = self
            .entry_facts
            .iter()
            .map(|entry| (*entry.key(), entry.value().len()))
            .collect();

        let statistics = IFDSStatistics {
            num_iterations: self.iterations.load(Ordering::Relaxed).min(self.max_iterations),
            num_rounds: self.rounds.load(Ordering::Relaxed),
            num_path_edges: self.path_edges.len(),
            num_summary_edges,
            num_summary_reuses: self.summary_reuses.load(Ordering::Relaxed),
            num_flow_errors: self.flow_errors.load(Ordering::Relaxed),
            num_cfg_loads: self.icfg.cfg_loads(),
            num_icfg_nodes: nodes.len(),
            analysis_time_ms: elapsed.as_millis() as u64,
        };

        IFDSAnalysisResult {
            outcome,
            result_map,
            path_edges,
            summary_edges,
            entry_tabulations,
            statistics,
        }
    }
}
