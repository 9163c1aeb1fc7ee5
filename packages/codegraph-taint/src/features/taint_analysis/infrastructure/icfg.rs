/*
 * Interprocedural Control-Flow Graph (on demand)
 *
 * Nodes:
 * - Entry / Exit per method
 * - Normal    : operation without invocation
 * - CallSite  : operation containing an invocation
 *
 * Edges (computed on first request, cached per node):
 * - Entry    → first operation (or Exit when the body is empty/missing)
 * - Normal   → next operation(s) along fall-through AND conditional blocks
 * - CallSite → return site(s)   [CallToReturn]
 *            → callee Entry     [Call, one per resolved callee]
 * - Exit     → registered return sites [Return]  (never cached)
 *
 * Nodes are interned into an integer arena behind a concurrent intern table;
 * the graph only ever grows during a run.
 */

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::errors::{Result, TaintError};
use crate::features::taint_analysis::domain::{
    AnalysisWarning, BlockId, IcfgNode, NodeKind, OpPosition, Symbol, WarningKind, WarningLog,
};
use crate::features::taint_analysis::ports::{BasicBlockGraph, Operation, SymbolIndex};

/// Arena index of an interned [`IcfgNode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// ICFG edge kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Intraprocedural,
    Call,
    Return,
    CallToReturn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IcfgEdge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    /// Originating call site of a Return edge
    pub call_site: Option<NodeId>,
}

impl IcfgEdge {
    fn new(from: NodeId, to: NodeId, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            kind,
            call_site: None,
        }
    }
}

/// A call site that invoked some callee, and where control resumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallerSite {
    pub call_site: NodeId,
    pub return_site: NodeId,
}

/// Per-method state: the lazily loaded body
///
/// `None` after loading means the method degrades to Entry → Exit.
#[derive(Debug)]
pub struct MethodContext {
    method: Symbol,
    body: OnceCell<Option<Arc<BasicBlockGraph>>>,
}

impl MethodContext {
    fn new(method: Symbol) -> Self {
        Self {
            method,
            body: OnceCell::new(),
        }
    }

    pub fn method(&self) -> Symbol {
        self.method
    }

    /// Body if already loaded
    pub fn loaded_body(&self) -> Option<&Arc<BasicBlockGraph>> {
        self.body.get().and_then(Option::as_ref)
    }
}

/// Borrowed view of one operation, keeping its method body alive
#[derive(Debug, Clone)]
pub struct OperationRef {
    body: Arc<BasicBlockGraph>,
    position: OpPosition,
}

impl OperationRef {
    fn new(body: Arc<BasicBlockGraph>, position: OpPosition) -> Option<Self> {
        body.operation(position)?;
        Some(Self { body, position })
    }

    pub fn position(&self) -> OpPosition {
        self.position
    }
}

impl Deref for OperationRef {
    type Target = Operation;

    fn deref(&self) -> &Operation {
        // Existence checked in `new`; bodies are immutable.
        &self.body.blocks[self.position.block.0 as usize].operations[self.position.index as usize]
    }
}

/// On-demand ICFG over a [`SymbolIndex`]
pub struct Icfg {
    index: Arc<dyn SymbolIndex>,
    warnings: Arc<WarningLog>,

    /// Structural node → arena id
    intern: DashMap<IcfgNode, NodeId>,
    /// Arena id → structural node
    nodes: RwLock<Vec<IcfgNode>>,

    /// Exactly-once edge computation per node
    edges: DashMap<NodeId, Arc<OnceCell<Arc<[IcfgEdge]>>>>,

    contexts: DashMap<Symbol, Arc<MethodContext>>,
    /// callee → call sites that have Call edges into it
    callers: DashMap<Symbol, Vec<CallerSite>>,
    /// declared target → resolved callees
    callees: DashMap<Symbol, Arc<[Symbol]>>,

    cfg_loads: AtomicUsize,
}

impl Icfg {
    pub fn new(index: Arc<dyn SymbolIndex>, warnings: Arc<WarningLog>) -> Self {
        Self {
            index,
            warnings,
            intern: DashMap::new(),
            nodes: RwLock::new(Vec::new()),
            edges: DashMap::new(),
            contexts: DashMap::new(),
            callers: DashMap::new(),
            callees: DashMap::new(),
            cfg_loads: AtomicUsize::new(0),
        }
    }

    pub fn index(&self) -> &dyn SymbolIndex {
        self.index.as_ref()
    }

    /// Number of method bodies requested from the symbol index
    pub fn cfg_loads(&self) -> usize {
        self.cfg_loads.load(Ordering::Relaxed)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.read().len()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Node arena
    // ═══════════════════════════════════════════════════════════════════════

    /// Arena id of `node`, assigned on first sight
    pub fn intern(&self, node: IcfgNode) -> NodeId {
        if let Some(id) = self.intern.get(&node) {
            return *id;
        }
        *self.intern.entry(node).or_insert_with(|| {
            let mut nodes = self.nodes.write();
            let id = NodeId(nodes.len() as u32);
            nodes.push(node);
            id
        })
    }

    pub fn node(&self, id: NodeId) -> Result<IcfgNode> {
        self.nodes
            .read()
            .get(id.index())
            .copied()
            .ok_or(TaintError::UnknownNode(id.0))
    }

    /// Copy of the arena, indexable by `NodeId::index`
    pub fn nodes_snapshot(&self) -> Vec<IcfgNode> {
        self.nodes.read().clone()
    }

    pub fn entry_node(&self, method: Symbol) -> NodeId {
        self.intern(IcfgNode::entry(method))
    }

    pub fn exit_node(&self, method: Symbol) -> NodeId {
        self.intern(IcfgNode::exit(method))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Method contexts
    // ═══════════════════════════════════════════════════════════════════════

    pub fn method_context(&self, method: Symbol) -> Arc<MethodContext> {
        self.contexts
            .entry(method)
            .or_insert_with(|| Arc::new(MethodContext::new(method)))
            .clone()
    }

    /// Validated body of `method`, loaded at most once
    pub fn body(&self, method: Symbol) -> Option<Arc<BasicBlockGraph>> {
        let context = self.method_context(method);
        context.body.get_or_init(|| self.load_body(method)).clone()
    }

    pub fn has_body(&self, method: Symbol) -> bool {
        self.body(method).is_some()
    }

    fn load_body(&self, method: Symbol) -> Option<Arc<BasicBlockGraph>> {
        self.cfg_loads.fetch_add(1, Ordering::Relaxed);

        let Some(body) = self.index.control_flow_graph(method) else {
            debug!(method = %method, "No analyzable body, Entry -> Exit only");
            self.warnings.push(AnalysisWarning::new(
                WarningKind::MethodWithoutBody,
                Some(method),
                "no analyzable body; modeled as Entry -> Exit",
            ));
            return None;
        };

        if let Err(reason) = body.validate() {
            let err = TaintError::MalformedCfg { method, reason };
            warn!(method = %method, error = %err, "Malformed method body, Entry -> Exit only");
            self.warnings.push(AnalysisWarning::new(
                WarningKind::MalformedMethod,
                Some(method),
                err.to_string(),
            ));
            return None;
        }

        debug!(
            method = %method,
            blocks = body.blocks.len(),
            operations = body.operation_count(),
            "Loaded method context"
        );
        Some(body)
    }

    /// Operation behind a Normal / CallSite node
    pub fn operation(&self, node: &IcfgNode) -> Option<OperationRef> {
        let position = node.position?;
        let body = self.body(node.method)?;
        OperationRef::new(body, position)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Dispatch
    // ═══════════════════════════════════════════════════════════════════════

    /// Methods a call to `target` may run
    ///
    /// Non-virtual: the target itself. Virtual: every override/implementation
    /// plus the target when it is not abstract. Cached per target.
    pub fn resolve_callees(&self, target: Symbol) -> Arc<[Symbol]> {
        if let Some(cached) = self.callees.get(&target) {
            return cached.clone();
        }

        let mut resolved = if self.index.is_virtual(target) {
            let mut overriders = self.index.resolve_overrides_or_implementations(target);
            if !self.index.is_abstract(target) {
                overriders.push(target);
            }
            overriders
        } else {
            vec![target]
        };
        resolved.sort();
        resolved.dedup();

        self.callees
            .entry(target)
            .or_insert_with(|| resolved.into())
            .clone()
    }

    /// Call sites registered so far as invoking `callee`
    pub fn callers_of(&self, callee: Symbol) -> Vec<CallerSite> {
        self.callers
            .get(&callee)
            .map(|sites| sites.clone())
            .unwrap_or_default()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Edges
    // ═══════════════════════════════════════════════════════════════════════

    /// Outgoing edges of `id`
    ///
    /// Computed exactly once per node, except for Exit nodes whose Return
    /// edges reflect the callers registered at the time of the call.
    pub fn outgoing_edges(&self, id: NodeId) -> Result<Arc<[IcfgEdge]>> {
        let node = self.node(id)?;
        if node.kind == NodeKind::Exit {
            return Ok(self.exit_edges(id, node.method));
        }

        let cell = self.edges.entry(id).or_default().clone();
        cell.get_or_try_init(|| self.compute_edges(id, node))
            .cloned()
    }

    /// Nodes control resumes at after the call at `call_site`
    pub fn return_sites(&self, call_site: NodeId) -> Result<Vec<NodeId>> {
        Ok(self
            .outgoing_edges(call_site)?
            .iter()
            .filter(|edge| edge.kind == EdgeKind::CallToReturn)
            .map(|edge| edge.to)
            .collect())
    }

    fn exit_edges(&self, exit: NodeId, method: Symbol) -> Arc<[IcfgEdge]> {
        self.callers_of(method)
            .into_iter()
            .map(|site| IcfgEdge {
                from: exit,
                to: site.return_site,
                kind: EdgeKind::Return,
                call_site: Some(site.call_site),
            })
            .collect()
    }

    fn compute_edges(&self, id: NodeId, node: IcfgNode) -> Result<Arc<[IcfgEdge]>> {
        let edges: Vec<IcfgEdge> = match (node.kind, node.position) {
            (NodeKind::Entry, _) => {
                let heads = match self.body(node.method) {
                    Some(body) => self.block_heads(node.method, &body, body.entry),
                    None => vec![IcfgNode::exit(node.method)],
                };
                heads
                    .into_iter()
                    .map(|head| IcfgEdge::new(id, self.intern(head), EdgeKind::Intraprocedural))
                    .collect()
            }
            (NodeKind::Normal, Some(position)) => self
                .successors(node.method, position)?
                .into_iter()
                .map(|next| IcfgEdge::new(id, self.intern(next), EdgeKind::Intraprocedural))
                .collect(),
            (NodeKind::CallSite, Some(position)) => self.call_site_edges(id, node, position)?,
            (NodeKind::Exit, _) => return Ok(self.exit_edges(id, node.method)),
            (_, None) => {
                return Err(TaintError::malformed_operation(node, "node without operation"));
            }
        };
        Ok(edges.into())
    }

    fn call_site_edges(
        &self,
        id: NodeId,
        node: IcfgNode,
        position: OpPosition,
    ) -> Result<Vec<IcfgEdge>> {
        let operation = self
            .operation(&node)
            .ok_or_else(|| TaintError::malformed_operation(node, "operation out of range"))?;
        let target = operation
            .target_method()
            .ok_or_else(|| TaintError::malformed_operation(node, "call site without invocation"))?;

        let return_sites: Vec<NodeId> = self
            .successors(node.method, position)?
            .into_iter()
            .map(|next| self.intern(next))
            .collect();

        let mut edges: Vec<IcfgEdge> = return_sites
            .iter()
            .map(|&site| IcfgEdge::new(id, site, EdgeKind::CallToReturn))
            .collect();

        for &callee in self.resolve_callees(target).iter() {
            edges.push(IcfgEdge::new(id, self.entry_node(callee), EdgeKind::Call));

            let mut registered = self.callers.entry(callee).or_default();
            for &return_site in &return_sites {
                registered.push(CallerSite {
                    call_site: id,
                    return_site,
                });
            }
        }

        Ok(edges)
    }

    /// Control-flow successors of the operation at `position`
    fn successors(&self, method: Symbol, position: OpPosition) -> Result<Vec<IcfgNode>> {
        let body = self
            .body(method)
            .ok_or_else(|| TaintError::malformed_operation(IcfgNode::entry(method), "no body"))?;
        let block = body.block(position.block).ok_or_else(|| {
            TaintError::malformed_operation(IcfgNode::at(method, position, false), "block out of range")
        })?;
        let operation = block.operations.get(position.index as usize).ok_or_else(|| {
            TaintError::malformed_operation(
                IcfgNode::at(method, position, false),
                "operation out of range",
            )
        })?;

        if operation.is_return() {
            return Ok(vec![IcfgNode::exit(method)]);
        }

        let next_index = position.index + 1;
        if let Some(next) = block.operations.get(next_index as usize) {
            let next_position = OpPosition {
                block: position.block,
                index: next_index,
            };
            return Ok(vec![IcfgNode::at(method, next_position, next.is_invocation())]);
        }

        let mut heads = Vec::new();
        let mut seen = FxHashSet::default();
        for successor in block.successors() {
            for head in self.block_heads(method, &body, successor) {
                if seen.insert(head) {
                    heads.push(head);
                }
            }
        }
        if heads.is_empty() && block.successors().next().is_none() {
            heads.push(IcfgNode::exit(method));
        }
        Ok(heads)
    }

    /// First operation(s) reached when control enters `start`
    ///
    /// Empty blocks are skipped through; an empty block without successors
    /// leads to Exit. A cycle of empty blocks leads nowhere.
    fn block_heads(&self, method: Symbol, body: &BasicBlockGraph, start: BlockId) -> Vec<IcfgNode> {
        let mut heads = Vec::new();
        let mut visited = FxHashSet::default();
        let mut stack = vec![start];

        while let Some(block_id) = stack.pop() {
            if !visited.insert(block_id) {
                continue;
            }
            let Some(block) = body.block(block_id) else {
                continue;
            };

            if let Some(first) = block.operations.first() {
                let position = OpPosition {
                    block: block_id,
                    index: 0,
                };
                heads.push(IcfgNode::at(method, position, first.is_invocation()));
                continue;
            }

            let mut successors: Vec<BlockId> = block.successors().collect();
            if successors.is_empty() {
                heads.push(IcfgNode::exit(method));
            }
            // Fall-through explored first
            successors.reverse();
            stack.extend(successors);
        }

        let mut seen = FxHashSet::default();
        heads.retain(|head| seen.insert(*head));
        heads
    }
}

impl fmt::Debug for Icfg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Icfg")
            .field("nodes", &self.node_count())
            .field("methods", &self.contexts.len())
            .field("cfg_loads", &self.cfg_loads())
            .finish()
    }
}
