//! Program points of the interprocedural control-flow graph

use serde::{Deserialize, Serialize};
use std::fmt;

use super::symbol::Symbol;

/// Index of a basic block inside one method body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub u32);

/// Position of an operation: block + index within the block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OpPosition {
    pub block: BlockId,
    pub index: u32,
}

impl OpPosition {
    pub const fn new(block: u32, index: u32) -> Self {
        Self {
            block: BlockId(block),
            index,
        }
    }
}

/// ICFG node kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeKind {
    Entry,
    Exit,
    Normal,
    /// Operation contains an invocation
    CallSite,
}

/// Structural identity of an ICFG node
///
/// `position` is `None` exactly for Entry and Exit nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IcfgNode {
    pub method: Symbol,
    pub kind: NodeKind,
    pub position: Option<OpPosition>,
}

impl IcfgNode {
    pub const fn entry(method: Symbol) -> Self {
        Self {
            method,
            kind: NodeKind::Entry,
            position: None,
        }
    }

    pub const fn exit(method: Symbol) -> Self {
        Self {
            method,
            kind: NodeKind::Exit,
            position: None,
        }
    }

    pub const fn at(method: Symbol, position: OpPosition, is_call_site: bool) -> Self {
        Self {
            method,
            kind: if is_call_site {
                NodeKind::CallSite
            } else {
                NodeKind::Normal
            },
            position: Some(position),
        }
    }
}

impl fmt::Display for IcfgNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.position) {
            (NodeKind::Entry, _) => write!(f, "{}:entry", self.method),
            (NodeKind::Exit, _) => write!(f, "{}:exit", self.method),
            (_, Some(pos)) => write!(f, "{}:b{}.{}", self.method, pos.block.0, pos.index),
            (_, None) => write!(f, "{}:?", self.method),
        }
    }
}
