//! Language-neutral operation IR
//!
//! Front ends lower method bodies into basic blocks of these operations.
//! The engine only asks structural questions of them: is this an
//! invocation / assignment / return, what is the target method, which
//! arguments, which assignment target.

use serde::{Deserialize, Serialize};

use crate::features::taint_analysis::domain::{AccessPath, BlockId, OpPosition, SourceLocation, Symbol};

/// Method invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    /// Declared target (dispatch is resolved by the symbol index)
    pub target: Symbol,
    /// Instance the method is invoked on, if any
    pub receiver: Option<AccessPath>,
    pub arguments: Vec<Value>,
}

impl Invocation {
    pub fn new(target: Symbol, arguments: impl IntoIterator<Item = Value>) -> Self {
        Self {
            target,
            receiver: None,
            arguments: arguments.into_iter().collect(),
        }
    }

    pub fn with_receiver(mut self, receiver: impl Into<AccessPath>) -> Self {
        self.receiver = Some(receiver.into());
        self
    }
}

/// Right-hand side / argument value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Read of a storage location
    Path(AccessPath),
    /// Result of a call
    Invoke(Invocation),
    /// Constant
    Literal,
    /// Any expression combining operands (concatenation, arithmetic, ...)
    Composite(Vec<Value>),
}

impl Value {
    pub fn path(path: impl Into<AccessPath>) -> Self {
        Value::Path(path.into())
    }

    pub fn as_invocation(&self) -> Option<&Invocation> {
        match self {
            Value::Invoke(invocation) => Some(invocation),
            _ => None,
        }
    }

    /// Operand paths read by this value. Composites are flattened;
    /// invocations are opaque.
    pub fn operand_paths(&self) -> Vec<&AccessPath> {
        let mut paths = Vec::new();
        self.collect_paths(&mut paths);
        paths
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a AccessPath>) {
        match self {
            Value::Path(path) => out.push(path),
            Value::Composite(parts) => {
                for part in parts {
                    part.collect_paths(out);
                }
            }
            Value::Invoke(_) | Value::Literal => {}
        }
    }

    /// Operand paths that read `fact` (see [`AccessPath::applies_to`])
    pub fn matching_paths(&self, fact: &AccessPath, field_sensitive: bool) -> Vec<&AccessPath> {
        self.operand_paths()
            .into_iter()
            .filter(|path| path.applies_to(fact, field_sensitive))
            .collect()
    }
}

/// Operation shape
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    /// `target = value`
    Assign { target: AccessPath, value: Value },
    /// Call evaluated for its effect
    Invoke(Invocation),
    /// `return value?`
    Return(Option<Value>),
    /// Anything without dataflow relevance (branch conditions, declarations)
    Nop,
}

/// One operation of a method body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub location: Option<SourceLocation>,
}

impl Operation {
    pub fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            location: None,
        }
    }

    pub fn assign(target: impl Into<AccessPath>, value: Value) -> Self {
        Self::new(OperationKind::Assign {
            target: target.into(),
            value,
        })
    }

    pub fn invoke(invocation: Invocation) -> Self {
        Self::new(OperationKind::Invoke(invocation))
    }

    pub fn ret(value: Option<Value>) -> Self {
        Self::new(OperationKind::Return(value))
    }

    pub fn nop() -> Self {
        Self::new(OperationKind::Nop)
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// The invocation this operation contains, if any
    pub fn invocation(&self) -> Option<&Invocation> {
        match &self.kind {
            OperationKind::Invoke(invocation) => Some(invocation),
            OperationKind::Assign { value, .. } => value.as_invocation(),
            OperationKind::Return(Some(value)) => value.as_invocation(),
            OperationKind::Return(None) | OperationKind::Nop => None,
        }
    }

    pub fn is_invocation(&self) -> bool {
        self.invocation().is_some()
    }

    pub fn is_assignment(&self) -> bool {
        matches!(self.kind, OperationKind::Assign { .. })
    }

    pub fn assignment_target(&self) -> Option<&AccessPath> {
        match &self.kind {
            OperationKind::Assign { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn is_return(&self) -> bool {
        matches!(self.kind, OperationKind::Return(_))
    }

    pub fn target_method(&self) -> Option<Symbol> {
        self.invocation().map(|invocation| invocation.target)
    }

    pub fn arguments(&self) -> &[Value] {
        self.invocation()
            .map(|invocation| invocation.arguments.as_slice())
            .unwrap_or(&[])
    }
}

/// Basic block: straight-line operations plus up to two successors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlock {
    pub operations: Vec<Operation>,
    pub fall_through: Option<BlockId>,
    pub conditional: Option<BlockId>,
}

impl BasicBlock {
    pub fn new(operations: Vec<Operation>) -> Self {
        Self {
            operations,
            fall_through: None,
            conditional: None,
        }
    }

    pub fn falls_through_to(mut self, block: u32) -> Self {
        self.fall_through = Some(BlockId(block));
        self
    }

    pub fn branches_to(mut self, block: u32) -> Self {
        self.conditional = Some(BlockId(block));
        self
    }

    /// Successor blocks, fall-through first
    pub fn successors(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.fall_through.into_iter().chain(self.conditional)
    }
}

/// Intraprocedural control-flow graph of one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicBlockGraph {
    pub entry: BlockId,
    pub blocks: Vec<BasicBlock>,
}

impl BasicBlockGraph {
    pub fn new(entry: u32, blocks: Vec<BasicBlock>) -> Self {
        Self {
            entry: BlockId(entry),
            blocks,
        }
    }

    /// Single block, no branches
    pub fn straight_line(operations: Vec<Operation>) -> Self {
        Self::new(0, vec![BasicBlock::new(operations)])
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.0 as usize)
    }

    pub fn operation(&self, position: OpPosition) -> Option<&Operation> {
        self.block(position.block)
            .and_then(|block| block.operations.get(position.index as usize))
    }

    pub fn operation_count(&self) -> usize {
        self.blocks.iter().map(|block| block.operations.len()).sum()
    }

    /// Check that every block reference is in range
    pub fn validate(&self) -> Result<(), String> {
        if self.block(self.entry).is_none() {
            return Err(format!(
                "entry block {} out of range ({} blocks)",
                self.entry.0,
                self.blocks.len()
            ));
        }
        for (index, block) in self.blocks.iter().enumerate() {
            for successor in block.successors() {
                if self.block(successor).is_none() {
                    return Err(format!(
                        "block {} references missing block {}",
                        index, successor.0
                    ));
                }
            }
        }
        Ok(())
    }
}
