/*
 * Taint Fact Model
 *
 * Dataflow facts of the IFDS taint problem:
 * - AccessPath: base symbol + field chain (k-limited)
 * - TaintFact:  a tainted location or a tainted pending return value
 * - Fact:       TaintFact ∪ {Zero}
 *
 * Example:
 *   Statement: y = x.a
 *   Input fact:  Path(x.a.b)
 *   Output facts: {Path(x.a.b), Path(y.b)}
 */

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::symbol::Symbol;

/// Value reachable from `base` through a chain of field dereferences
///
/// Immutable; cloning shares the field chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccessPath {
    base: Symbol,
    fields: Arc<[Symbol]>,
}

impl AccessPath {
    /// Path denoting the whole of `base`
    pub fn new(base: Symbol) -> Self {
        Self {
            base,
            fields: Arc::from(Vec::<Symbol>::new()),
        }
    }

    pub fn with_fields(base: Symbol, fields: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            base,
            fields: fields.into_iter().collect::<Vec<_>>().into(),
        }
    }

    pub fn base(&self) -> Symbol {
        self.base
    }

    pub fn fields(&self) -> &[Symbol] {
        &self.fields
    }

    /// Number of field dereferences
    pub fn depth(&self) -> usize {
        self.fields.len()
    }

    /// `self.field`
    pub fn append(&self, field: Symbol) -> Self {
        Self::with_fields(self.base, self.fields.iter().copied().chain([field]))
    }

    /// Drop fields beyond `k`. The shorter path stands for everything below it.
    pub fn truncated(&self, k: usize) -> Self {
        if self.fields.len() <= k {
            return self.clone();
        }
        Self::with_fields(self.base, self.fields[..k].iter().copied())
    }

    /// Same base and `self`'s chain is a prefix of `other`'s
    pub fn is_prefix_of(&self, other: &AccessPath) -> bool {
        self.base == other.base && other.fields.starts_with(&self.fields)
    }

    /// The two paths may denote overlapping storage
    pub fn overlaps(&self, other: &AccessPath) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }

    /// Whether a read of `self` reads `fact`: same base, or overlapping
    /// field chains when `field_sensitive`
    pub fn applies_to(&self, fact: &AccessPath, field_sensitive: bool) -> bool {
        if field_sensitive {
            self.overlaps(fact)
        } else {
            self.base == fact.base
        }
    }

    /// Move `self` from under `matched` to under `target`, keeping the suffix
    /// of `self` beyond `matched`.
    ///
    /// `x.a.b` rebased from `x.a` onto `y` is `y.b`; `x` rebased from `x.a`
    /// onto `y` is `y` (the fact covered all of `x`).
    pub fn rebase(&self, matched: &AccessPath, target: &AccessPath) -> AccessPath {
        let suffix: &[Symbol] = if matched.is_prefix_of(self) {
            &self.fields[matched.fields.len()..]
        } else {
            &[]
        };
        Self::with_fields(
            target.base,
            target.fields.iter().chain(suffix.iter()).copied(),
        )
    }
}

impl From<Symbol> for AccessPath {
    fn from(base: Symbol) -> Self {
        Self::new(base)
    }
}

impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base)?;
        for field in self.fields.iter() {
            write!(f, ".{}", field)?;
        }
        Ok(())
    }
}

/// A tainted storage location or pending return value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum TaintFact {
    /// The location denoted by the access path holds untrusted data
    Path(AccessPath),
    /// The not-yet-assigned return value of `method` is untrusted
    ReturnOf(Symbol),
}

impl TaintFact {
    pub fn path(path: impl Into<AccessPath>) -> Self {
        TaintFact::Path(path.into())
    }

    pub fn access_path(&self) -> Option<&AccessPath> {
        match self {
            TaintFact::Path(path) => Some(path),
            TaintFact::ReturnOf(_) => None,
        }
    }
}

impl fmt::Display for TaintFact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaintFact::Path(path) => write!(f, "{}", path),
            TaintFact::ReturnOf(method) => write!(f, "return({})", method),
        }
    }
}

/// Dataflow fact: the zero fact or a taint fact
///
/// `Zero` is the "no information" element. It holds at every reachable
/// program point so control flow is explored even where nothing is tainted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Fact {
    Zero,
    Taint(TaintFact),
}

impl Fact {
    pub fn zero() -> Self {
        Fact::Zero
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Fact::Zero)
    }

    pub fn as_taint(&self) -> Option<&TaintFact> {
        match self {
            Fact::Zero => None,
            Fact::Taint(taint) => Some(taint),
        }
    }

    pub fn access_path(&self) -> Option<&AccessPath> {
        self.as_taint().and_then(TaintFact::access_path)
    }

    /// Shorthand for `Fact::Taint(TaintFact::Path(..))`
    pub fn path(path: impl Into<AccessPath>) -> Self {
        Fact::Taint(TaintFact::path(path))
    }

    pub fn return_of(method: Symbol) -> Self {
        Fact::Taint(TaintFact::ReturnOf(method))
    }
}

impl From<TaintFact> for Fact {
    fn from(taint: TaintFact) -> Self {
        Fact::Taint(taint)
    }
}

impl fmt::Display for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fact::Zero => write!(f, "0"),
            Fact::Taint(taint) => write!(f, "{}", taint),
        }
    }
}
