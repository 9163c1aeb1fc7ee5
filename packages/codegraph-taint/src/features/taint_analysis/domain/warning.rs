//! Recoverable problems recorded during a run

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::symbol::Symbol;

/// Category of skipped work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WarningKind {
    /// Abstract, external or otherwise body-less method: Entry→Exit only
    MethodWithoutBody,
    /// Control-flow graph failed validation: Entry→Exit only
    MalformedMethod,
    /// A flow function failed; the edge contributed no facts
    EdgeSkipped,
    /// Dedicated worker pool could not be created
    WorkerPoolFallback,
}

/// One logged warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisWarning {
    pub kind: WarningKind,
    pub method: Option<Symbol>,
    pub message: String,
}

impl AnalysisWarning {
    pub fn new(kind: WarningKind, method: Option<Symbol>, message: impl Into<String>) -> Self {
        Self {
            kind,
            method,
            message: message.into(),
        }
    }
}

impl fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.method {
            Some(method) => write!(f, "[{:?}] {}: {}", self.kind, method, self.message),
            None => write!(f, "[{:?}] {}", self.kind, self.message),
        }
    }
}

/// Append-only warning sink shared by the ICFG and the solver
#[derive(Debug, Default)]
pub struct WarningLog {
    entries: Mutex<Vec<AnalysisWarning>>,
}

impl WarningLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, warning: AnalysisWarning) {
        self.entries.lock().push(warning);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn snapshot(&self) -> Vec<AnalysisWarning> {
        self.entries.lock().clone()
    }
}
