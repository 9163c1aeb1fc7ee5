//! Entry-point seeds

use serde::{Deserialize, Serialize};

use crate::features::taint_analysis::domain::{Symbol, TaintFact};

/// Root method plus the facts holding at its entry
///
/// A root with no facts is still walked (Zero only) but produces no findings
/// on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryPointSeed {
    pub method: Symbol,
    pub facts: Vec<TaintFact>,
}

impl EntryPointSeed {
    pub fn new(method: Symbol) -> Self {
        Self {
            method,
            facts: Vec::new(),
        }
    }

    /// Seed each listed parameter as a tainted access path
    pub fn tainted_parameters(method: Symbol, parameters: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            method,
            facts: parameters.into_iter().map(TaintFact::path).collect(),
        }
    }

    pub fn with_fact(mut self, fact: TaintFact) -> Self {
        self.facts.push(fact);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::taint_analysis::domain::AccessPath;

    #[test]
    fn test_tainted_parameters() {
        let seed = EntryPointSeed::tainted_parameters(Symbol::new(1), [Symbol::new(2), Symbol::new(3)]);
        assert_eq!(seed.facts.len(), 2);
        assert_eq!(seed.facts[0], TaintFact::Path(AccessPath::new(Symbol::new(2))));
        assert!(EntryPointSeed::new(Symbol::new(1)).facts.is_empty());
    }
}
