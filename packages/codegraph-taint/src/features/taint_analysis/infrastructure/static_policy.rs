//! Static taint policy
//!
//! Sources, sinks and sanitizers keyed either by symbol identity or by the
//! method signature string reported by the symbol index. Signature
//! catalogs can be loaded from YAML:
//!
//! ```yaml
//! version: 1
//! sources:
//!   - "System.Console.ReadLine()"
//! sinks:
//!   - signature: "System.Diagnostics.Process.Start(string)"
//!     arguments: [0]
//!     severity: Critical
//! sanitizers:
//!   - "System.Net.WebUtility.HtmlEncode(string)"
//! ```

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::config::{ConfigError, ConfigResult};
use crate::features::taint_analysis::domain::{Severity, Symbol};
use crate::features::taint_analysis::ports::{SymbolIndex, TaintPolicy};

/// Which arguments of a sink are checked, and how bad a hit is
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkSpec {
    /// `None` = every argument
    pub arguments: Option<Vec<usize>>,
    pub severity: Severity,
}

impl Default for SinkSpec {
    fn default() -> Self {
        Self {
            arguments: None,
            severity: Severity::High,
        }
    }
}

#[derive(Default)]
pub struct StaticTaintPolicy {
    sources: FxHashSet<Symbol>,
    sinks: FxHashMap<Symbol, SinkSpec>,
    sanitizers: FxHashSet<Symbol>,

    source_signatures: FxHashSet<String>,
    sink_signatures: FxHashMap<String, SinkSpec>,
    sanitizer_signatures: FxHashSet<String>,

    /// Resolves symbols to signatures for catalog lookups
    index: Option<Arc<dyn SymbolIndex>>,
}

impl StaticTaintPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable signature-keyed entries by resolving symbols through `index`
    pub fn with_index(mut self, index: Arc<dyn SymbolIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn source(mut self, method: Symbol) -> Self {
        self.sources.insert(method);
        self
    }

    /// Sink checked on every argument
    pub fn sink(mut self, method: Symbol) -> Self {
        self.sinks.insert(method, SinkSpec::default());
        self
    }

    pub fn sink_on(mut self, method: Symbol, arguments: Vec<usize>, severity: Severity) -> Self {
        self.sinks.insert(
            method,
            SinkSpec {
                arguments: Some(arguments),
                severity,
            },
        );
        self
    }

    pub fn sanitizer(mut self, method: Symbol) -> Self {
        self.sanitizers.insert(method);
        self
    }

    pub fn source_signature(mut self, signature: impl Into<String>) -> Self {
        self.source_signatures.insert(signature.into());
        self
    }

    pub fn sink_signature(mut self, signature: impl Into<String>, spec: SinkSpec) -> Self {
        self.sink_signatures.insert(signature.into(), spec);
        self
    }

    pub fn sanitizer_signature(mut self, signature: impl Into<String>) -> Self {
        self.sanitizer_signatures.insert(signature.into());
        self
    }

    /// Parse a `version: 1` signature catalog
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let doc: PolicyCatalogV1 = serde_yaml::from_str(yaml)?;
        match doc.version {
            None => return Err(ConfigError::MissingVersion),
            Some(1) => {}
            Some(found) => {
                return Err(ConfigError::UnsupportedVersion {
                    found,
                    supported: vec![1],
                })
            }
        }

        let mut policy = Self::new();
        policy.source_signatures.extend(doc.sources);
        policy.sanitizer_signatures.extend(doc.sanitizers);
        for sink in doc.sinks {
            if sink.signature.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "sink signature must not be empty".to_string(),
                ));
            }
            policy.sink_signatures.insert(
                sink.signature,
                SinkSpec {
                    arguments: sink.arguments,
                    severity: sink.severity.unwrap_or(Severity::High),
                },
            );
        }
        Ok(policy)
    }

    fn signature_of(&self, method: Symbol) -> Option<String> {
        self.index.as_ref().and_then(|index| index.signature(method))
    }

    fn sink_spec(&self, method: Symbol) -> Option<SinkSpec> {
        if let Some(spec) = self.sinks.get(&method) {
            return Some(spec.clone());
        }
        if self.sink_signatures.is_empty() {
            return None;
        }
        self.signature_of(method)
            .and_then(|signature| self.sink_signatures.get(&signature).cloned())
    }

    fn matches(&self, method: Symbol, symbols: &FxHashSet<Symbol>, signatures: &FxHashSet<String>) -> bool {
        if symbols.contains(&method) {
            return true;
        }
        !signatures.is_empty()
            && self
                .signature_of(method)
                .is_some_and(|signature| signatures.contains(&signature))
    }
}

impl TaintPolicy for StaticTaintPolicy {
    fn is_source(&self, method: Symbol) -> bool {
        self.matches(method, &self.sources, &self.source_signatures)
    }

    fn is_sink(&self, method: Symbol) -> bool {
        self.sink_spec(method).is_some()
    }

    fn is_sanitizer(&self, method: Symbol) -> bool {
        self.matches(method, &self.sanitizers, &self.sanitizer_signatures)
    }

    fn sink_arguments(&self, sink: Symbol) -> Option<Vec<usize>> {
        self.sink_spec(sink).and_then(|spec| spec.arguments)
    }

    fn sink_severity(&self, sink: Symbol) -> Severity {
        self.sink_spec(sink)
            .map(|spec| spec.severity)
            .unwrap_or(Severity::High)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PolicyCatalogV1 {
    version: Option<u32>,
    #[serde(default)]
    sources: Vec<String>,
    #[serde(default)]
    sinks: Vec<SinkEntry>,
    #[serde(default)]
    sanitizers: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SinkEntry {
    signature: String,
    arguments: Option<Vec<usize>>,
    severity: Option<Severity>,
}
