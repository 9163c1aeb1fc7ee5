/*
 * Taint Findings
 *
 * A finding is one tainted argument reaching one sink call. It carries a
 * best-effort trace (seed → sink) for auditors and converts into a generic
 * diagnostic record consumed by the reporting layer.
 */

use serde::{Deserialize, Serialize};

use super::fact::{Fact, TaintFact};
use super::program_point::IcfgNode;
use super::symbol::{SourceLocation, Symbol};

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Critical: Immediate security risk
    Critical,
    /// High: Significant security risk
    High,
    /// Medium: Moderate security risk
    Medium,
    /// Low: Minor security risk
    Low,
    /// Info: Informational finding
    Info,
}

impl Severity {
    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

/// One exploded-graph state on a finding's trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceStep {
    pub node: IcfgNode,
    pub fact: Fact,
    pub location: Option<SourceLocation>,
}

/// Tainted data reaching a sink argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaintFinding {
    /// Sink method
    pub sink: Symbol,
    /// Zero-based index of the tainted argument
    pub arg_index: usize,
    /// Call-site node invoking the sink
    pub sink_node: IcfgNode,
    /// Fact holding at the sink node that matched the argument
    pub fact: TaintFact,
    /// Seed → sink
    pub trace: Vec<TraceStep>,
    pub severity: Severity,
    pub location: Option<SourceLocation>,
}

impl TaintFinding {
    /// Method containing the sink call
    pub fn method(&self) -> Symbol {
        self.sink_node.method
    }

    /// Render as a generic diagnostic record
    ///
    /// `name_of` maps symbols to display names (usually the symbol index).
    pub fn to_diagnostic(
        &self,
        template: &DiagnosticTemplate,
        name_of: impl Fn(Symbol) -> String,
    ) -> Diagnostic {
        let fact = match &self.fact {
            TaintFact::Path(path) => {
                let mut text = name_of(path.base());
                for field in path.fields() {
                    text.push('.');
                    text.push_str(&name_of(*field));
                }
                text
            }
            TaintFact::ReturnOf(method) => format!("return value of {}", name_of(*method)),
        };

        let origin = self
            .trace
            .first()
            .map(|step| name_of(step.node.method))
            .unwrap_or_else(|| name_of(self.method()));

        Diagnostic {
            id: template.id.clone(),
            title: template.title.clone(),
            message: format!(
                "Untrusted data from '{}' reaches argument {} of '{}' via '{}' in '{}'",
                origin,
                self.arg_index,
                name_of(self.sink),
                fact,
                name_of(self.method()),
            ),
            severity: self.severity,
            source_location: self.location.clone(),
            help_link: template.help_link.clone(),
        }
    }
}

/// Fixed fields copied into every diagnostic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticTemplate {
    pub id: String,
    pub title: String,
    pub help_link: Option<String>,
}

/// Generic diagnostic record for the reporting layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub source_location: Option<SourceLocation>,
    pub help_link: Option<String>,
}
