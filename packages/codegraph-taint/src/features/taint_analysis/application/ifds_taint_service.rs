/*
 * IFDS Taint Service
 *
 * Single entry point for one analysis run:
 *   config.validate()
 *   → Icfg (over the SymbolIndex)
 *   → TaintFlowFunctions (over the TaintPolicy)
 *   → IFDSSolver::solve(seeds)
 *   → TraceExtractor::extract
 *   → TaintAnalysisReport
 *
 * All run state is created fresh per `analyze` call; the service itself is
 * immutable and can be shared across threads.
 */

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::IFDSConfig;
use crate::errors::Result;
use crate::features::taint_analysis::domain::{
    AnalysisWarning, Diagnostic, DiagnosticTemplate, TaintFinding, WarningLog,
};
use crate::features::taint_analysis::infrastructure::{
    CancellationToken, IFDSAnalysisResult, IFDSSolver, IFDSStatistics, Icfg, SolveOutcome,
    TaintFlowFunctions, TraceExtractor,
};
use crate::features::taint_analysis::ports::{EntryPointSeed, SymbolIndex, TaintPolicy};

/// High-level IFDS taint analysis service
pub struct IFDSTaintService {
    config: IFDSConfig,
    index: Arc<dyn SymbolIndex>,
    policy: Arc<dyn TaintPolicy>,
}

impl IFDSTaintService {
    /// Fails only on invalid configuration
    pub fn new(
        config: IFDSConfig,
        index: Arc<dyn SymbolIndex>,
        policy: Arc<dyn TaintPolicy>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            index,
            policy,
        })
    }

    pub fn config(&self) -> &IFDSConfig {
        &self.config
    }

    /// Run the analysis from `seeds`
    ///
    /// Never fails: skipped methods and edges are reported as warnings, and
    /// cancellation / budget exhaustion are reported through the outcome
    /// together with the partial result.
    pub fn analyze(&self, seeds: &[EntryPointSeed], token: &CancellationToken) -> TaintAnalysisReport {
        let warnings = Arc::new(WarningLog::new());
        let icfg = Arc::new(Icfg::new(self.index.clone(), warnings.clone()));
        let flow = TaintFlowFunctions::new(icfg.clone(), self.policy.clone(), &self.config);
        let solver = IFDSSolver::new(icfg.clone(), Box::new(flow), &self.config, warnings.clone());

        let result = solver.solve(seeds, token);
        let findings =
            TraceExtractor::new(&icfg, self.policy.as_ref(), &self.config).extract(&result);

        info!(
            outcome = ?result.outcome,
            findings = findings.len(),
            warnings = warnings.len(),
            "Taint analysis finished"
        );

        TaintAnalysisReport {
            outcome: result.outcome,
            findings,
            warnings: warnings.snapshot(),
            stats: result.statistics.clone(),
            result,
        }
    }

    /// Render findings as generic diagnostic records
    pub fn diagnostics(&self, report: &TaintAnalysisReport) -> Vec<Diagnostic> {
        let template = DiagnosticTemplate {
            id: self.config.diagnostic_id.clone(),
            title: self.config.diagnostic_title.clone(),
            help_link: self.config.help_link.clone(),
        };
        report
            .findings
            .iter()
            .map(|finding| finding.to_diagnostic(&template, |symbol| self.index.display_name(symbol)))
            .collect()
    }
}

/// Everything one run produced
#[derive(Debug, Clone)]
pub struct TaintAnalysisReport {
    pub outcome: SolveOutcome,
    pub findings: Vec<TaintFinding>,
    pub warnings: Vec<AnalysisWarning>,
    pub stats: IFDSStatistics,
    pub result: IFDSAnalysisResult,
}

impl TaintAnalysisReport {
    pub fn is_complete(&self) -> bool {
        self.outcome.is_complete()
    }

    /// Serializable view without the raw solver maps
    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            outcome: self.outcome,
            findings: self.findings.clone(),
            warnings: self.warnings.clone(),
            stats: self.stats.clone(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.summary())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub outcome: SolveOutcome,
    pub findings: Vec<TaintFinding>,
    pub warnings: Vec<AnalysisWarning>,
    pub stats: IFDSStatistics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::TaintError;
    use crate::features::taint_analysis::infrastructure::{InMemorySymbolIndex, StaticTaintPolicy};

    #[test]
    fn test_invalid_config_rejected() {
        let err = IFDSTaintService::new(
            IFDSConfig::default().max_access_path_length(99),
            Arc::new(InMemorySymbolIndex::new()),
            Arc::new(StaticTaintPolicy::new()),
        )
        .err()
        .unwrap();
        assert!(matches!(err, TaintError::Config(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_empty_seed_set_completes_without_findings() {
        let service = IFDSTaintService::new(
            IFDSConfig::default().worker_threads(1),
            Arc::new(InMemorySymbolIndex::new()),
            Arc::new(StaticTaintPolicy::new()),
        )
        .unwrap();

        let report = service.analyze(&[], &CancellationToken::new());
        assert!(report.is_complete());
        assert!(report.findings.is_empty());
        assert_eq!(report.stats.num_path_edges, 0);

        let json = report.to_json().unwrap();
        assert!(json.contains("\"outcome\": \"Completed\""));
    }
}
