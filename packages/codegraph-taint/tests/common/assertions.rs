//! Assertion helpers over analysis reports

use codegraph_taint::features::taint_analysis::{
    Fact, NodeKind, Symbol, TaintAnalysisReport, TaintFinding, WarningKind,
};

/// Exactly one finding; returns it
pub fn single_finding(report: &TaintAnalysisReport) -> &TaintFinding {
    assert_eq!(
        report.findings.len(),
        1,
        "expected exactly one finding, got {:#?}",
        report.findings
    );
    &report.findings[0]
}

pub fn assert_no_findings(report: &TaintAnalysisReport) {
    assert!(
        report.findings.is_empty(),
        "expected no findings, got {:#?}",
        report.findings
    );
}

pub fn assert_warning(report: &TaintAnalysisReport, kind: WarningKind, method: Symbol) {
    assert!(
        report
            .warnings
            .iter()
            .any(|warning| warning.kind == kind && warning.method == Some(method)),
        "expected {:?} for {}, got {:#?}",
        kind,
        method,
        report.warnings
    );
}

/// (method, kind, fact) of every trace step
pub fn trace_shape(finding: &TaintFinding) -> Vec<(Symbol, NodeKind, Fact)> {
    finding
        .trace
        .iter()
        .map(|step| (step.node.method, step.node.kind, step.fact.clone()))
        .collect()
}
