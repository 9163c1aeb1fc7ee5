//! Source / sink / sanitizer oracle

use std::sync::Arc;

use crate::features::taint_analysis::domain::{Severity, Symbol};

/// Policy oracle consulted by the flow functions and the extractor
///
/// Methods the policy does not classify are transparent: taint passes
/// through them unchanged.
pub trait TaintPolicy: Send + Sync {
    /// Return value of `method` is untrusted
    fn is_source(&self, method: Symbol) -> bool;

    /// Arguments of `method` must not be untrusted
    fn is_sink(&self, method: Symbol) -> bool;

    /// Return value of `method` is clean whatever its arguments
    fn is_sanitizer(&self, method: Symbol) -> bool;

    /// Argument indices checked for a sink; `None` means all of them
    fn sink_arguments(&self, _sink: Symbol) -> Option<Vec<usize>> {
        None
    }

    fn sink_severity(&self, _sink: Symbol) -> Severity {
        Severity::High
    }
}

impl<T: TaintPolicy + ?Sized> TaintPolicy for Arc<T> {
    fn is_source(&self, method: Symbol) -> bool {
        (**self).is_source(method)
    }

    fn is_sink(&self, method: Symbol) -> bool {
        (**self).is_sink(method)
    }

    fn is_sanitizer(&self, method: Symbol) -> bool {
        (**self).is_sanitizer(method)
    }

    fn sink_arguments(&self, sink: Symbol) -> Option<Vec<usize>> {
        (**self).sink_arguments(sink)
    }

    fn sink_severity(&self, sink: Symbol) -> Severity {
        (**self).sink_severity(sink)
    }
}
