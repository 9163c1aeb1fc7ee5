//! IFDS solver configuration
//!
//! Every knob the engine reads lives here: worklist budget, worker pool size,
//! access-path k-limiting, flow-function options, trace shape and the fields
//! copied into generic diagnostic records.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, ConfigResult};
use super::preset::Preset;

/// How a finding's trace is assembled from path edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceMode {
    /// Only the states where the tracked fact changes (seed, each rebase)
    Transitions,
    /// Every exploded-graph state on the chosen predecessor chain
    Full,
}

impl Default for TraceMode {
    fn default() -> Self {
        Self::Transitions
    }
}

/// IFDS taint analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IFDSConfig {
    /// Maximum processed path edges before the run stops (1..=10_000_000)
    pub max_iterations: usize,

    /// Worker threads draining the worklist (0 = one per core, else 1..=256)
    pub worker_threads: usize,

    /// k-limit on access-path field chains (0..=16)
    pub max_access_path_length: usize,

    /// Assignments kill facts rooted at their target (precision extension, off by default)
    pub strong_updates: bool,

    /// A value applies to a fact only when their field chains overlap,
    /// instead of whenever their bases match
    pub field_sensitive_matching: bool,

    /// Argument taint flows to the result of calls without an analyzable body
    pub opaque_calls_propagate: bool,

    /// Trace assembly mode
    pub trace_mode: TraceMode,

    /// Maximum states kept in one trace (1..=10_000)
    pub max_trace_length: usize,

    /// Diagnostic rule id
    pub diagnostic_id: String,

    /// Diagnostic title
    pub diagnostic_title: String,

    /// Optional help link attached to diagnostics
    pub help_link: Option<String>,
}

impl IFDSConfig {
    /// Create configuration from a preset
    pub fn from_preset(preset: Preset) -> Self {
        let base = Self {
            max_iterations: 1_000_000,
            worker_threads: 0,
            max_access_path_length: 3,
            strong_updates: false,
            field_sensitive_matching: false,
            opaque_calls_propagate: true,
            trace_mode: TraceMode::Transitions,
            max_trace_length: 256,
            diagnostic_id: "TAINT001".to_string(),
            diagnostic_title: "Untrusted data reaches a sensitive operation".to_string(),
            help_link: None,
        };

        match preset {
            Preset::Fast => Self {
                max_iterations: 100_000,
                max_access_path_length: 2,
                max_trace_length: 64,
                ..base
            },
            Preset::Balanced | Preset::Custom => base,
            Preset::Thorough => Self {
                max_iterations: 10_000_000,
                max_access_path_length: 5,
                strong_updates: true,
                field_sensitive_matching: true,
                trace_mode: TraceMode::Full,
                max_trace_length: 4096,
                ..base
            },
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_iterations == 0 || self.max_iterations > 10_000_000 {
            return Err(ConfigError::range_with_hint(
                "max_iterations",
                self.max_iterations,
                1,
                10_000_000,
                "The worklist budget must be finite and non-zero",
            ));
        }

        if self.worker_threads > 256 {
            return Err(ConfigError::range_with_hint(
                "worker_threads",
                self.worker_threads,
                0,
                256,
                "Use 0 for one worker per core",
            ));
        }

        if self.max_access_path_length > 16 {
            return Err(ConfigError::range_with_hint(
                "max_access_path_length",
                self.max_access_path_length,
                0,
                16,
                "Field chains are k-limited; long chains explode the fact domain",
            ));
        }

        if self.max_trace_length == 0 || self.max_trace_length > 10_000 {
            return Err(ConfigError::range_with_hint(
                "max_trace_length",
                self.max_trace_length,
                1,
                10_000,
                "A trace needs at least the sink state",
            ));
        }

        if self.diagnostic_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "diagnostic_id must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Worker count after resolving `0` to the number of cores
    pub fn effective_worker_threads(&self) -> usize {
        if self.worker_threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.worker_threads
        }
    }

    /// Builder: Set max_iterations
    pub fn max_iterations(mut self, v: usize) -> Self {
        self.max_iterations = v;
        self
    }

    /// Builder: Set worker_threads
    pub fn worker_threads(mut self, v: usize) -> Self {
        self.worker_threads = v;
        self
    }

    /// Builder: Set max_access_path_length
    pub fn max_access_path_length(mut self, v: usize) -> Self {
        self.max_access_path_length = v;
        self
    }

    /// Builder: Set strong_updates
    pub fn strong_updates(mut self, v: bool) -> Self {
        self.strong_updates = v;
        self
    }

    /// Builder: Set field_sensitive_matching
    pub fn field_sensitive_matching(mut self, v: bool) -> Self {
        self.field_sensitive_matching = v;
        self
    }

    /// Builder: Set opaque_calls_propagate
    pub fn opaque_calls_propagate(mut self, v: bool) -> Self {
        self.opaque_calls_propagate = v;
        self
    }

    /// Builder: Set trace_mode
    pub fn trace_mode(mut self, v: TraceMode) -> Self {
        self.trace_mode = v;
        self
    }

    /// Builder: Set max_trace_length
    pub fn max_trace_length(mut self, v: usize) -> Self {
        self.max_trace_length = v;
        self
    }

    /// Builder: Set help_link
    pub fn help_link(mut self, v: impl Into<String>) -> Self {
        self.help_link = Some(v.into());
        self
    }

    /// Parse a `version: 1` YAML document and validate the result
    pub fn from_yaml_str(yaml: &str) -> ConfigResult<Self> {
        let doc: IFDSConfigDocumentV1 = serde_yaml::from_str(yaml)?;

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

        let preset = match doc.preset {
            Some(name) => Preset::from_str(&name).map_err(|_| ConfigError::UnknownPreset(name))?,
            None => Preset::default(),
        };

        let mut config = Self::from_preset(preset);
        if let Some(patch) = doc.ifds {
            patch.apply(&mut config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Read and parse a YAML configuration file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Export as pretty JSON (for provenance in reports)
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl Default for IFDSConfig {
    fn default() -> Self {
        Self::from_preset(Preset::Balanced)
    }
}

/// YAML document, schema v1
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct IFDSConfigDocumentV1 {
    version: Option<u32>,
    preset: Option<String>,
    ifds: Option<IFDSConfigPatch>,
}

/// Partial override applied on top of a preset
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct IFDSConfigPatch {
    max_iterations: Option<usize>,
    worker_threads: Option<usize>,
    max_access_path_length: Option<usize>,
    strong_updates: Option<bool>,
    field_sensitive_matching: Option<bool>,
    opaque_calls_propagate: Option<bool>,
    trace_mode: Option<TraceMode>,
    max_trace_length: Option<usize>,
    diagnostic_id: Option<String>,
    diagnostic_title: Option<String>,
    help_link: Option<String>,
}

impl IFDSConfigPatch {
    fn apply(self, config: &mut IFDSConfig) {
        if let Some(v) = self.max_iterations {
            config.max_iterations = v;
        }
        if let Some(v) = self.worker_threads {
            config.worker_threads = v;
        }
        if let Some(v) = self.max_access_path_length {
            config.max_access_path_length = v;
        }
        if let Some(v) = self.strong_updates {
            config.strong_updates = v;
        }
        if let Some(v) = self.field_sensitive_matching {
            config.field_sensitive_matching = v;
        }
        if let Some(v) = self.opaque_calls_propagate {
            config.opaque_calls_propagate = v;
        }
        if let Some(v) = self.trace_mode {
            config.trace_mode = v;
        }
        if let Some(v) = self.max_trace_length {
            config.max_trace_length = v;
        }
        if let Some(v) = self.diagnostic_id {
            config.diagnostic_id = v;
        }
        if let Some(v) = self.diagnostic_title {
            config.diagnostic_title = v;
        }
        if self.help_link.is_some() {
            config.help_link = self.help_link;
        }
    }
}
