//! IFDS Configuration System
//!
//! Two tiers, following the pipeline config of the codegraph engine:
//! - Level 1: Preset - one-liner (`IFDSConfig::from_preset(Preset::Fast)`)
//! - Level 2: Builder overrides / YAML (`version: 1` documents)
//!
//! # Examples
//!
//! ```rust,ignore
//! use codegraph_taint::config::{IFDSConfig, Preset};
//!
//! let config = IFDSConfig::from_preset(Preset::Balanced)
//!     .worker_threads(4)
//!     .max_access_path_length(3);
//! config.validate()?;
//!
//! let config = IFDSConfig::from_yaml_file("team-security.yaml")?;
//! ```

pub mod error;
pub mod ifds_config;
pub mod preset;

// Re-exports
pub use error::{ConfigError, ConfigResult};
pub use ifds_config::{IFDSConfig, TraceMode};
pub use preset::Preset;
