//! Report configuration
//!
//! Loaded from TOML (`desglose.toml` by default) and overridden by CLI flags.
//! Every field has a default, so a partial file is valid:
//!
//! ```toml
//! default_sort = "excl_wt"
//! length = 50
//! runs_dir = "/var/tmp/xhprof"
//! namespace = "shop"
//! ```

use crate::error::ConfigError;
use crate::metrics::WALL_TIME;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "desglose.toml";

/// Upper bound for rendered decimal places
const MAX_PRECISION: usize = 10;

/// Defaults applied to every report request
///
/// # Example
/// ```
/// use desglose::config::ReportConfig;
///
/// let config = ReportConfig::default();
/// assert_eq!(config.default_sort, "wt");
/// assert_eq!(config.length, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Sort key when the caller does not pass one
    pub default_sort: String,

    /// Sort key used when the requested one is unavailable for a run
    pub fallback_sort: String,

    /// Number of rows to keep; `-1` keeps every row
    ///
    /// Default: 100 (top 100 functions)
    pub length: i64,

    /// Directory holding raw run files
    pub runs_dir: Option<PathBuf>,

    /// Run file namespace (`<run_id>.<namespace>.xhprof`)
    pub namespace: Option<String>,

    /// Decimal places for rendered fractional values and percentages
    pub percent_precision: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_sort: WALL_TIME.to_string(),
            fallback_sort: WALL_TIME.to_string(),
            length: 100,
            runs_dir: None,
            namespace: None,
            percent_precision: 1,
        }
    }
}

impl ReportConfig {
    /// Keep every row instead of the top 100
    pub fn unlimited() -> Self {
        Self {
            length: -1,
            ..Self::default()
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, else `desglose.toml` when it exists, else defaults
    pub fn discover(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_sort.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "default_sort must not be empty".to_string(),
            ));
        }

        if self.fallback_sort.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "fallback_sort must not be empty".to_string(),
            ));
        }

        if self.length < -1 {
            return Err(ConfigError::Invalid(format!(
                "length must be -1 (all rows) or >= 0, got {}",
                self.length
            )));
        }

        if self.percent_precision > MAX_PRECISION {
            return Err(ConfigError::Invalid(format!(
                "percent_precision must be <= {}, got {}",
                MAX_PRECISION, self.percent_precision
            )));
        }

        if let Some(namespace) = &self.namespace {
            if namespace.is_empty() || namespace.contains(['/', '\\']) {
                return Err(ConfigError::Invalid(format!(
                    "namespace must be non-empty and contain no path separators, got {:?}",
                    namespace
                )));
            }
        }

        Ok(())
    }
}
