//! Context configuration via `recordfake.toml`
//!
//! A context opened on a directory reads `recordfake.toml` from it, writing
//! a commented default on first open. Contexts built in code take a
//! [`ContextConfig`] directly.

use recordfake_core::{Error, Limits, Result, DEFAULT_PAGE_SIZE, MAX_HIERARCHY_DEPTH};
use recordfake_engine::ExecutorOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name placed in the context directory.
pub const CONFIG_FILE_NAME: &str = "recordfake.toml";

/// Context configuration loaded from `recordfake.toml`.
///
/// # Example
///
/// ```toml
/// default_page_size = 5000
/// max_hierarchy_depth = 100
/// case_insensitive_strings = true
/// auto_version = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Page size for queries that declare none.
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,
    /// Parent-chain depth bound for hierarchy operators.
    #[serde(default = "default_hierarchy_depth")]
    pub max_hierarchy_depth: usize,
    /// Compare strings ignoring case.
    #[serde(default = "default_true")]
    pub case_insensitive_strings: bool,
    /// Stamp `versionnumber` on versioned record types.
    #[serde(default = "default_true")]
    pub auto_version: bool,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_hierarchy_depth() -> usize {
    MAX_HIERARCHY_DEPTH
}

fn default_true() -> bool {
    true
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_hierarchy_depth: default_hierarchy_depth(),
            case_insensitive_strings: true,
            auto_version: true,
        }
    }
}

impl ContextConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# recordfake context configuration
#
# Page size used when a query declares none (default: 5000)
default_page_size = 5000

# Parent-chain depth followed by above/under operators (default: 100)
max_hierarchy_depth = 100

# Compare strings ignoring case, like the emulated service (default: true)
case_insensitive_strings = true

# Stamp versionnumber on record types the schema marks as versioned (default: true)
auto_version = true
"#
    }

    /// Parse and validate TOML text.
    ///
    /// # Errors
    ///
    /// `Config` if the text does not parse or a limit is zero.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: ContextConfig = toml::from_str(content)
            .map_err(|e| Error::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// `Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| {
            Error::config(format!("Config file '{}': {}", path.display(), e))
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                Error::config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            Error::config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Engine limits
    pub fn limits(&self) -> Limits {
        Limits {
            default_page_size: self.default_page_size,
            max_hierarchy_depth: self.max_hierarchy_depth,
        }
    }

    /// Executor settings
    pub fn executor_options(&self) -> ExecutorOptions {
        ExecutorOptions {
            limits: self.limits(),
            case_insensitive_strings: self.case_insensitive_strings,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(Error::config("default_page_size must be at least 1"));
        }
        if self.max_hierarchy_depth == 0 {
            return Err(Error::config("max_hierarchy_depth must be at least 1"));
        }
        Ok(())
    }
}
