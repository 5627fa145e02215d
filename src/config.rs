//! Compilation limits.
//!
//! The defaults are the guards every caller gets from [`crate::compile_filter`].
//! A TOML file can tighten or relax them:
//!
//! ```toml
//! max_nesting_depth = 6
//! max_operators = 50
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{SqlError, SqlResult};

pub const MAX_NESTING_DEPTH: usize = 10;
pub const MAX_OPERATORS: usize = 100;
/// SQLite's default `SQLITE_MAX_VARIABLE_NUMBER` on older builds.
pub const MAX_IN_ITEMS: usize = 999;
pub const MAX_QUERY_LENGTH: usize = 100_000;

/// Resource limits applied while compiling and assembling.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Deepest filter object allowed; the root is depth 1.
    pub max_nesting_depth: usize,

    /// Most `and`/`or`/comparison operators one filter may use.
    pub max_operators: usize,

    /// Most items in an `in`/`nin` list.
    pub max_in_items: usize,

    /// Longest SQL text, in bytes, a built query may have.
    pub max_query_length: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_nesting_depth: MAX_NESTING_DEPTH,
            max_operators: MAX_OPERATORS,
            max_in_items: MAX_IN_ITEMS,
            max_query_length: MAX_QUERY_LENGTH,
        }
    }
}

impl Limits {
    /// Create a new limits builder
    pub fn builder() -> LimitsBuilder {
        LimitsBuilder::default()
    }

    /// Parse limits from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> SqlResult<Self> {
        toml::from_str(text).map_err(|e| SqlError::Config(e.to_string()))
    }

    /// Load limits from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> SqlResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// `<config dir>/safesql/config.toml`, if a config dir exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("safesql").join("config.toml"))
    }

    /// Load from [`Limits::default_path`], or fall back to defaults when no
    /// file is there.
    pub fn discover() -> SqlResult<Self> {
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(path),
            _ => Ok(Self::default()),
        }
    }
}

/// Builder for Limits
#[derive(Debug, Default)]
pub struct LimitsBuilder {
    limits: Limits,
}

impl LimitsBuilder {
    pub fn max_nesting_depth(mut self, depth: usize) -> Self {
        self.limits.max_nesting_depth = depth;
        self
    }

    pub fn max_operators(mut self, count: usize) -> Self {
        self.limits.max_operators = count;
        self
    }

    pub fn max_in_items(mut self, count: usize) -> Self {
        self.limits.max_in_items = count;
        self
    }

    pub fn max_query_length(mut self, len: usize) -> Self {
        self.limits.max_query_length = len;
        self
    }

    /// Build the limits
    pub fn build(self) -> Limits {
        self.limits
    }
}
