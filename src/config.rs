//! Configuration handling for ngrename.
//!
//! Settings live in `.ngrename.toml` at the workspace root:
//!
//! ```toml
//! [naming]
//! file_name_style = "kebab"      # kebab | pascal | camel | snake
//! require_kind_suffix = true
//!
//! [search]
//! comments_and_text = true
//! literal_policy = "reference_bearing"   # reference_bearing | exact_match | any
//!
//! [workspace]
//! exclude = ["src/generated/**"]
//! ```
//!
//! Every key is optional.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use ngrename_angular::{LiteralPolicy, NamingPolicy, RenameOptions};
use ngrename_core::workspace::WorkspaceOptions;

/// File name looked up at the workspace root.
pub const CONFIG_FILE_NAME: &str = ".ngrename.toml";

/// Errors from reading or parsing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse config file {path}: {message}")]
    Parse { path: String, message: String },
}

/// ngrename configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub naming: NamingPolicy,
    pub search: SearchConfig,
    pub workspace: WorkspaceConfig,
}

/// Text search defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Also rewrite occurrences in comments and string literals
    pub comments_and_text: bool,
    pub literal_policy: LiteralPolicy,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            comments_and_text: true,
            literal_policy: LiteralPolicy::default(),
        }
    }
}

/// Workspace discovery settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WorkspaceConfig {
    /// Globs matched against workspace-relative paths
    pub exclude: Vec<String>,
}

impl Config {
    /// Parse configuration text; `origin` names the source in errors.
    pub fn from_toml(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            message: e.message().to_string(),
        })
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content, &path.display().to_string())?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Load `explicit` if given, else `.ngrename.toml` in `workspace`, else defaults.
    pub fn discover(workspace: &Path, explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let path = Self::default_path(workspace);
                if path.is_file() {
                    Self::load(&path)
                } else {
                    Ok(Config::default())
                }
            }
        }
    }

    pub fn default_path(workspace: &Path) -> PathBuf {
        workspace.join(CONFIG_FILE_NAME)
    }

    /// Rename options with `search` overriding the configured text-search flag.
    pub fn rename_options(&self, search: Option<bool>) -> RenameOptions {
        RenameOptions::default()
            .with_search(search.unwrap_or(self.search.comments_and_text))
            .with_literal_policy(self.search.literal_policy)
    }

    pub fn workspace_options(&self) -> WorkspaceOptions {
        WorkspaceOptions {
            exclude: self.workspace.exclude.clone(),
            ..WorkspaceOptions::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
