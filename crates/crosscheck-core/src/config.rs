use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{EngineError, ErrorCode};

/// Engine tuning knobs, loaded from `crosscheck.toml`.
///
/// Every field has a default so a missing or partial file is fine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of active testing obligations per team.
    #[serde(default = "default_load_cap")]
    pub load_cap: u32,
    /// Prefer testing teams from a different subgroup than the project's.
    /// Soft preference: it relaxes before the selector ever fails.
    #[serde(default = "default_true")]
    pub prefer_subgroup_diversity: bool,
}

/// Number of testing teams the engine aims to attach to each project.
pub const TEAMS_PER_PROJECT: usize = 2;

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            load_cap: default_load_cap(),
            prefer_subgroup_diversity: default_true(),
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file; a missing file yields the defaults.
    ///
    /// # Errors
    ///
    /// [`ErrorCode::ConfigParseError`] if the file exists but is not valid
    /// TOML for this shape; a storage error if it cannot be read.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        toml::from_str(&raw).map_err(|e| {
            EngineError::validation(
                ErrorCode::ConfigParseError,
                format!("{}: {e}", path.display()),
            )
        })
    }
}

const fn default_load_cap() -> u32 {
    2
}

const fn default_true() -> bool {
    true
}
