//! Canonical root-directory resolution.
//!
//! Provides a single source of truth for where the server keeps its on-disk
//! state, matching spec §4.1's default of `<user-home>/.opencode-teams/` and
//! §6.4's root-directory environment override.
//!
//! # Precedence
//!
//! 1. `OPENCODE_TEAMS_ROOT` environment variable (if set and non-empty)
//! 2. `<dirs::home_dir()>/.opencode-teams`
//!
//! Integration tests MUST use `OPENCODE_TEAMS_ROOT` to sandbox state, the
//! same way the reference CLI this crate descends from uses `ATM_HOME`.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Name of the environment variable that overrides the state root.
pub const ROOT_ENV_VAR: &str = "OPENCODE_TEAMS_ROOT";

/// Resolve the root directory under which `teams/` and `tasks/` live.
///
/// # Errors
///
/// Returns an error if `OPENCODE_TEAMS_ROOT` is unset and the platform home
/// directory cannot be determined.
pub fn resolve_root() -> Result<PathBuf> {
    if let Ok(root) = std::env::var(ROOT_ENV_VAR) {
        let trimmed = root.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".opencode-teams"))
}
