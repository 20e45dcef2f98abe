//! Environment-driven configuration (spec §6.4).
//!
//! Unrecognized environment variables are ignored; recognized ones are read
//! once at `Config::resolve()` time rather than re-read ad hoc by callers.

use crate::home;
use crate::schema::Backend;
use std::path::PathBuf;

/// Resolved server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory holding `teams/` and `tasks/`.
    pub root: PathBuf,
    /// Default spawn backend.
    pub backend: Backend,
    /// Split tmux windows instead of panes.
    pub use_tmux_windows: bool,
    /// Explicit desktop-binary path override, if set.
    pub desktop_binary_override: Option<PathBuf>,
}

impl Config {
    /// Resolve configuration from environment variables, falling back to
    /// defaults for anything unset or unrecognized.
    pub fn resolve() -> anyhow::Result<Self> {
        let root = home::resolve_root()?;

        let backend = std::env::var("OPENCODE_TEAMS_BACKEND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();

        let use_tmux_windows = std::env::var("USE_TMUX_WINDOWS")
            .ok()
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let desktop_binary_override = std::env::var("OPENCODE_TEAMS_DESKTOP_BIN")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            root,
            backend,
            use_tmux_windows,
            desktop_binary_override,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_parses_known_values() {
        assert_eq!("terminal".parse::<Backend>().unwrap(), Backend::Terminal);
        assert_eq!("Desktop".parse::<Backend>().unwrap(), Backend::Desktop);
    }

    #[test]
    fn backend_rejects_unknown_values() {
        assert!("gui".parse::<Backend>().is_err());
    }

    #[test]
    fn backend_default_is_terminal() {
        assert_eq!(Backend::default(), Backend::Terminal);
    }
}
