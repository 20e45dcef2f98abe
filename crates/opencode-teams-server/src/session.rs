//! One-team-per-session binding (spec §4.6, §9 "Global session state").
//!
//! The binding is a single value owned by the session instance; there is no
//! ambient/process-wide mutable state beyond it.

use std::path::PathBuf;

use opencode_teams_core::config::Config;
use opencode_teams_core::error::{CoordError, Result};
use opencode_teams_core::store::Store;

/// Per-process resolved state: the on-disk store, the spawn-time defaults
/// pulled from the environment, and the team this session is bound to (if
/// any).
pub struct Session {
    pub store: Store,
    pub config: Config,
    pub project_dir: PathBuf,
    pub agent_binary: String,
    team_name: Option<String>,
}

impl Session {
    pub fn new(config: Config, project_dir: PathBuf, agent_binary: String) -> Self {
        let store = Store::new(config.root.clone());
        Self {
            store,
            config,
            project_dir,
            agent_binary,
            team_name: None,
        }
    }

    pub fn bound_team(&self) -> Option<&str> {
        self.team_name.as_deref()
    }

    /// Bind this session to `team_name`. Fails `ErrBusy` if already bound.
    pub fn bind(&mut self, team_name: &str) -> Result<()> {
        if self.team_name.is_some() {
            return Err(CoordError::busy("session is already bound to a team"));
        }
        self.team_name = Some(team_name.to_string());
        Ok(())
    }

    pub fn unbind(&mut self) {
        self.team_name = None;
    }

    /// The team name, or `ErrNotFound` if this session has not called
    /// `team_create` yet.
    pub fn require_team(&self) -> Result<&str> {
        self.team_name
            .as_deref()
            .ok_or_else(|| CoordError::not_found("no team bound to this session"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(
            Config {
                root: PathBuf::from("/tmp/opencode-teams-test"),
                backend: opencode_teams_core::schema::Backend::Terminal,
                use_tmux_windows: false,
                desktop_binary_override: None,
            },
            PathBuf::from("/tmp/project"),
            "opencode-agent".to_string(),
        )
    }

    #[test]
    fn second_bind_fails_busy() {
        let mut session = session();
        session.bind("demo").unwrap();
        let err = session.bind("other").unwrap_err();
        assert_eq!(err.kind, opencode_teams_core::error::ErrKind::Busy);
    }

    #[test]
    fn require_team_fails_not_found_before_bind() {
        let session = session();
        let err = session.require_team().unwrap_err();
        assert_eq!(err.kind, opencode_teams_core::error::ErrKind::NotFound);
    }

    #[test]
    fn unbind_allows_rebinding() {
        let mut session = session();
        session.bind("demo").unwrap();
        session.unbind();
        session.bind("other").unwrap();
        assert_eq!(session.require_team().unwrap(), "other");
    }
}
