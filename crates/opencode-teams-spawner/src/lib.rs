//! Process lifecycle for teammates: identity-file generation, backend
//! launch/kill, and health probing (spec §4.5).
//!
//! Nothing here touches the team config or task files directly — callers in
//! `opencode-teams-server` pair this crate's operations with
//! `opencode-teams-core::team_registry`/`inbox` calls under the appropriate
//! lock, per spec §4.5's "roll back on failure" contract.

pub mod desktop;
pub mod health;
pub mod identity;
pub mod terminal;

pub mod spawner;

pub use health::{ProbeResult, probe_desktop, probe_terminal};
pub use identity::{Role, generate_identity_file};
pub use spawner::{SpawnError, SpawnRequest, kill_teammate, spawn_teammate};
pub use terminal::TerminalError;
