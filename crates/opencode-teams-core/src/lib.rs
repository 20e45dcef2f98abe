//! Core types and on-disk state machine for the opencode-teams coordination
//! server.
//!
//! This crate owns every file under `<root>/teams/<team>/` and
//! `<root>/tasks/<team>/`: the value model (schema), atomic/locked file I/O
//! (store), and the three domain services built on top of it (team registry,
//! task engine, inbox). Nothing here spawns a process or talks to a terminal
//! multiplexer — that is `opencode-teams-spawner`.

pub mod config;
pub mod error;
pub mod health_state;
pub mod home;
pub mod inbox;
pub mod logging;
pub mod schema;
pub mod store;
pub mod task_engine;
pub mod team_registry;
pub mod text;
pub mod time;

pub use error::StoreError;
pub use schema::{
    AgentColor, HealthProbeState, HealthStatus, InboxMessage, Member, MessageType, Task,
    TaskStatus, Team,
};
