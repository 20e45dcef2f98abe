//! Value model for the coordination server.
//!
//! Every type here is a plain serde-mapped value: construction validates the
//! field-level invariants from the data model, but nothing in this module
//! touches disk. Unknown JSON fields are preserved on deserialization so that
//! a newer writer's files stay readable by an older one.

mod color;
mod health;
mod inbox_message;
mod member;
mod task;
mod team;

pub use color::AgentColor;
pub use health::{HealthProbeState, HealthStatus};
pub use inbox_message::{InboxMessage, MessageType};
pub use member::{Backend, Member};
pub use task::{Task, TaskStatus};
pub use team::{Team, is_valid_team_name};
