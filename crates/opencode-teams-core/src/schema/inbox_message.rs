//! Inbox message schema (spec §3, §4.4).
//!
//! An inbox is an ordered sequence of these scoped to one recipient agent
//! within one team; `id` is a UUID so retrying clients can deduplicate.

use serde::{Deserialize, Serialize};

use super::color::AgentColor;

/// The kind of inbox entry, driving how a client should act on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Message,
    Broadcast,
    ShutdownRequest,
    ShutdownApproved,
    PlanApproved,
    PlanRejected,
}

/// One entry in an agent's inbox file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxMessage {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub color: AgentColor,
    pub timestamp_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at_ms: Option<u64>,
}

impl InboxMessage {
    /// Whether this entry has not yet been delivered via a read-marking call.
    pub fn is_unread(&self) -> bool {
        self.read_at_ms.is_none()
    }
}
