//! Per-agent inbox: append, read, and long-poll delivery (spec §4.4).

use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::error::{CoordError, Result};
use crate::schema::{AgentColor, InboxMessage, MessageType, Team};
use crate::store::{self, Store};
use crate::team_registry;

const POLL_STEP: Duration = Duration::from_millis(500);
const POLL_MAX_MS: u64 = 30_000;

fn read_inbox_file(store: &Store, team: &str, agent: &str) -> Result<Vec<InboxMessage>> {
    let path = store.inbox_path(team, agent);
    if !store::exists(&path) {
        return Err(CoordError::not_found(format!("agent '{agent}' not found in team '{team}'")));
    }
    store::read_json(&path).map_err(CoordError::from)
}

fn is_member(team: &Team, agent: &str) -> bool {
    team.find_member(agent).is_some()
}

/// Build a new message ready to append; callers supply `team` so the
/// message's color matches the sender's assigned palette slot.
pub fn build_message(
    from: &str,
    to: &str,
    message_type: MessageType,
    content: impl Into<String>,
    summary: Option<String>,
    color: AgentColor,
    now_ms: u64,
) -> InboxMessage {
    InboxMessage {
        id: Uuid::new_v4().to_string(),
        from: from.to_string(),
        to: to.to_string(),
        message_type,
        content: content.into(),
        summary,
        color,
        timestamp_ms: now_ms,
        read_at_ms: None,
    }
}

/// Append `message` to `recipient`'s inbox under the team inbox lock.
/// Fails `ErrNotFound` if `recipient` is not a current team member.
pub fn append(store: &Store, team_name: &str, recipient: &str, message: InboxMessage) -> Result<()> {
    let _guard = store::acquire_lock(&store.inboxes_lock_path(team_name))?;

    let team = team_registry::read_team(store, team_name)?;
    if !is_member(&team, recipient) {
        return Err(CoordError::not_found(format!(
            "agent '{recipient}' not found in team '{team_name}'"
        )));
    }

    let path = store.inbox_path(team_name, recipient);
    let mut messages: Vec<InboxMessage> = if store::exists(&path) {
        store::read_json(&path)?
    } else {
        Vec::new()
    };
    messages.push(message);
    store::write_json(&path, &messages)?;
    Ok(())
}

/// Return `agent`'s messages. When `mark_as_read` is true this runs under
/// the inbox lock and persists `read_at_ms` on every returned message;
/// otherwise it is an unlocked best-effort snapshot (spec §9 open question).
pub fn read(store: &Store, team_name: &str, agent: &str, mark_as_read: bool, now_ms: u64) -> Result<Vec<InboxMessage>> {
    if !mark_as_read {
        return read_inbox_file(store, team_name, agent);
    }

    let _guard = store::acquire_lock(&store.inboxes_lock_path(team_name))?;
    let mut messages = read_inbox_file(store, team_name, agent)?;
    let mut changed = false;
    for message in messages.iter_mut() {
        if message.read_at_ms.is_none() {
            message.read_at_ms = Some(now_ms);
            changed = true;
        }
    }
    if changed {
        store::write_json(&store.inbox_path(team_name, agent), &messages)?;
    }
    Ok(messages)
}

fn unread_count(store: &Store, team_name: &str, agent: &str) -> Result<usize> {
    let messages = read_inbox_file(store, team_name, agent)?;
    Ok(messages.iter().filter(|m| m.is_unread()).count())
}

/// Clamp a caller-supplied poll timeout to the 30s bound (spec §4.4).
pub fn clamp_timeout_ms(timeout_ms: u64) -> u64 {
    timeout_ms.min(POLL_MAX_MS)
}

/// Block until `agent` has at least one unread message or `timeout_ms`
/// elapses (clamped to 30s), polling every 500ms. Returns the empty list on
/// timeout; returns immediately if a message is already pending.
pub fn poll(store: &Store, team_name: &str, agent: &str, timeout_ms: u64, now_ms: u64) -> Result<Vec<InboxMessage>> {
    let timeout_ms = clamp_timeout_ms(timeout_ms);
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);

    loop {
        if unread_count(store, team_name, agent)? > 0 {
            return read(store, team_name, agent, true, now_ms);
        }
        if Instant::now() >= deadline {
            return Ok(Vec::new());
        }
        std::thread::sleep(POLL_STEP.min(deadline.saturating_duration_since(Instant::now())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team_registry::create_team;
    use tempfile::TempDir;

    fn store_with_team() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        create_team(&store, "demo", "lead", "m", "s", 1).unwrap();
        (dir, store)
    }

    #[test]
    fn append_rejects_unknown_recipient() {
        let (_dir, store) = store_with_team();
        let msg = build_message("lead", "ghost", MessageType::Message, "hi", None, AgentColor::Red, 1);
        let err = append(&store, "demo", "ghost", msg).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrKind::NotFound);
    }

    #[test]
    fn append_then_read_marks_read_at() {
        let (_dir, store) = store_with_team();
        let msg = build_message("lead", "lead", MessageType::Message, "hi", None, AgentColor::Red, 1);
        append(&store, "demo", "lead", msg).unwrap();

        let unread = read(&store, "demo", "lead", false, 2).unwrap();
        assert_eq!(unread.len(), 1);
        assert!(unread[0].read_at_ms.is_none());

        let read_now = read(&store, "demo", "lead", true, 3).unwrap();
        assert_eq!(read_now[0].read_at_ms, Some(3));
    }

    #[test]
    fn poll_returns_immediately_when_unread_exists() {
        let (_dir, store) = store_with_team();
        let msg = build_message("lead", "lead", MessageType::Message, "hi", None, AgentColor::Red, 1);
        append(&store, "demo", "lead", msg).unwrap();

        let start = Instant::now();
        let messages = poll(&store, "demo", "lead", 5_000, 2).unwrap();
        assert_eq!(messages.len(), 1);
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[test]
    fn poll_times_out_with_empty_list() {
        let (_dir, store) = store_with_team();
        let messages = poll(&store, "demo", "lead", 600, 2).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn poll_clamps_timeout_above_30s() {
        assert_eq!(clamp_timeout_ms(60_000), POLL_MAX_MS);
        assert_eq!(clamp_timeout_ms(1_000), 1_000);
    }
}
