//! Task schema: the dependency-graph unit of work (spec §3, §4.3).

use serde::{Deserialize, Serialize};

/// Task lifecycle status.
///
/// Monotonic on `Pending < InProgress < Completed`; `Cancelled` is reachable
/// from any non-terminal state. See [`TaskStatus::can_advance_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Pending => 0,
            TaskStatus::InProgress => 1,
            TaskStatus::Completed => 2,
            TaskStatus::Cancelled => 3,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Cancelled)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// `Cancelled` is reachable from any non-terminal state; otherwise the
    /// order must strictly advance (no same-state no-op, no regression).
    pub fn can_advance_to(self, next: TaskStatus) -> bool {
        if next == TaskStatus::Cancelled {
            return !self.is_terminal();
        }
        next.rank() > self.rank()
    }
}

/// A unit of work tracked within one team's task graph.
///
/// `id` is monotonically increasing starting at 1, unique per team. `blocks`
/// and `blocked_by` are maintained bidirectionally by
/// [`crate::task_engine`] — this type itself enforces no invariant beyond
/// field shape, since enforcing the graph invariants requires looking at
/// sibling tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub subject: String,
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_by: Vec<u64>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_advances_in_order() {
        assert!(TaskStatus::Pending.can_advance_to(TaskStatus::InProgress));
        assert!(TaskStatus::InProgress.can_advance_to(TaskStatus::Completed));
        assert!(!TaskStatus::InProgress.can_advance_to(TaskStatus::Pending));
        assert!(!TaskStatus::Completed.can_advance_to(TaskStatus::InProgress));
    }

    #[test]
    fn pending_can_skip_straight_to_completed() {
        assert!(TaskStatus::Pending.can_advance_to(TaskStatus::Completed));
    }

    #[test]
    fn cancelled_reachable_from_any_nonterminal_state() {
        assert!(TaskStatus::Pending.can_advance_to(TaskStatus::Cancelled));
        assert!(TaskStatus::InProgress.can_advance_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Completed.can_advance_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Cancelled.can_advance_to(TaskStatus::Cancelled));
    }

    #[test]
    fn same_state_transition_rejected() {
        assert!(!TaskStatus::Pending.can_advance_to(TaskStatus::Pending));
    }

    #[test]
    fn task_roundtrips_and_omits_empty_optionals() {
        let task = Task {
            id: 1,
            subject: "map modules".to_string(),
            description: String::new(),
            status: TaskStatus::Pending,
            owner: None,
            blocks: vec![],
            blocked_by: vec![],
            created_at_ms: 1,
            updated_at_ms: 1,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert!(json.get("owner").is_none());
        assert!(json.get("blocks").is_none());
        assert!(json.get("blockedBy").is_none());

        let reparsed: Task = serde_json::from_value(json).unwrap();
        assert_eq!(reparsed.id, 1);
        assert!(reparsed.blocked_by.is_empty());
    }
}
