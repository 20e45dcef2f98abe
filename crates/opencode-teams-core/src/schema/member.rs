//! Member schema: the lead/teammate tagged union (spec §3, §9 "Tagged
//! member variants").
//!
//! The lead/teammate distinction is a tagged sum, not inheritance: readers
//! discriminate on `role`, writers never instantiate a shared base struct
//! with optional lead-only or teammate-only fields.

use super::color::AgentColor;
use serde::{Deserialize, Serialize};

/// Spawn mechanism for a teammate process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Terminal,
    Desktop,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::Terminal
    }
}

impl std::str::FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "terminal" => Ok(Backend::Terminal),
            "desktop" => Ok(Backend::Desktop),
            other => Err(format!("unknown backend '{other}', expected terminal or desktop")),
        }
    }
}

/// A team member: either the one lead or a spawned teammate.
///
/// `agent_id` is `"<member-name>@<team-name>"`, unique within a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Member {
    Lead {
        agent_id: String,
        name: String,
        color: AgentColor,
        joined_at_ms: u64,
        session_id: String,
    },
    Teammate {
        agent_id: String,
        name: String,
        model: String,
        prompt: String,
        color: AgentColor,
        plan_mode_required: bool,
        joined_at_ms: u64,
        backend: Backend,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pane_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        process_id: Option<u32>,
        cwd: String,
        subagent_type: String,
    },
}

impl Member {
    pub fn agent_id(&self) -> &str {
        match self {
            Member::Lead { agent_id, .. } => agent_id,
            Member::Teammate { agent_id, .. } => agent_id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Member::Lead { name, .. } => name,
            Member::Teammate { name, .. } => name,
        }
    }

    pub fn color(&self) -> AgentColor {
        match self {
            Member::Lead { color, .. } => *color,
            Member::Teammate { color, .. } => *color,
        }
    }

    pub fn is_lead(&self) -> bool {
        matches!(self, Member::Lead { .. })
    }

    /// Build the `"<name>@<team>"` agent id used as the primary key.
    pub fn make_agent_id(name: &str, team_name: &str) -> String {
        format!("{name}@{team_name}")
    }
}
