//! Team schema: the top-level coordination scope (spec §3).

use serde::{Deserialize, Serialize};

use super::member::Member;

/// A named coordination scope containing exactly one lead and zero or more
/// teammates. Existence of the config file on disk *is* the team's
/// existence — there is no separate "team exists" flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub name: String,
    pub created_at_ms: u64,
    pub session_id: String,
    pub lead_model: String,
    pub members: Vec<Member>,
}

impl Team {
    pub fn lead(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.is_lead())
    }

    pub fn find_member(&self, name: &str) -> Option<&Member> {
        self.members.iter().find(|m| m.name() == name)
    }

    pub fn teammate_count(&self) -> usize {
        self.members.iter().filter(|m| !m.is_lead()).count()
    }
}

/// Team name validation: spec §3, `[A-Za-z0-9_-]{1,64}`.
pub fn is_valid_team_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::super::color::AgentColor;
    use super::*;

    fn lead(name: &str) -> Member {
        Member::Lead {
            agent_id: format!("{name}@demo"),
            name: name.to_string(),
            color: AgentColor::Red,
            joined_at_ms: 1,
            session_id: "s".to_string(),
        }
    }

    #[test]
    fn lead_lookup_finds_the_single_lead() {
        let team = Team {
            name: "demo".to_string(),
            created_at_ms: 1,
            session_id: "s".to_string(),
            lead_model: "kimi/k2.5".to_string(),
            members: vec![lead("lead")],
        };
        assert_eq!(team.lead().unwrap().name(), "lead");
        assert_eq!(team.teammate_count(), 0);
    }

    #[test]
    fn name_validation_accepts_and_rejects() {
        assert!(is_valid_team_name("demo-team_1"));
        assert!(!is_valid_team_name(""));
        assert!(!is_valid_team_name("has space"));
        assert!(!is_valid_team_name(&"a".repeat(65)));
        assert!(is_valid_team_name(&"a".repeat(64)));
    }
}
