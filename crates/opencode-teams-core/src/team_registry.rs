//! Team create/read/delete and membership mutation (spec §4.2).

use crate::error::{CoordError, Result};
use crate::schema::{AgentColor, Member, Team};
use crate::store::{self, Store};

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if crate::schema::is_valid_team_name(name) {
        Ok(())
    } else {
        Err(CoordError::invalid_name(format!(
            "{kind} '{name}' must match [A-Za-z0-9_-]{{1,64}}"
        )))
    }
}

/// Create `team_name`'s directory tree and write its initial config with a
/// single lead member and an empty inbox for that lead.
///
/// Fails `ErrExists` if the team directory already exists, `ErrInvalidName`
/// if either name fails the `[A-Za-z0-9_-]{1,64}` regex.
pub fn create_team(
    store: &Store,
    team_name: &str,
    lead_name: &str,
    lead_model: &str,
    session_id: &str,
    now_ms: u64,
) -> Result<Team> {
    validate_name("teamName", team_name)?;
    validate_name("leadName", lead_name)?;

    if store::exists(&store.team_config_path(team_name)) {
        return Err(CoordError::exists(format!("team '{team_name}' already exists")));
    }

    let lead = Member::Lead {
        agent_id: Member::make_agent_id(lead_name, team_name),
        name: lead_name.to_string(),
        color: AgentColor::for_member_index(0),
        joined_at_ms: now_ms,
        session_id: session_id.to_string(),
    };

    let team = Team {
        name: team_name.to_string(),
        created_at_ms: now_ms,
        session_id: session_id.to_string(),
        lead_model: lead_model.to_string(),
        members: vec![lead],
    };

    store::write_json(&store.team_config_path(team_name), &team)?;
    store::write_json(
        &store.inbox_path(team_name, lead_name),
        &Vec::<crate::schema::InboxMessage>::new(),
    )?;

    Ok(team)
}

/// Read `team_name`'s current config. Fails `ErrNotFound` if it has none.
pub fn read_team(store: &Store, team_name: &str) -> Result<Team> {
    let path = store.team_config_path(team_name);
    if !store::exists(&path) {
        return Err(CoordError::not_found(format!("team '{team_name}' not found")));
    }
    store::read_json(&path).map_err(CoordError::from)
}

/// Delete `team_name`'s directory tree. Fails `ErrBusy` if any teammate
/// (non-lead member) remains.
pub fn delete_team(store: &Store, team_name: &str) -> Result<()> {
    let _guard = store::acquire_lock(&store.team_config_lock_path(team_name))?;
    let team = read_team(store, team_name)?;
    if team.teammate_count() > 0 {
        return Err(CoordError::busy(format!(
            "team '{team_name}' still has {} teammate(s)",
            team.teammate_count()
        )));
    }

    let team_dir = store.team_dir(team_name);
    let tasks_dir = store.tasks_dir(team_name);
    std::fs::remove_dir_all(&team_dir).map_err(|source| crate::error::StoreError::Io {
        path: team_dir,
        source,
    })?;
    if store::exists(&tasks_dir) {
        std::fs::remove_dir_all(&tasks_dir).map_err(|source| crate::error::StoreError::Io {
            path: tasks_dir,
            source,
        })?;
    }
    Ok(())
}

/// Append `member` to `team_name`'s config under the team-config lock,
/// assigning the next round-robin color.
pub fn add_member(store: &Store, team_name: &str, build_member: impl FnOnce(AgentColor, usize) -> Member) -> Result<Member> {
    let _guard = store::acquire_lock(&store.team_config_lock_path(team_name))?;
    let mut team = read_team(store, team_name)?;
    let index = team.members.len();
    let color = AgentColor::for_member_index(index);
    let member = build_member(color, index);
    team.members.push(member.clone());
    store::write_json(&store.team_config_path(team_name), &team)?;
    Ok(member)
}

/// Remove the member named `name` from `team_name`'s config under the
/// team-config lock. A no-op success if the member is already gone.
pub fn remove_member(store: &Store, team_name: &str, name: &str) -> Result<()> {
    let _guard = store::acquire_lock(&store.team_config_lock_path(team_name))?;
    let mut team = read_team(store, team_name)?;
    team.members.retain(|m| m.name() != name);
    store::write_json(&store.team_config_path(team_name), &team)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, Store) {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        (dir, store)
    }

    #[test]
    fn create_team_writes_config_and_lead_inbox() {
        let (_dir, store) = store();
        let team = create_team(&store, "demo", "lead", "kimi/k2.5", "sess-1", 1_000).unwrap();
        assert_eq!(team.members.len(), 1);
        assert!(team.lead().is_some());
        assert!(store::exists(&store.inbox_path("demo", "lead")));
    }

    #[test]
    fn create_team_rejects_duplicate() {
        let (_dir, store) = store();
        create_team(&store, "demo", "lead", "m", "s", 1).unwrap();
        let err = create_team(&store, "demo", "lead", "m", "s", 2).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrKind::Exists);
    }

    #[test]
    fn create_team_rejects_invalid_name() {
        let (_dir, store) = store();
        let err = create_team(&store, "bad name!", "lead", "m", "s", 1).unwrap_err();
        assert_eq!(err.kind, crate::error::ErrKind::InvalidName);
    }

    #[test]
    fn read_missing_team_is_not_found() {
        let (_dir, store) = store();
        let err = read_team(&store, "ghost").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrKind::NotFound);
    }

    #[test]
    fn delete_team_fails_when_teammates_remain() {
        let (_dir, store) = store();
        create_team(&store, "demo", "lead", "m", "s", 1).unwrap();
        add_member(&store, "demo", |color, _| Member::Teammate {
            agent_id: "r1@demo".to_string(),
            name: "r1".to_string(),
            model: "m".to_string(),
            prompt: "p".to_string(),
            color,
            plan_mode_required: false,
            joined_at_ms: 2,
            backend: crate::schema::Backend::Terminal,
            pane_id: None,
            process_id: None,
            cwd: "/work".to_string(),
            subagent_type: "researcher".to_string(),
        })
        .unwrap();

        let err = delete_team(&store, "demo").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrKind::Busy);
    }

    #[test]
    fn delete_team_succeeds_with_only_lead() {
        let (_dir, store) = store();
        create_team(&store, "demo", "lead", "m", "s", 1).unwrap();
        delete_team(&store, "demo").unwrap();
        assert!(read_team(&store, "demo").is_err());
    }

    #[test]
    fn add_member_assigns_round_robin_color() {
        let (_dir, store) = store();
        create_team(&store, "demo", "lead", "m", "s", 1).unwrap();
        let member = add_member(&store, "demo", |color, _| Member::Teammate {
            agent_id: "r1@demo".to_string(),
            name: "r1".to_string(),
            model: "m".to_string(),
            prompt: "p".to_string(),
            color,
            plan_mode_required: false,
            joined_at_ms: 2,
            backend: crate::schema::Backend::Terminal,
            pane_id: None,
            process_id: None,
            cwd: "/work".to_string(),
            subagent_type: "researcher".to_string(),
        })
        .unwrap();
        assert_eq!(member.color(), AgentColor::for_member_index(1));
    }

    #[test]
    fn remove_member_is_idempotent() {
        let (_dir, store) = store();
        create_team(&store, "demo", "lead", "m", "s", 1).unwrap();
        remove_member(&store, "demo", "nobody").unwrap();
    }
}
