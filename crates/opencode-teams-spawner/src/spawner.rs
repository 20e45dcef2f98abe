//! Orchestrates `spawn_teammate`/`force_kill_teammate` (spec §4.5): wires
//! identity generation and backend launch to the team registry and inbox,
//! rolling the config back if anything after membership registration fails.

use std::path::{Path, PathBuf};

use thiserror::Error;

use opencode_teams_core::error::{CoordError, ErrKind};
use opencode_teams_core::schema::{Backend, Member, MessageType};
use opencode_teams_core::store::Store;
use opencode_teams_core::{inbox, task_engine, team_registry};

use crate::identity::{self, Role};
use crate::{desktop, terminal};

#[derive(Debug, Error)]
pub enum SpawnError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error("unknown agent template '{0}'")]
    UnknownTemplate(String),
    #[error("terminal backend failure: {0}")]
    Terminal(#[from] terminal::TerminalError),
    #[error("desktop backend failure: {0}")]
    Desktop(#[from] desktop::DesktopError),
    #[error("identity file I/O failure: {0}")]
    Identity(#[from] std::io::Error),
}

impl From<SpawnError> for CoordError {
    fn from(err: SpawnError) -> Self {
        match err {
            SpawnError::Coord(e) => e,
            SpawnError::UnknownTemplate(name) => {
                CoordError::unknown_template(format!("unknown template '{name}'"))
            }
            other => CoordError::spawn(other.to_string()),
        }
    }
}

/// Arguments to [`spawn_teammate`], mirroring the `spawn_teammate` tool
/// (spec §6.1).
pub struct SpawnRequest {
    pub team_name: String,
    pub name: String,
    pub prompt: String,
    pub model: String,
    pub backend: Backend,
    pub template: Option<String>,
    pub custom_instructions: Option<String>,
    pub cwd: String,
    pub project_dir: PathBuf,
    pub agent_binary: String,
    pub use_tmux_windows: bool,
    pub desktop_binary_override: Option<PathBuf>,
}

/// Run the full spawn sequence. On failure after step (2) (membership
/// already registered), the member is removed and the inbox deleted to
/// restore the pre-spawn team state, per spec §4.5's rollback contract.
pub async fn spawn_teammate(store: &Store, req: SpawnRequest, now_ms: u64) -> Result<Member, SpawnError> {
    let role = req
        .template
        .as_deref()
        .map(|t| Role::from_name(t).ok_or_else(|| SpawnError::UnknownTemplate(t.to_string())))
        .transpose()?
        .unwrap_or(Role::Implementer);

    let team_name = req.team_name.clone();
    let name = req.name.clone();

    let member = team_registry::add_member(store, &team_name, |color, _index| Member::Teammate {
        agent_id: Member::make_agent_id(&name, &team_name),
        name: name.clone(),
        model: req.model.clone(),
        prompt: req.prompt.clone(),
        color,
        plan_mode_required: false,
        joined_at_ms: now_ms,
        backend: req.backend,
        pane_id: None,
        process_id: None,
        cwd: req.cwd.clone(),
        subagent_type: role.name().to_string(),
    })?;

    match finish_spawn(store, &req, role, &member, now_ms).await {
        Ok(member) => Ok(member),
        Err(err) => {
            let _ = team_registry::remove_member(store, &team_name, &name);
            let _ = std::fs::remove_file(store.inbox_path(&team_name, &name));
            let _ = std::fs::remove_file(identity::identity_file_path(&req.project_dir, &name));
            Err(err)
        }
    }
}

async fn finish_spawn(
    store: &Store,
    req: &SpawnRequest,
    role: Role,
    member: &Member,
    now_ms: u64,
) -> Result<Member, SpawnError> {
    // Empty inbox, then the initial prompt as the first message.
    let message = inbox::build_message(
        &Member::make_agent_id("lead", &req.team_name),
        &req.name,
        MessageType::Message,
        req.prompt.clone(),
        None,
        member.color(),
        now_ms,
    );
    inbox::append(store, &req.team_name, &req.name, message).map_err(SpawnError::Coord)?;

    identity::generate_identity_file(
        &req.project_dir,
        &req.name,
        &req.team_name,
        role,
        &req.model,
        req.custom_instructions.as_deref(),
    )?;

    let (pane_id, process_id) = match req.backend {
        Backend::Terminal => {
            let pane_id = terminal::spawn_pane(
                &req.agent_binary,
                &req.name,
                &req.model,
                &req.prompt,
                &req.cwd,
                req.use_tmux_windows,
            )
            .await?;
            (Some(pane_id), None)
        }
        Backend::Desktop => {
            let binary = desktop::discover_binary(req.desktop_binary_override.as_deref())?;
            let identity_path = identity::identity_file_path(&req.project_dir, &req.name);
            let pid = desktop::launch(&binary, &identity_path).await?;
            (None, Some(pid))
        }
    };

    let updated = update_member_handle(store, &req.team_name, &req.name, pane_id, process_id)?;
    Ok(updated)
}

fn update_member_handle(
    store: &Store,
    team_name: &str,
    name: &str,
    pane_id: Option<String>,
    process_id: Option<u32>,
) -> Result<Member, CoordError> {
    let _guard = opencode_teams_core::store::acquire_lock(&store.team_config_lock_path(team_name))?;
    let mut team = team_registry::read_team(store, team_name)?;
    let member = team
        .members
        .iter_mut()
        .find(|m| m.name() == name)
        .ok_or_else(|| CoordError::new(ErrKind::NotFound, format!("member '{name}' vanished during spawn")))?;
    if let Member::Teammate { pane_id: p, process_id: pid, .. } = member {
        *p = pane_id;
        *pid = process_id;
    }
    let updated = member.clone();
    opencode_teams_core::store::write_json(&store.team_config_path(team_name), &team)?;
    Ok(updated)
}

/// Force-kill `name`: signal the backend (idempotently), clear its task
/// ownership, then remove its membership, inbox, and identity file. All
/// file mutations are atomic; calling this on an already-removed member is
/// a no-op success.
pub async fn kill_teammate(store: &Store, team_name: &str, name: &str, project_dir: &Path) -> Result<(), SpawnError> {
    let team = team_registry::read_team(store, team_name).map_err(SpawnError::Coord)?;
    if let Some(member) = team.find_member(name) {
        if let Member::Teammate { backend, pane_id, process_id, .. } = member {
            match backend {
                Backend::Terminal => {
                    if let Some(pane_id) = pane_id {
                        terminal::kill_pane(pane_id).await?;
                    }
                }
                Backend::Desktop => {
                    if let Some(pid) = process_id {
                        desktop::terminate(*pid);
                    }
                }
            }
        }
    }

    reset_owned_tasks(store, team_name, name)?;
    team_registry::remove_member(store, team_name, name).map_err(SpawnError::Coord)?;
    let _ = std::fs::remove_file(store.inbox_path(team_name, name));
    let _ = std::fs::remove_file(identity::identity_file_path(project_dir, name));
    Ok(())
}

fn reset_owned_tasks(store: &Store, team_name: &str, name: &str) -> Result<(), CoordError> {
    for task in task_engine::list_tasks(store, team_name)? {
        if task.owner.as_deref() == Some(name) {
            task_engine::update_task(
                store,
                team_name,
                task.id,
                task_engine::TaskUpdate {
                    owner: Some(None),
                    ..Default::default()
                },
                task.updated_at_ms,
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencode_teams_core::schema::TaskStatus;
    use tempfile::TempDir;

    fn store_with_team() -> (TempDir, TempDir, Store) {
        let root = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let store = Store::new(root.path());
        team_registry::create_team(&store, "demo", "lead", "kimi/k2.5", "sess-1", 1).unwrap();
        (root, project, store)
    }

    #[test]
    fn kill_resets_owned_task_but_keeps_status() {
        let (_root, _project, store) = store_with_team();
        team_registry::add_member(&store, "demo", |color, _| Member::Teammate {
            agent_id: "r1@demo".to_string(),
            name: "r1".to_string(),
            model: "m".to_string(),
            prompt: "p".to_string(),
            color,
            plan_mode_required: false,
            joined_at_ms: 2,
            backend: Backend::Terminal,
            pane_id: None,
            process_id: None,
            cwd: "/work".to_string(),
            subagent_type: "implementer".to_string(),
        })
        .unwrap();

        let task = task_engine::create_task(&store, "demo", "map modules", "", vec![], 3).unwrap();
        task_engine::update_task(
            &store,
            "demo",
            task.id,
            task_engine::TaskUpdate {
                owner: Some(Some("r1".to_string())),
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            },
            4,
        )
        .unwrap();

        reset_owned_tasks(&store, "demo", "r1").unwrap();

        let reloaded = task_engine::get_task(&store, "demo", task.id).unwrap();
        assert!(reloaded.owner.is_none());
        assert_eq!(reloaded.status, TaskStatus::InProgress);
    }
}
