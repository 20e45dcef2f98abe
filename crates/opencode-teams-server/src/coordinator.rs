//! The outward command surface (spec §4.6): one method per tool in §6.1,
//! each validating its arguments, dispatching to the core/spawner crates,
//! and returning a JSON-serializable result or a [`CoordError`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use opencode_teams_core::error::{CoordError, Result};
use opencode_teams_core::schema::{Backend, HealthStatus, Member, MessageType, Task};
use opencode_teams_core::{health_state, inbox, task_engine, team_registry, time};
use opencode_teams_spawner::health;
use opencode_teams_spawner::identity::Role;
use opencode_teams_spawner::spawner::{self, SpawnRequest};

use crate::session::Session;

pub struct Coordinator {
    session: Session,
}

impl Coordinator {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Dispatch one tool call by name against raw JSON params.
    pub async fn dispatch(&mut self, tool: &str, params: Value) -> Result<Value> {
        match tool {
            "team_create" => self.team_create(parse(params)?).await,
            "team_delete" => self.team_delete().await,
            "read_config" => self.read_config().await,
            "spawn_teammate" => self.spawn_teammate(parse(params)?).await,
            "force_kill_teammate" => self.force_kill_teammate(parse(params)?).await,
            "process_shutdown_approved" => self.process_shutdown_approved(parse(params)?).await,
            "send_message" => self.send_message(parse(params)?).await,
            "read_inbox" => self.read_inbox(parse(params)?).await,
            "poll_inbox" => self.poll_inbox(parse(params)?).await,
            "task_create" => self.task_create(parse(params)?).await,
            "task_update" => self.task_update(parse(params)?).await,
            "task_list" => self.task_list().await,
            "task_get" => self.task_get(parse(params)?).await,
            "list_agent_templates" => self.list_agent_templates().await,
            "check_agent_health" => self.check_agent_health(parse(params)?).await,
            "check_all_agents_health" => self.check_all_agents_health().await,
            other => Err(CoordError::invalid_arg(format!("unknown tool '{other}'"))),
        }
    }

    async fn team_create(&mut self, args: TeamCreateArgs) -> Result<Value> {
        if self.session.bound_team().is_some() {
            return Err(CoordError::busy("session is already bound to a team"));
        }
        let now = time::now_ms();
        let team = team_registry::create_team(
            &self.session.store,
            &args.team_name,
            &args.lead_name,
            args.lead_model.as_deref().unwrap_or("auto"),
            &args.team_name,
            now,
        )?;
        self.session.bind(&args.team_name)?;
        Ok(to_value(&team))
    }

    async fn team_delete(&mut self) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        team_registry::delete_team(&self.session.store, &team_name)?;
        self.session.unbind();
        Ok(Value::Null)
    }

    async fn read_config(&self) -> Result<Value> {
        let team_name = self.session.require_team()?;
        let team = team_registry::read_team(&self.session.store, team_name)?;
        Ok(to_value(&team))
    }

    async fn spawn_teammate(&mut self, args: SpawnTeammateArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let now = time::now_ms();
        let request = SpawnRequest {
            team_name,
            name: args.name,
            prompt: args.prompt,
            model: args.model,
            backend: args.backend.unwrap_or(self.session.config.backend),
            template: args.template,
            custom_instructions: args.custom_instructions,
            cwd: args.cwd,
            project_dir: self.session.project_dir.clone(),
            agent_binary: self.session.agent_binary.clone(),
            use_tmux_windows: self.session.config.use_tmux_windows,
            desktop_binary_override: self.session.config.desktop_binary_override.clone(),
        };
        let member = spawner::spawn_teammate(&self.session.store, request, now)
            .await
            .map_err(CoordError::from)?;
        Ok(to_value(&member))
    }

    async fn force_kill_teammate(&mut self, args: TeammateNameArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        spawner::kill_teammate(&self.session.store, &team_name, &args.name, &self.session.project_dir)
            .await
            .map_err(CoordError::from)?;
        Ok(Value::Null)
    }

    async fn process_shutdown_approved(&mut self, args: TeammateNameArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        team_registry::remove_member(&self.session.store, &team_name, &args.name)?;
        let _ = std::fs::remove_file(self.session.store.inbox_path(&team_name, &args.name));
        let _ = std::fs::remove_file(opencode_teams_spawner::identity::identity_file_path(
            &self.session.project_dir,
            &args.name,
        ));
        Ok(Value::Null)
    }

    async fn send_message(&mut self, args: SendMessageArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let now = time::now_ms();
        let team = team_registry::read_team(&self.session.store, &team_name)?;

        let sender = if args.message_type == MessageType::Message {
            team.lead().map(|m| m.name().to_string()).unwrap_or(args.sender)
        } else {
            args.sender
        };
        let color = team
            .find_member(&sender)
            .map(|m| m.color())
            .unwrap_or(opencode_teams_core::schema::AgentColor::Gray);

        let recipients: Vec<String> = if args.recipient == "*" {
            team.members.iter().filter(|m| m.name() != sender).map(|m| m.name().to_string()).collect()
        } else {
            vec![args.recipient.clone()]
        };

        for recipient in &recipients {
            let message = inbox::build_message(
                &sender,
                recipient,
                args.message_type,
                args.content.clone(),
                args.summary.clone(),
                color,
                now,
            );
            inbox::append(&self.session.store, &team_name, recipient, message)?;
        }
        Ok(Value::Null)
    }

    async fn read_inbox(&self, args: ReadInboxArgs) -> Result<Value> {
        let team_name = self.session.require_team()?;
        let now = time::now_ms();
        let messages = inbox::read(
            &self.session.store,
            team_name,
            &args.agent_name,
            args.mark_as_read.unwrap_or(true),
            now,
        )?;
        Ok(to_value(&messages))
    }

    async fn poll_inbox(&self, args: PollInboxArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let store = self.session.store.clone();
        let agent_name = args.agent_name.clone();
        let timeout_ms = args.timeout_ms.unwrap_or(0);

        let messages = tokio::task::spawn_blocking(move || {
            let now = time::now_ms();
            inbox::poll(&store, &team_name, &agent_name, timeout_ms, now)
        })
        .await
        .map_err(|e| CoordError::storage(format!("poll task panicked: {e}")))??;
        Ok(to_value(&messages))
    }

    async fn task_create(&mut self, args: TaskCreateArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let now = time::now_ms();
        let task = task_engine::create_task(
            &self.session.store,
            &team_name,
            &args.subject,
            args.description.as_deref().unwrap_or(""),
            args.blocked_by.unwrap_or_default(),
            now,
        )?;
        Ok(to_value(&task))
    }

    async fn task_update(&mut self, args: TaskUpdateArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let now = time::now_ms();
        let previous_owner = task_engine::get_task(&self.session.store, &team_name, args.id)
            .ok()
            .and_then(|t| t.owner);

        let update = task_engine::TaskUpdate {
            status: args.status,
            owner: args.owner.map(|o| if o.is_empty() { None } else { Some(o) }),
            blocks: args.blocks,
            blocked_by: args.blocked_by,
            subject: args.subject,
            description: args.description,
        };
        let (task, _others) = task_engine::update_task(&self.session.store, &team_name, args.id, update, now)?;

        self.notify_task_change(&team_name, &task, previous_owner.as_deref(), now)?;
        Ok(to_value(&task))
    }

    fn notify_task_change(&self, team_name: &str, task: &Task, previous_owner: Option<&str>, now: u64) -> Result<()> {
        let team = team_registry::read_team(&self.session.store, team_name)?;
        let lead_name = team.lead().map(|m| m.name().to_string()).unwrap_or_default();
        let lead_color = team.lead().map(|m| m.color()).unwrap_or(opencode_teams_core::schema::AgentColor::Gray);

        if let Some(owner) = &task.owner {
            if previous_owner != Some(owner.as_str()) && team.find_member(owner).is_some() {
                let message = inbox::build_message(
                    &lead_name,
                    owner,
                    MessageType::Message,
                    format!("assigned task #{}: {}", task.id, task.subject),
                    None,
                    lead_color,
                    now,
                );
                inbox::append(&self.session.store, team_name, owner, message)?;
            }
        }

        if task.status == opencode_teams_core::schema::TaskStatus::Completed {
            if let Some(owner) = &task.owner {
                if team.find_member(owner).is_some() {
                    let message = inbox::build_message(
                        owner,
                        &lead_name,
                        MessageType::Message,
                        format!("completed task #{}: {}", task.id, task.subject),
                        None,
                        team.find_member(owner).map(|m| m.color()).unwrap_or(lead_color),
                        now,
                    );
                    if team.find_member(&lead_name).is_some() {
                        inbox::append(&self.session.store, team_name, &lead_name, message)?;
                    }
                }
            }
        }
        Ok(())
    }

    async fn task_list(&self) -> Result<Value> {
        let team_name = self.session.require_team()?;
        let tasks = task_engine::list_tasks(&self.session.store, team_name)?;
        Ok(to_value(&tasks))
    }

    async fn task_get(&self, args: TaskGetArgs) -> Result<Value> {
        let team_name = self.session.require_team()?;
        let task = task_engine::get_task(&self.session.store, team_name, args.id)?;
        Ok(to_value(&task))
    }

    async fn list_agent_templates(&self) -> Result<Value> {
        let templates: Vec<AgentTemplate> = [Role::Researcher, Role::Implementer, Role::Reviewer, Role::Tester]
            .into_iter()
            .map(|role| AgentTemplate {
                name: role.name().to_string(),
                description: role.description().to_string(),
            })
            .collect();
        Ok(to_value(&templates))
    }

    async fn check_agent_health(&self, args: TeammateNameArgs) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let team = team_registry::read_team(&self.session.store, &team_name)?;
        let member = team
            .find_member(&args.name)
            .ok_or_else(|| CoordError::not_found(format!("agent '{}' not found", args.name)))?
            .clone();

        let mut states = health_state::load(&self.session.store, &team_name)?;
        let status = self.probe_one(&member, &mut states).await?;
        health_state::save(&self.session.store, &team_name, &states)?;
        Ok(to_value(&AgentHealth {
            name: member.name().to_string(),
            status,
        }))
    }

    async fn check_all_agents_health(&self) -> Result<Value> {
        let team_name = self.session.require_team()?.to_string();
        let team = team_registry::read_team(&self.session.store, &team_name)?;
        let mut states = health_state::load(&self.session.store, &team_name)?;

        let mut results = Vec::new();
        let mut counts = (0u32, 0u32, 0u32, 0u32); // alive, hung, dead, unknown
        for member in team.members.iter().filter(|m| !m.is_lead()) {
            let status = self.probe_one(member, &mut states).await?;
            match status {
                HealthStatus::Alive => counts.0 += 1,
                HealthStatus::Hung => counts.1 += 1,
                HealthStatus::Dead => counts.2 += 1,
                HealthStatus::Unknown => counts.3 += 1,
            }
            tracing::debug!(agent = member.name(), status = ?status, "probed teammate health");
            results.push(AgentHealth {
                name: member.name().to_string(),
                status,
            });
        }
        tracing::info!(
            alive = counts.0,
            hung = counts.1,
            dead = counts.2,
            unknown = counts.3,
            "completed health probe cycle"
        );

        health_state::save(&self.session.store, &team_name, &states)?;
        Ok(to_value(&results))
    }

    async fn probe_one(
        &self,
        member: &Member,
        states: &mut std::collections::HashMap<String, opencode_teams_core::schema::HealthProbeState>,
    ) -> Result<HealthStatus> {
        let now = time::now_ms();
        match member {
            Member::Lead { .. } => Ok(HealthStatus::Alive),
            Member::Teammate {
                name,
                backend,
                pane_id,
                process_id,
                joined_at_ms,
                ..
            } => match backend {
                Backend::Terminal => {
                    let Some(pane_id) = pane_id else {
                        return Ok(HealthStatus::Unknown);
                    };
                    let previous = states.get(name);
                    let result = health::probe_terminal(
                        pane_id,
                        *joined_at_ms,
                        now,
                        previous.and_then(|p| p.content_hash.as_deref()),
                        previous.and_then(|p| p.last_change_ms),
                    )
                    .await;
                    if let Some(hash) = result.content_hash {
                        health_state::record_observation(states, name, hash, now);
                    }
                    Ok(result.status)
                }
                Backend::Desktop => {
                    let Some(pid) = process_id else {
                        return Ok(HealthStatus::Unknown);
                    };
                    Ok(health::probe_desktop(*pid).status)
                }
            },
        }
    }
}

fn parse<T: for<'de> Deserialize<'de>>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| CoordError::invalid_arg(format!("bad arguments: {e}")))
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).expect("domain types always serialize")
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeamCreateArgs {
    team_name: String,
    lead_name: String,
    #[serde(default)]
    lead_model: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpawnTeammateArgs {
    name: String,
    prompt: String,
    model: String,
    #[serde(default)]
    backend: Option<Backend>,
    #[serde(default)]
    template: Option<String>,
    #[serde(default)]
    custom_instructions: Option<String>,
    cwd: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TeammateNameArgs {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendMessageArgs {
    #[serde(rename = "type")]
    message_type: MessageType,
    recipient: String,
    content: String,
    #[serde(default)]
    summary: Option<String>,
    sender: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReadInboxArgs {
    agent_name: String,
    #[serde(default)]
    mark_as_read: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PollInboxArgs {
    agent_name: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskCreateArgs {
    subject: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    blocked_by: Option<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskUpdateArgs {
    id: u64,
    #[serde(default)]
    status: Option<opencode_teams_core::schema::TaskStatus>,
    #[serde(default)]
    owner: Option<String>,
    #[serde(default)]
    blocks: Option<Vec<u64>>,
    #[serde(default)]
    blocked_by: Option<Vec<u64>>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TaskGetArgs {
    id: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentTemplate {
    name: String,
    description: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AgentHealth {
    name: String,
    status: HealthStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn coordinator() -> (TempDir, TempDir, Coordinator) {
        let root = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let config = opencode_teams_core::config::Config {
            root: root.path().to_path_buf(),
            backend: Backend::Terminal,
            use_tmux_windows: false,
            desktop_binary_override: None,
        };
        let session = Session::new(config, project.path().to_path_buf(), "opencode-agent".to_string());
        (root, project, Coordinator::new(session))
    }

    #[tokio::test]
    async fn team_create_binds_session_and_returns_team() {
        let (_root, _project, mut coordinator) = coordinator();
        let result = coordinator
            .dispatch(
                "team_create",
                serde_json::json!({"teamName": "demo", "leadName": "lead"}),
            )
            .await
            .unwrap();
        assert_eq!(result["name"], "demo");
        assert_eq!(result["members"][0]["role"], "lead");
    }

    #[tokio::test]
    async fn second_team_create_fails_busy() {
        let (_root, _project, mut coordinator) = coordinator();
        coordinator
            .dispatch("team_create", serde_json::json!({"teamName": "demo", "leadName": "lead"}))
            .await
            .unwrap();
        let err = coordinator
            .dispatch("team_create", serde_json::json!({"teamName": "other", "leadName": "lead"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind, opencode_teams_core::error::ErrKind::Busy);
    }

    #[tokio::test]
    async fn task_create_then_list_round_trips() {
        let (_root, _project, mut coordinator) = coordinator();
        coordinator
            .dispatch("team_create", serde_json::json!({"teamName": "demo", "leadName": "lead"}))
            .await
            .unwrap();
        coordinator
            .dispatch("task_create", serde_json::json!({"subject": "map modules"}))
            .await
            .unwrap();
        let list = coordinator.dispatch("task_list", Value::Null).await.unwrap();
        assert_eq!(list.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn task_update_assigning_owner_notifies_inbox() {
        let (_root, _project, mut coordinator) = coordinator();
        coordinator
            .dispatch("team_create", serde_json::json!({"teamName": "demo", "leadName": "lead"}))
            .await
            .unwrap();
        team_registry::add_member(&coordinator.session.store, "demo", |color, _| Member::Teammate {
            agent_id: "r1@demo".to_string(),
            name: "r1".to_string(),
            model: "m".to_string(),
            prompt: "p".to_string(),
            color,
            plan_mode_required: false,
            joined_at_ms: 1,
            backend: Backend::Terminal,
            pane_id: None,
            process_id: None,
            cwd: "/work".to_string(),
            subagent_type: "researcher".to_string(),
        })
        .unwrap();

        coordinator
            .dispatch("task_create", serde_json::json!({"subject": "map modules"}))
            .await
            .unwrap();
        coordinator
            .dispatch("task_update", serde_json::json!({"id": 1, "owner": "r1"}))
            .await
            .unwrap();

        let inbox_result = coordinator
            .dispatch("read_inbox", serde_json::json!({"agentName": "r1", "markAsRead": false}))
            .await
            .unwrap();
        let messages = inbox_result.as_array().unwrap();
        assert!(messages.iter().any(|m| m["content"].as_str().unwrap().contains("map modules")));
    }

    #[tokio::test]
    async fn read_config_before_team_create_is_not_found() {
        let (_root, _project, coordinator) = coordinator();
        let err = coordinator.read_config().await.unwrap_err();
        assert_eq!(err.kind, opencode_teams_core::error::ErrKind::NotFound);
    }

    #[tokio::test]
    async fn list_agent_templates_returns_four_roles() {
        let (_root, _project, mut coordinator) = coordinator();
        let result = coordinator.dispatch("list_agent_templates", Value::Null).await.unwrap();
        assert_eq!(result.as_array().unwrap().len(), 4);
    }
}
