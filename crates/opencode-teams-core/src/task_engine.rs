//! Task CRUD, status machine, and dependency-graph maintenance (spec §4.3).
//!
//! Tasks are stored one file per task rather than a single graph file so
//! that an individual update can be atomic without a global rewrite (spec
//! §9); the cost is an O(n) scan for `list_tasks` and for cycle detection,
//! acceptable at the expected scale of hundreds of tasks per team.

use std::collections::{HashSet, VecDeque};

use crate::error::{CoordError, Result};
use crate::schema::{Task, TaskStatus};
use crate::store::{self, Store};

fn list_task_files(store: &Store, team: &str) -> Result<Vec<Task>> {
    let dir = store.tasks_dir(team);
    if !store::exists(&dir) {
        return Ok(Vec::new());
    }
    let mut tasks = Vec::new();
    let entries = std::fs::read_dir(&dir).map_err(|source| crate::error::StoreError::Io {
        path: dir.clone(),
        source,
    })?;
    for entry in entries {
        let entry = entry.map_err(|source| crate::error::StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        tasks.push(store::read_json(&path)?);
    }
    tasks.sort_by_key(|t: &Task| t.id);
    Ok(tasks)
}

fn write_task(store: &Store, team: &str, task: &Task) -> Result<()> {
    store::write_json(&store.task_path(team, task.id), task).map_err(CoordError::from)
}

/// BFS over existing `blocked_by` edges from each of `from` back toward
/// `target`: true if adding `target -> from` (i.e. `from` becomes a
/// predecessor of `target`) would close a cycle.
fn would_cycle(tasks: &[Task], target: u64, new_predecessors: &[u64]) -> bool {
    let by_id: std::collections::HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut queue: VecDeque<u64> = new_predecessors.iter().copied().collect();

    while let Some(id) = queue.pop_front() {
        if id == target {
            return true;
        }
        if !visited.insert(id) {
            continue;
        }
        if let Some(task) = by_id.get(&id) {
            for &pred in &task.blocked_by {
                queue.push_back(pred);
            }
        }
    }
    false
}

/// Create a task under the tasks lock: the next id is `max(existing) + 1`
/// starting at 1; every `blocked_by` id must exist and be non-terminal.
pub fn create_task(
    store: &Store,
    team: &str,
    subject: &str,
    description: &str,
    blocked_by: Vec<u64>,
    now_ms: u64,
) -> Result<Task> {
    if subject.trim().is_empty() {
        return Err(CoordError::invalid_arg("task subject must not be empty"));
    }

    let _guard = store::acquire_lock(&store.tasks_lock_path(team))?;
    let mut tasks = list_task_files(store, team)?;

    let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;

    for pred_id in &blocked_by {
        let pred = tasks
            .iter()
            .find(|t| t.id == *pred_id)
            .ok_or_else(|| CoordError::invalid_arg(format!("unknown predecessor task {pred_id}")))?;
        if pred.status.is_terminal() {
            return Err(CoordError::invalid_arg(format!(
                "predecessor task {pred_id} is already {:?}",
                pred.status
            )));
        }
    }

    if would_cycle(&tasks, next_id, &blocked_by) {
        return Err(CoordError::cycle(format!(
            "blocked_by {blocked_by:?} would create a cycle through task {next_id}"
        )));
    }

    let task = Task {
        id: next_id,
        subject: subject.to_string(),
        description: description.to_string(),
        status: TaskStatus::Pending,
        owner: None,
        blocks: Vec::new(),
        blocked_by: blocked_by.clone(),
        created_at_ms: now_ms,
        updated_at_ms: now_ms,
    };

    for pred_id in &blocked_by {
        if let Some(pred) = tasks.iter_mut().find(|t| t.id == *pred_id) {
            pred.blocks.push(next_id);
            pred.updated_at_ms = now_ms;
        }
    }
    for pred_id in &blocked_by {
        if let Some(pred) = tasks.iter().find(|t| t.id == *pred_id) {
            write_task(store, team, pred)?;
        }
    }
    write_task(store, team, &task)?;

    Ok(task)
}

pub fn get_task(store: &Store, team: &str, id: u64) -> Result<Task> {
    let path = store.task_path(team, id);
    if !store::exists(&path) {
        return Err(CoordError::not_found(format!("task {id} not found")));
    }
    store::read_json(&path).map_err(CoordError::from)
}

pub fn list_tasks(store: &Store, team: &str) -> Result<Vec<Task>> {
    list_task_files(store, team)
}

/// Field-level diff applied by [`update_task`]. `None` means "leave
/// unchanged"; `blocks`/`blocked_by`, when set, fully replace the edge set.
#[derive(Debug, Default, Clone)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub owner: Option<Option<String>>,
    pub blocks: Option<Vec<u64>>,
    pub blocked_by: Option<Vec<u64>>,
    pub subject: Option<String>,
    pub description: Option<String>,
}

/// Apply `update` to task `id` as a four-phase transaction under the tasks
/// lock (spec §4.3): read every task touched by an edge delta, validate the
/// full diff, mutate in memory, then write every modified file.
///
/// Returns the updated task plus the set of other task ids whose edges
/// changed as a side effect (for cascade notification by callers).
pub fn update_task(
    store: &Store,
    team: &str,
    id: u64,
    update: TaskUpdate,
    now_ms: u64,
) -> Result<(Task, Vec<Task>)> {
    let _guard = store::acquire_lock(&store.tasks_lock_path(team))?;
    let mut tasks = list_task_files(store, team)?;

    let target_idx = tasks
        .iter()
        .position(|t| t.id == id)
        .ok_or_else(|| CoordError::not_found(format!("task {id} not found")))?;

    // --- Phase 2: validate ---
    if let Some(new_status) = update.status {
        let current = tasks[target_idx].status;
        if !current.can_advance_to(new_status) {
            return Err(CoordError::illegal_transition(format!(
                "task {id} cannot move from {current:?} to {new_status:?}"
            )));
        }
        if new_status == TaskStatus::InProgress && !tasks[target_idx].blocked_by.is_empty() {
            return Err(CoordError::illegal_transition(format!(
                "task {id} has unresolved blocked_by, cannot start"
            )));
        }
    }

    if let Some(new_blocked_by) = &update.blocked_by {
        if new_blocked_by.contains(&id) {
            return Err(CoordError::invalid_arg(format!("task {id} cannot block itself")));
        }
        for pred_id in new_blocked_by {
            if !tasks.iter().any(|t| t.id == *pred_id) {
                return Err(CoordError::invalid_arg(format!("unknown predecessor task {pred_id}")));
            }
        }
        let added: Vec<u64> = new_blocked_by
            .iter()
            .copied()
            .filter(|p| !tasks[target_idx].blocked_by.contains(p))
            .collect();
        if !added.is_empty() && would_cycle(&tasks, id, &added) {
            return Err(CoordError::cycle(format!(
                "blocked_by {added:?} would create a cycle through task {id}"
            )));
        }
    }

    if let Some(new_blocks) = &update.blocks {
        if new_blocks.contains(&id) {
            return Err(CoordError::invalid_arg(format!("task {id} cannot block itself")));
        }
        for succ_id in new_blocks {
            if !tasks.iter().any(|t| t.id == *succ_id) {
                return Err(CoordError::invalid_arg(format!("unknown successor task {succ_id}")));
            }
        }
    }

    // --- Phase 3: mutate in memory ---
    let mut touched: HashSet<u64> = HashSet::new();
    touched.insert(id);

    if let Some(new_blocked_by) = update.blocked_by.clone() {
        let old_blocked_by = tasks[target_idx].blocked_by.clone();
        for removed in old_blocked_by.iter().filter(|p| !new_blocked_by.contains(p)) {
            if let Some(pred) = tasks.iter_mut().find(|t| t.id == *removed) {
                pred.blocks.retain(|b| *b != id);
                touched.insert(pred.id);
            }
        }
        for added in new_blocked_by.iter().filter(|p| !old_blocked_by.contains(p)) {
            if let Some(pred) = tasks.iter_mut().find(|t| t.id == *added) {
                if !pred.blocks.contains(&id) {
                    pred.blocks.push(id);
                }
                touched.insert(pred.id);
            }
        }
        tasks[target_idx].blocked_by = new_blocked_by;
    }

    if let Some(new_blocks) = update.blocks.clone() {
        let old_blocks = tasks[target_idx].blocks.clone();
        for removed in old_blocks.iter().filter(|s| !new_blocks.contains(s)) {
            if let Some(succ) = tasks.iter_mut().find(|t| t.id == *removed) {
                succ.blocked_by.retain(|b| *b != id);
                touched.insert(succ.id);
            }
        }
        for added in new_blocks.iter().filter(|s| !old_blocks.contains(s)) {
            if let Some(succ) = tasks.iter_mut().find(|t| t.id == *added) {
                if !succ.blocked_by.contains(&id) {
                    succ.blocked_by.push(id);
                }
                touched.insert(succ.id);
            }
        }
        tasks[target_idx].blocks = new_blocks;
    }

    if let Some(subject) = update.subject {
        tasks[target_idx].subject = subject;
    }
    if let Some(description) = update.description {
        tasks[target_idx].description = description;
    }
    if let Some(owner) = update.owner {
        tasks[target_idx].owner = owner;
    }
    if let Some(status) = update.status {
        tasks[target_idx].status = status;
        if status == TaskStatus::Completed {
            let blocks = tasks[target_idx].blocks.clone();
            for other_id in blocks {
                if let Some(other) = tasks.iter_mut().find(|t| t.id == other_id) {
                    other.blocked_by.retain(|b| *b != id);
                    touched.insert(other.id);
                }
            }
        }
    }
    tasks[target_idx].updated_at_ms = now_ms;
    for &touched_id in &touched {
        if touched_id != id {
            if let Some(t) = tasks.iter_mut().find(|t| t.id == touched_id) {
                t.updated_at_ms = now_ms;
            }
        }
    }

    // --- Phase 4: write every modified task ---
    let target = tasks[target_idx].clone();
    let mut others = Vec::new();
    for touched_id in touched.into_iter().filter(|t| *t != id) {
        if let Some(t) = tasks.iter().find(|t| t.id == touched_id) {
            others.push(t.clone());
        }
    }

    write_task(store, team, &target)?;
    for other in &others {
        write_task(store, team, other)?;
    }

    Ok((target, others))
}
