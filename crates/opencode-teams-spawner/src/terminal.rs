//! Terminal-multiplexer backend: split panes, run the agent binary inside
//! them, capture output, and tear them down (spec §4.5, §6.3).
//!
//! Every subprocess call is wrapped in a 5s timeout per spec §5. Argument
//! substitution always goes through `shell-words` quoting or tmux's
//! literal-mode `send-keys -l` — never raw string interpolation into a
//! shell command.

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;

const SUBPROCESS_TIMEOUT: Duration = Duration::from_secs(5);
const AGENT_WALL_CLOCK_BOUND_SECS: u64 = 300;
/// tmux requires a pause between a literal send-keys and the following
/// Enter keypress or the agent binary's readline can swallow the Enter.
const SEND_KEYS_SETTLE: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("tmux command timed out after {0:?}")]
    Timeout(Duration),
    #[error("failed to launch tmux: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("tmux exited with status {status}: {stderr}")]
    NonZeroExit { status: i32, stderr: String },
}

async fn run_tmux(args: &[&str]) -> Result<String, TerminalError> {
    tracing::debug!(?args, "invoking tmux");
    let fut = Command::new("tmux")
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    let output = timeout(SUBPROCESS_TIMEOUT, fut)
        .await
        .map_err(|_| TerminalError::Timeout(SUBPROCESS_TIMEOUT))?
        .map_err(TerminalError::Spawn)?;

    if !output.status.success() {
        return Err(TerminalError::NonZeroExit {
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Assemble the in-pane command line, quoting every substituted argument.
fn build_agent_command_line(agent_binary: &str, name: &str, provider_model: &str, prompt: &str, cwd: &str) -> String {
    let parts = [
        "timeout",
        &format!("{AGENT_WALL_CLOCK_BOUND_SECS}s"),
        agent_binary,
        "run",
        "--agent",
        name,
        "--model",
        provider_model,
        "--format",
        "json",
        "--",
        prompt,
    ];
    let quoted: Vec<String> = parts.iter().map(|p| shell_words::quote(p).into_owned()).collect();
    format!("cd {} && {}", shell_words::quote(cwd), quoted.join(" "))
}

/// Split a new pane (or window, if `use_windows`) in the current session,
/// run the agent binary inside it, and return the new pane's id.
pub async fn spawn_pane(
    agent_binary: &str,
    name: &str,
    provider_model: &str,
    prompt: &str,
    cwd: &str,
    use_windows: bool,
) -> Result<String, TerminalError> {
    let split_args: Vec<&str> = if use_windows {
        vec!["new-window", "-P", "-F", "#{pane_id}"]
    } else {
        vec!["split-window", "-P", "-F", "#{pane_id}"]
    };
    let pane_id = run_tmux(&split_args).await?;

    let command_line = build_agent_command_line(agent_binary, name, provider_model, prompt, cwd);

    run_tmux(&["send-keys", "-t", &pane_id, "-l", &command_line]).await?;
    tokio::time::sleep(SEND_KEYS_SETTLE).await;
    run_tmux(&["send-keys", "-t", &pane_id, "Enter"]).await?;

    Ok(pane_id)
}

/// Query whether `pane_id` is still alive. An absent pane counts as dead,
/// not an error.
pub async fn is_pane_alive(pane_id: &str) -> bool {
    match run_tmux(&["display-message", "-p", "-t", pane_id, "#{pane_dead}"]).await {
        Ok(flag) => flag.trim() == "0",
        Err(_) => false,
    }
}

/// Capture the visible content of `pane_id`.
pub async fn capture_pane(pane_id: &str) -> Result<String, TerminalError> {
    run_tmux(&["capture-pane", "-p", "-t", pane_id]).await
}

/// Kill `pane_id`. "no such pane" is swallowed as a success, matching the
/// kill operation's idempotence contract (spec §4.5).
pub async fn kill_pane(pane_id: &str) -> Result<(), TerminalError> {
    match run_tmux(&["kill-pane", "-t", pane_id]).await {
        Ok(_) => Ok(()),
        Err(TerminalError::NonZeroExit { stderr, .. }) if stderr.contains("can't find pane") => {
            tracing::warn!(pane_id, "kill-pane found no such pane, treating as already dead");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
