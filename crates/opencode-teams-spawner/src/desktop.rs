//! Desktop-app backend: binary discovery, detached launch, PID liveness,
//! and termination (spec §4.5, §6.3).

use std::path::{Path, PathBuf};
use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum DesktopError {
    #[error("no desktop agent binary found: checked override, known install paths, and PATH")]
    BinaryNotFound,
    #[error("failed to launch desktop agent: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("process {0} did not start a trackable pid")]
    NoPid(String),
}

/// Known per-OS install locations for the desktop agent binary, checked
/// after the environment override and before a PATH search.
fn known_install_paths() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Applications/OpenCode Agent.app/Contents/MacOS/opencode-agent"),
            dirs::home_dir()
                .map(|h| h.join("Applications/OpenCode Agent.app/Contents/MacOS/opencode-agent"))
                .unwrap_or_default(),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from(r"C:\Program Files\OpenCode Agent\opencode-agent.exe"),
            dirs::data_local_dir()
                .map(|d| d.join(r"Programs\OpenCode Agent\opencode-agent.exe"))
                .unwrap_or_default(),
        ]
    } else {
        vec![
            PathBuf::from("/usr/bin/opencode-agent"),
            PathBuf::from("/usr/local/bin/opencode-agent"),
        ]
    }
}

fn search_path_for(binary_name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary_name))
        .find(|candidate| candidate.is_file())
}

/// Resolve the desktop agent binary: env override, then known per-OS
/// install paths, then a PATH search.
pub fn discover_binary(override_path: Option<&Path>) -> Result<PathBuf, DesktopError> {
    if let Some(p) = override_path {
        if p.is_file() {
            return Ok(p.to_path_buf());
        }
    }
    for candidate in known_install_paths() {
        if candidate.is_file() {
            return Ok(candidate);
        }
    }
    let binary_name = if cfg!(target_os = "windows") {
        "opencode-agent.exe"
    } else {
        "opencode-agent"
    };
    search_path_for(binary_name).ok_or(DesktopError::BinaryNotFound)
}

/// Launch the desktop binary with the identity file path as its sole
/// argument, detached from this process's session/group so it survives the
/// coordinator's own lifecycle.
pub async fn launch(binary: &Path, identity_file: &Path) -> Result<u32, DesktopError> {
    let mut command = Command::new(binary);
    command
        .arg(identity_file)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    #[cfg(unix)]
    unsafe {
        use std::os::unix::process::CommandExt;
        command.pre_exec(|| {
            libc::setsid();
            Ok(())
        });
    }

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    let child = command.spawn().map_err(DesktopError::Spawn)?;
    let pid = child.id().ok_or_else(|| DesktopError::NoPid(binary.display().to_string()))?;
    tracing::debug!(pid, binary = %binary.display(), "launched desktop agent");
    Ok(pid)
}

/// Liveness test only: POSIX signal-0, Windows process-table lookup. Never
/// returns `hung` — desktop processes have no content surface to diff.
pub fn is_process_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        // SAFETY: signal 0 performs no action beyond existence/permission
        // checks; `pid` is a plain integer, no pointer is dereferenced.
        unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
    }
    #[cfg(not(unix))]
    {
        let mut system = sysinfo::System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        system.process(sysinfo::Pid::from_u32(pid)).is_some()
    }
}

/// Terminate `pid`: SIGTERM on POSIX, `TerminateProcess` on Windows.
/// "already dead" is swallowed, matching kill's idempotence contract.
pub fn terminate(pid: u32) {
    if !is_process_alive(pid) {
        tracing::warn!(pid, "terminate called on already-dead pid");
        return;
    }
    #[cfg(unix)]
    unsafe {
        libc::kill(pid as libc::pid_t, libc::SIGTERM);
    }
    #[cfg(windows)]
    {
        let mut system = sysinfo::System::new();
        system.refresh_processes(sysinfo::ProcessesToUpdate::All, true);
        if let Some(process) = system.process(sysinfo::Pid::from_u32(pid)) {
            process.kill();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn discover_prefers_override_when_it_exists() {
        let file = NamedTempFile::new().unwrap();
        let resolved = discover_binary(Some(file.path())).unwrap();
        assert_eq!(resolved, file.path());
    }

    #[test]
    fn discover_ignores_override_pointing_nowhere() {
        let result = discover_binary(Some(Path::new("/definitely/not/here/opencode-agent")));
        // Falls through to known paths / PATH search, which will also fail
        // in a bare test environment.
        assert!(matches!(result, Err(DesktopError::BinaryNotFound)) || result.is_ok());
    }

    #[test]
    fn current_process_reports_alive() {
        assert!(is_process_alive(std::process::id()));
    }

    #[test]
    fn implausible_pid_reports_dead() {
        assert!(!is_process_alive(u32::MAX - 1));
    }
}
