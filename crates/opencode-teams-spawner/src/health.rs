//! Health probing for both backends (spec §4.5).
//!
//! Terminal health is content-hash based: unchanged visible pane output for
//! ≥120s past a 60s grace period after join means `hung`. Desktop health is
//! pure liveness — `hung` is never reported since there is no content
//! surface to diff.

use sha2::{Digest, Sha256};

use opencode_teams_core::HealthStatus;

use crate::{desktop, terminal};

const GRACE_PERIOD_MS: u64 = 60_000;
const HUNG_THRESHOLD_MS: u64 = 120_000;

fn sha256_hex(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Result of probing one teammate: the classification plus the content
/// hash to persist (terminal backend only; `None` for desktop).
pub struct ProbeResult {
    pub status: HealthStatus,
    pub content_hash: Option<String>,
}

/// Probe a terminal-backend teammate's pane.
///
/// `previous_hash`/`previous_change_ms` come from the team's persisted
/// [`opencode_teams_core::HealthProbeState`]; `joined_at_ms`/`now_ms` drive
/// the grace-period and hung-threshold checks.
pub async fn probe_terminal(
    pane_id: &str,
    joined_at_ms: u64,
    now_ms: u64,
    previous_hash: Option<&str>,
    previous_change_ms: Option<u64>,
) -> ProbeResult {
    if !terminal::is_pane_alive(pane_id).await {
        return ProbeResult {
            status: HealthStatus::Dead,
            content_hash: previous_hash.map(str::to_string),
        };
    }

    let content = match terminal::capture_pane(pane_id).await {
        Ok(c) => c,
        Err(_) => {
            return ProbeResult {
                status: HealthStatus::Unknown,
                content_hash: previous_hash.map(str::to_string),
            };
        }
    };
    let hash = sha256_hex(&content);

    if now_ms.saturating_sub(joined_at_ms) < GRACE_PERIOD_MS {
        return ProbeResult {
            status: HealthStatus::Alive,
            content_hash: Some(hash),
        };
    }

    let unchanged = previous_hash == Some(hash.as_str());
    if !unchanged {
        return ProbeResult {
            status: HealthStatus::Alive,
            content_hash: Some(hash),
        };
    }

    let stale_for = previous_change_ms.map(|t| now_ms.saturating_sub(t)).unwrap_or(0);
    if stale_for >= HUNG_THRESHOLD_MS {
        ProbeResult {
            status: HealthStatus::Hung,
            content_hash: Some(hash),
        }
    } else {
        ProbeResult {
            status: HealthStatus::Alive,
            content_hash: Some(hash),
        }
    }
}

/// Probe a desktop-backend teammate's PID. Always `Alive` or `Dead`.
pub fn probe_desktop(pid: u32) -> ProbeResult {
    let status = if desktop::is_process_alive(pid) {
        HealthStatus::Alive
    } else {
        HealthStatus::Dead
    };
    ProbeResult {
        status,
        content_hash: None,
    }
}
