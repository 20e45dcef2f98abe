//! Line-delimited JSON stdio binary binding the tool-call protocol (spec
//! §6.1) to the [`opencode_teams_server::Coordinator`].
//!
//! Each line on stdin is one [`opencode_teams_server::Request`]; each line
//! written to stdout is its [`opencode_teams_server::Response`]. Malformed
//! input lines get a parse-error response rather than killing the process.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use opencode_teams_core::config::Config;
use opencode_teams_server::session::Session;
use opencode_teams_server::{Coordinator, Request, Response};

#[derive(Debug, Parser)]
#[command(name = "opencode-teams", about = "Coordination server for opencode-teams")]
struct Cli {
    /// Project directory under which identity files are written.
    #[arg(long, default_value = ".")]
    project_dir: PathBuf,

    /// Path to the external agent binary launched by the terminal backend.
    #[arg(long, default_value = "opencode-agent")]
    agent_binary: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    opencode_teams_core::logging::init();
    let cli = Cli::parse();

    let config = Config::resolve().context("failed to resolve configuration")?;
    let project_dir = cli
        .project_dir
        .canonicalize()
        .unwrap_or(cli.project_dir.clone());
    let session = Session::new(config, project_dir, cli.agent_binary);
    let mut coordinator = Coordinator::new(session);

    run_stdio_loop(&mut coordinator).await
}

async fn run_stdio_loop(coordinator: &mut Coordinator) -> Result<()> {
    let stdin = tokio::io::stdin();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(stdin).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let response = handle_line(coordinator, &line).await;
        let serialized = serde_json::to_string(&response).unwrap_or_else(|e| {
            format!(r#"{{"id":null,"error":{{"kind":"storage","message":"failed to serialize response: {e}"}}}}"#)
        });
        stdout.write_all(serialized.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

async fn handle_line(coordinator: &mut Coordinator, line: &str) -> Response {
    let request: Request = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => return Response::parse_error(format!("invalid request: {e}")),
    };
    let result = coordinator.dispatch(&request.tool, request.params).await;
    Response::from_result(request.id, result)
}
