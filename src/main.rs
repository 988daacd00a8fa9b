mod backup;
mod catalog;
mod config;
mod db;
mod error;
mod grades;
mod images;
mod ipc;
mod lesson_edit;
mod lessons;
mod pagination;
mod people;
mod saga;
mod session;
mod store;
mod subjects;
mod validation;

use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// School administration sidecar: line-delimited JSON requests on stdin,
/// one response line per request on stdout.
#[derive(Parser, Debug)]
#[command(name = "schooladmind")]
#[command(version)]
struct Args {
    /// Workspace folder to open at startup
    #[arg(long, env = "SCHOOLADMIND_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// tracing filter directive, e.g. `debug` or `schooladmind=trace`
    #[arg(long, env = "SCHOOLADMIND_LOG", default_value = "info")]
    log_filter: String,
}

fn main() {
    let args = Args::parse();

    // stdout is the IPC channel; logs go to stderr.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_new(&args.log_filter)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut state = ipc::AppState::default();
    if let Some(path) = args.workspace.as_deref() {
        if let Err(e) = ipc::open_workspace(&mut state, path) {
            warn!(workspace = %path.to_string_lossy(), error = %e, "could not open workspace");
        }
    }
    info!(version = env!("CARGO_PKG_VERSION"), "schooladmind ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // Can't reply without id.
                warn!(error = %e, "unparseable request line");
                let resp = serde_json::json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() }
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let resp = ipc::handle_request(&mut state, req);
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }
}
