mod auth;
mod config;
mod db;
mod error;
mod ipc;
mod model;
mod reconcile;
mod sheet;
mod store;
mod viewer;

use std::io::{self, BufRead, Write};

use anyhow::Context;

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("RESULTD_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));

    // stdout carries responses; logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn init_state(cfg: &config::Config) -> anyhow::Result<ipc::AppState> {
    let mut state = ipc::AppState {
        workspace: None,
        db: None,
        gate: auth::UploadGate::new(
            Some(cfg.auth.upload_code.as_str()),
            cfg.auth.session_ttl_minutes,
        ),
        sheets: cfg.sheets.credentials(),
    };
    if !state.gate.enabled() {
        tracing::warn!("no upload code configured; uploads are disabled");
    }
    if let Some(path) = cfg.workspace.path.as_ref() {
        let conn = db::open_db(path)
            .with_context(|| format!("failed to open workspace {}", path.display()))?;
        state.workspace = Some(path.clone());
        state.db = Some(conn);
    }
    Ok(state)
}

fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let cfg = config::Config::load().context("failed to load configuration")?;
    let mut state = init_state(&cfg)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "resultd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to reply to.
                tracing::warn!(error = %e, "unparseable request");
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

    Ok(())
}
