mod config;
mod grid;
mod ipc;
mod logging;

use std::io::{self, BufRead, Write};

fn main() -> anyhow::Result<()> {
    logging::init();
    let config = config::GridConfig::load()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "gradegridd started");
    let mut state = ipc::AppState::new(config);

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => ipc::handle_request(&mut state, req),
            Err(e) => {
                // No id to answer with; echo whatever id the line carried.
                let id = serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
                    .unwrap_or_default();
                ipc::err(&id, "bad_json", e.to_string(), None)
            }
        };
        writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        )?;
        stdout.flush()?;
    }
    tracing::info!("gradegridd exiting");
    Ok(())
}
