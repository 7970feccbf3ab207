mod assignment;
mod backup;
mod catalog;
mod config;
mod db;
mod error;
mod ipc;
mod logging;
mod marks;
mod model;
mod propagate;
mod roster;
mod session;
mod store;

use std::io::{self, BufRead, Write};
use tracing::{error, info, warn};

fn main() {
    let config = config::Config::from_env();
    logging::init(&config.log_filter);

    let mut state = ipc::AppState::default();
    match (&config.workspace, &config.account) {
        (Some(workspace), Some(account)) => {
            if let Err(e) = ipc::open_account(&mut state, workspace, account) {
                error!(workspace = %workspace.to_string_lossy(), error = ?e, "startup workspace could not be opened");
            }
        }
        (Some(_), None) => warn!("GRADEBOOKD_WORKSPACE is set without GRADEBOOKD_ACCOUNT; waiting for account.open"),
        _ => {}
    }
    info!(version = env!("CARGO_PKG_VERSION"), "gradebookd ready");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to answer to.
                warn!(error = %e, "unparseable request line");
                let _ = writeln!(stdout, "{}", ipc::bad_json(e.to_string()));
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
