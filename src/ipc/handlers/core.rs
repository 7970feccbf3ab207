use crate::db;
use crate::ipc::helpers::{required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tracing::info;

fn handle_health(state: &mut AppState, _req: &Request) -> Result<Value, HandlerErr> {
    Ok(json!({
        "version": env!("CARGO_PKG_VERSION"),
        "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
        "account": state.account,
        "dbPath": state
            .store
            .as_ref()
            .and_then(|s| s.path())
            .map(|p| p.to_string_lossy().to_string()),
    }))
}

/// Opens the workspace database and binds the session to `account`. Pending deletions
/// from a previous account are dropped.
pub fn open_account(state: &mut AppState, path: &Path, account: &str) -> anyhow::Result<()> {
    let store = db::open_db(path)?;
    state.workspace = Some(path.to_path_buf());
    state.store = Some(store);
    state.account = Some(account.to_string());
    state.pending.clear();
    info!(workspace = %path.to_string_lossy(), account, "account opened");
    Ok(())
}

fn handle_account_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let path = PathBuf::from(required_str(&req.params, "path")?);
    let account = required_str(&req.params, "account")?.trim();
    if account.is_empty() {
        return Err(HandlerErr::bad_params("params.account is blank"));
    }

    open_account(state, &path, account)
        .map_err(|e| HandlerErr::new("store_failed", format!("{e:?}")))?;
    Ok(json!({ "workspacePath": path.to_string_lossy(), "account": account }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "health" => handle_health(state, req),
        "account.open" => handle_account_open(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
