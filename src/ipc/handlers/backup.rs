use crate::backup;
use crate::db;
use crate::ipc::helpers::{required_str, respond, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::{json, Value};
use std::path::PathBuf;
use tracing::{error, info};

fn workspace(state: &AppState) -> Result<PathBuf, HandlerErr> {
    state
        .workspace
        .clone()
        .ok_or_else(|| HandlerErr::new("no_account", "no account is open"))
}

fn handle_backup_export(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let workspace = workspace(state)?;
    let out_path = PathBuf::from(required_str(&req.params, "outPath")?);
    let summary = backup::export_workspace_bundle(&workspace, &out_path)
        .map_err(|e| HandlerErr::new("store_failed", format!("{e:?}")))?;
    info!(out = %out_path.to_string_lossy(), sha256 = %summary.db_sha256, "workspace exported");
    Ok(json!({
        "bundleFormat": summary.bundle_format,
        "entryCount": summary.entry_count,
        "dbSha256": summary.db_sha256,
    }))
}

fn handle_backup_import(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let workspace = workspace(state)?;
    let in_path = PathBuf::from(required_str(&req.params, "inPath")?);

    // The database file is replaced underneath, so the connection must be closed first.
    state.store = None;
    state.pending.clear();
    let imported = backup::import_workspace_bundle(&in_path, &workspace);
    let reopened = db::open_db(&workspace);
    match reopened {
        Ok(store) => state.store = Some(store),
        Err(e) => {
            error!(workspace = %workspace.to_string_lossy(), error = ?e, "failed to reopen store after import");
            return Err(HandlerErr::new("store_failed", format!("{e:?}")));
        }
    }
    let summary = imported.map_err(|e| HandlerErr::new("store_failed", format!("{e:?}")))?;
    info!(input = %in_path.to_string_lossy(), format = %summary.bundle_format_detected, "workspace imported");
    Ok(json!({ "bundleFormatDetected": summary.bundle_format_detected }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "backup.export" => handle_backup_export(state, req),
        "backup.import" => handle_backup_import(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
