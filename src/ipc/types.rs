use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::catalog::PendingDelete;
use crate::db::SqliteStore;
use crate::session::Session;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteStore>,
    pub account: Option<String>,
    /// Deletions awaiting confirmation, keyed by the token handed to the UI.
    pub pending: HashMap<String, PendingDelete>,
}

impl AppState {
    pub fn session(&self) -> Option<Session<'_>> {
        let store = self.store.as_ref()?;
        let account = self.account.as_deref()?;
        Some(Session::new(store, account))
    }
}
