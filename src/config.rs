use std::path::PathBuf;

pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Startup settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Workspace opened before the first request arrives.
    pub workspace: Option<PathBuf>,
    /// Account bound at startup; only used together with `workspace`.
    pub account: Option<String>,
    pub log_filter: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        Self {
            workspace: non_empty("GRADEBOOKD_WORKSPACE").map(PathBuf::from),
            account: non_empty("GRADEBOOKD_ACCOUNT"),
            log_filter: non_empty("GRADEBOOKD_LOG")
                .or_else(|| non_empty("RUST_LOG"))
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}
