use crate::model::EntityKind;
use crate::store::StoreError;
use serde_json::json;

/// Every way an engine operation can fail. Validation variants are raised before
/// anything is written.
#[derive(Debug, thiserror::Error)]
pub enum GradebookError {
    #[error("Please enter a name")]
    EmptyName,
    #[error("{kind} already exists")]
    AlreadyExists { kind: EntityKind, name: String },
    #[error("Those names aren't allowed")]
    ReservedName(String),
    #[error("{field} cannot be negative")]
    NegativeEntry { field: String },
    #[error("{field} must be a number")]
    NotANumber { field: String },
    #[error("{kind} not found")]
    NotFound { kind: EntityKind, name: String },
    #[error("Mark not available")]
    MarkUnavailable,
    #[error("Deletion was not confirmed by the current account")]
    ConfirmationRejected,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GradebookError {
    pub fn not_found(kind: EntityKind, name: &str) -> Self {
        GradebookError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            GradebookError::EmptyName => "empty_name",
            GradebookError::AlreadyExists { .. } => "already_exists",
            GradebookError::ReservedName(_) => "reserved_name",
            GradebookError::NegativeEntry { .. } => "negative_entry",
            GradebookError::NotANumber { .. } => "not_a_number",
            GradebookError::NotFound { .. } => "not_found",
            GradebookError::MarkUnavailable => "mark_unavailable",
            GradebookError::ConfirmationRejected => "confirmation_rejected",
            GradebookError::Store(_) => "store_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            GradebookError::AlreadyExists { kind, name }
            | GradebookError::NotFound { kind, name } => {
                Some(json!({ "kind": kind, "name": name }))
            }
            GradebookError::ReservedName(name) => Some(json!({ "name": name })),
            GradebookError::NegativeEntry { field } | GradebookError::NotANumber { field } => {
                Some(json!({ "field": field }))
            }
            _ => None,
        }
    }
}
