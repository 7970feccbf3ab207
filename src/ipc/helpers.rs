use crate::error::GradebookError;
use crate::ipc::types::AppState;
use crate::session::Session;
use serde_json::{json, Value};
use tracing::warn;

/// The `error` object of a failed response line.
pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    /// `id` is `None` only when the request line could not be parsed at all.
    fn response(self, id: Option<&str>) -> Value {
        let mut error = json!({ "code": self.code, "message": self.message });
        if let Some(d) = self.details {
            error["details"] = d;
        }
        let mut line = json!({ "ok": false, "error": error });
        if let Some(id) = id {
            line["id"] = json!(id);
        }
        line
    }
}

impl From<GradebookError> for HandlerErr {
    fn from(e: GradebookError) -> Self {
        if let GradebookError::Store(source) = &e {
            warn!(error = %source, "store call failed");
        }
        Self {
            code: e.code(),
            message: e.to_string(),
            details: e.details(),
        }
    }
}

pub fn respond(id: &str, result: Result<Value, HandlerErr>) -> Value {
    match result {
        Ok(v) => json!({ "id": id, "ok": true, "result": v }),
        Err(e) => e.response(Some(id)),
    }
}

/// Reply to a line that is not a request.
pub fn bad_json(message: impl Into<String>) -> Value {
    HandlerErr::new("bad_json", message).response(None)
}

pub fn session(state: &AppState) -> Result<Session<'_>, HandlerErr> {
    state
        .session()
        .ok_or_else(|| HandlerErr::new("no_account", "no account is open"))
}

pub fn required_str<'a>(params: &'a Value, key: &str) -> Result<&'a str, HandlerErr> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| HandlerErr::bad_params(format!("missing params.{key}")))
}

pub fn optional_str<'a>(params: &'a Value, key: &str) -> Option<&'a str> {
    params.get(key).and_then(Value::as_str)
}

/// A typed-in number. UIs send text, but a bare JSON number is taken as its text form.
pub fn entry_text(params: &Value, key: &str) -> Result<String, HandlerErr> {
    match params.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(Value::Null) | None => Ok(String::new()),
        Some(_) => Err(HandlerErr::bad_params(format!(
            "params.{key} must be a string"
        ))),
    }
}
