use crate::catalog;
use crate::error::GradebookError;
use crate::ipc::helpers::{optional_str, required_str, respond, session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::EntityKind;
use serde_json::{json, Value};
use uuid::Uuid;

fn handle_delete_request(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let kind: EntityKind = req
        .params
        .get("kind")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| {
            HandlerErr::bad_params("params.kind must be course, category, assignment or student")
        })?;
    let name = required_str(&req.params, "name")?;
    let sub_name = optional_str(&req.params, "subName");

    let pending = {
        let session = session(state)?;
        catalog::request_delete(&session, kind, name, sub_name)?
    };
    let token = Uuid::new_v4().to_string();
    let result = json!({
        "token": token,
        "kind": pending.kind,
        "name": pending.name,
        "subName": pending.sub_name,
        "message": format!("Please confirm deletion of '{}'", pending.target()),
    });
    state.pending.insert(token, pending);
    Ok(result)
}

fn handle_delete_confirm(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let token = required_str(&req.params, "token")?;
    let account = required_str(&req.params, "account")?;
    let pending = state
        .pending
        .remove(token)
        .ok_or_else(|| HandlerErr::bad_params(format!("unknown delete token: {token}")))?;

    let outcome = match session(state) {
        Ok(session) => catalog::confirm_delete(&session, &pending, account).map_err(HandlerErr::from),
        Err(e) => Err(e),
    };
    match outcome {
        Ok(()) => Ok(json!({ "message": format!("{} deleted", pending.kind) })),
        Err(e) => {
            // A wrong account may retry with the same token.
            if e.code == GradebookError::ConfirmationRejected.code() {
                state.pending.insert(token.to_string(), pending);
            }
            Err(e)
        }
    }
}

fn handle_delete_cancel(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let token = required_str(&req.params, "token")?;
    Ok(json!({ "cancelled": state.pending.remove(token).is_some() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "delete.request" => handle_delete_request(state, req),
        "delete.confirm" => handle_delete_confirm(state, req),
        "delete.cancel" => handle_delete_cancel(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
