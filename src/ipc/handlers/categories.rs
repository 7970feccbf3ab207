use crate::catalog;
use crate::ipc::helpers::{entry_text, required_str, respond, session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_categories_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = session(state)?;
    Ok(json!({ "categories": catalog::list_categories(&session)? }))
}

fn handle_categories_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = session(state)?;
    let name = required_str(&req.params, "name")?;
    let weighting = entry_text(&req.params, "weighting")?;
    let category = catalog::create_category(&session, name, &weighting)?;
    Ok(json!({
        "name": category.name,
        "weighting": category.weighting,
        "message": "Category Added",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "categories.list" => handle_categories_list(state, req),
        "categories.create" => handle_categories_create(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
