use crate::catalog;
use crate::ipc::helpers::{required_str, respond, session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_courses_list(state: &mut AppState, _req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = session(state)?;
    let courses = catalog::list_courses(&session)?;
    Ok(json!({ "courses": courses }))
}

fn handle_courses_create(state: &mut AppState, req: &Request) -> Result<serde_json::Value, HandlerErr> {
    let session = session(state)?;
    let name = required_str(&req.params, "name")?;
    let course = catalog::create_course(&session, name)?;
    Ok(json!({
        "name": course.name,
        "message": "Course has been added",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "courses.list" => handle_courses_list(state, req),
        "courses.create" => handle_courses_create(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
