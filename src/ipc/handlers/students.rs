use crate::ipc::helpers::{required_str, respond, session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::roster;
use serde_json::{json, Value};

fn handle_students_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    Ok(json!({ "students": roster::list_students(&session, course)? }))
}

fn handle_students_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    let name = required_str(&req.params, "name")?;
    let student = roster::create_student(&session, course, name)?;
    Ok(json!({
        "name": student.name,
        "assignmentCount": student.assignment_count,
        "message": "Student has been added",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "students.list" => handle_students_list(state, req),
        "students.create" => handle_students_create(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
