use crate::ipc::helpers::{required_str, respond, session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::marks::StudentMarks;
use serde_json::{json, Value};

fn handle_marks_student(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    let student = required_str(&req.params, "studentName")?;
    let mut marks = StudentMarks::load(&session, course, student)?;
    marks.default_sort();

    // An unavailable total is a normal page state, not a failed request.
    Ok(json!({
        "courseName": course,
        "studentName": student,
        "totalMark": marks.total_mark().ok(),
        "totalMarkAdjusted": marks.total_mark_adjusted().ok(),
        "assignments": marks.assignment_rows(),
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    match req.method.as_str() {
        "marks.student" => Some(respond(&req.id, handle_marks_student(state, req))),
        _ => None,
    }
}
