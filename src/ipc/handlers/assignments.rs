use crate::assignment::{AssignmentForm, AssignmentRecord, SaveTarget, WeightingMode};
use crate::catalog;
use crate::error::GradebookError;
use crate::ipc::helpers::{entry_text, optional_str, required_str, respond, session, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::marks::StudentMarks;
use crate::model::EntityKind;
use crate::roster;
use serde_json::{json, Value};
use std::collections::BTreeMap;

fn master_json(m: &AssignmentRecord) -> Value {
    let maxima: serde_json::Map<String, Value> = m
        .categories
        .iter()
        .map(|(cat, max)| (cat.clone(), json!(max.unwrap_or(0.0))))
        .collect();
    json!({
        "name": m.name,
        "weighting": m.weighting,
        "maxima": maxima,
    })
}

fn handle_assignments_list(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    let masters = catalog::list_assignments(&session, course)?;
    Ok(json!({
        "assignments": masters.iter().map(master_json).collect::<Vec<_>>(),
    }))
}

fn handle_assignments_create(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    let name = required_str(&req.params, "name")?;
    let weighting = entry_text(&req.params, "weighting")?;
    let master = catalog::create_assignment(&session, course, name, &weighting)?;
    Ok(json!({
        "name": master.name,
        "weighting": master.weighting,
        "message": "Assignment Added",
    }))
}

fn handle_assignments_open(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    let name = required_str(&req.params, "assignmentName")?;
    let master = catalog::find_master(&session, course, name)?
        .ok_or_else(|| GradebookError::not_found(EntityKind::Assignment, name))?;

    let Some(student) = optional_str(&req.params, "studentName") else {
        // Course form: every category, with this assignment's max where it has one.
        let categories: Vec<Value> = catalog::list_categories(&session)?
            .into_iter()
            .map(|c| {
                let max = master.categories.get(&c.name).copied().flatten().unwrap_or(0.0);
                json!({ "name": c.name, "weighting": c.weighting, "max": max })
            })
            .collect();
        return Ok(json!({
            "courseName": course,
            "assignmentName": master.name,
            "weighting": master.weighting,
            "categories": categories,
        }));
    };

    let mut marks = StudentMarks::load(&session, course, student)?;
    marks.default_sort();
    let copy = marks.record(&master.name).cloned();
    let has_copy = copy.is_some();
    let copy = copy.unwrap_or_else(|| roster::stub_for(&master));
    let mark = copy.calculate(marks.table()).ok().map(|m| m.percent);

    let categories: Vec<Value> = master
        .categories
        .iter()
        .filter_map(|(cat, max)| {
            let max = max.filter(|m| *m > 0.0)?;
            let score = copy.categories.get(cat).copied().flatten();
            Some(json!({ "name": cat, "score": score, "max": max }))
        })
        .collect();
    Ok(json!({
        "courseName": course,
        "studentName": student,
        "assignmentName": master.name,
        "defaultWeighting": master.weighting,
        "effectiveWeighting": copy.effective_weighting(),
        "adjusted": matches!(copy.mode, WeightingMode::Adjusted(_)),
        "hasCopy": has_copy,
        "mark": mark,
        "categories": categories,
    }))
}

fn assignment_form(params: &Value) -> Result<AssignmentForm, HandlerErr> {
    let mut scores = BTreeMap::new();
    if let Some(raw) = params.get("scores") {
        let obj = raw
            .as_object()
            .ok_or_else(|| HandlerErr::bad_params("params.scores must be an object"))?;
        for cat in obj.keys() {
            scores.insert(cat.clone(), entry_text(raw, cat)?);
        }
    }
    let adjusted = entry_text(params, "adjustedWeighting")?;
    Ok(AssignmentForm {
        assignment_name: required_str(params, "assignmentName")?.to_string(),
        weighting: entry_text(params, "weighting")?,
        adjusted_weighting: Some(adjusted).filter(|s| !s.trim().is_empty()),
        scores,
    })
}

fn handle_assignments_save(state: &mut AppState, req: &Request) -> Result<Value, HandlerErr> {
    let session = session(state)?;
    let course = required_str(&req.params, "courseName")?;
    let form = assignment_form(&req.params)?;
    let target = match optional_str(&req.params, "studentName") {
        Some(student) => SaveTarget::Student(student),
        None => SaveTarget::Course,
    };
    let saved = form.save(&session, course, target)?;
    Ok(json!({
        "assignmentName": saved.name,
        "weighting": saved.weighting,
        "effectiveWeighting": saved.effective_weighting(),
        "message": "Saved",
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<Value> {
    let result = match req.method.as_str() {
        "assignments.list" => handle_assignments_list(state, req),
        "assignments.create" => handle_assignments_create(state, req),
        "assignments.open" => handle_assignments_open(state, req),
        "assignments.save" => handle_assignments_save(state, req),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
