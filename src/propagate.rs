//! Keeps student copies in line with the master assignments and categories they
//! were taken from.
//!
//! Each step is one store call and may be re-run safely; a cascade made of several
//! steps is not atomic.

use crate::assignment::AssignmentRecord;
use crate::error::GradebookError;
use crate::model::{
    doc_str, ADJUSTED_WEIGHTING, ASSIGNMENTS, ASSIGNMENT_NAME, COURSE_NAME, STUDENT_NAME,
    WEIGHTING,
};
use crate::roster::{student_query, stub_for};
use crate::session::Session;
use crate::store::{FieldPath, Query, Scope};
use serde_json::Value;
use tracing::debug;

/// Gives every student in `course` who lacks a copy of `master` a fresh stub.
pub fn master_created(
    session: &Session<'_>,
    course: &str,
    master: &AssignmentRecord,
) -> Result<usize, GradebookError> {
    let store = session.store();
    let students = store.find(&session.roster(), &Query::all().eq(COURSE_NAME, course))?;
    let holding = Query::all().elem_eq(ASSIGNMENTS, ASSIGNMENT_NAME, master.name.as_str());
    let stub = Value::Object(stub_for(master).to_document());

    let mut pushed = 0;
    for doc in students.iter().filter(|d| !holding.matches(d)) {
        let Some(student) = doc_str(doc, STUDENT_NAME) else {
            continue;
        };
        pushed += store.update_push(
            &session.roster(),
            &student_query(course, student),
            Scope::One,
            ASSIGNMENTS,
            stub.clone(),
        )?;
    }
    debug!(course, assignment = %master.name, pushed, "master stubs pushed");
    Ok(pushed)
}

/// A new default weighting overrides every student's copy and drops their
/// adjusted weightings.
pub fn master_weighting_changed(
    session: &Session<'_>,
    course: &str,
    assignment: &str,
    weighting: f64,
) -> Result<(), GradebookError> {
    let store = session.store();
    let holders = Query::all()
        .eq(COURSE_NAME, course)
        .elem_eq(ASSIGNMENTS, ASSIGNMENT_NAME, assignment);
    let cleared = store.update_unset(
        &session.roster(),
        &holders,
        Scope::Many,
        &FieldPath::first_match(ASSIGNMENTS, ASSIGNMENT_NAME, assignment, ADJUSTED_WEIGHTING),
    )?;
    let updated = store.update_set(
        &session.roster(),
        &holders,
        Scope::Many,
        &FieldPath::first_match(ASSIGNMENTS, ASSIGNMENT_NAME, assignment, WEIGHTING),
        Value::from(weighting),
    )?;
    debug!(course, assignment, weighting, cleared, updated, "weighting propagated");
    Ok(())
}

/// Strips the category from every master and every student copy in the account.
pub fn category_deleted(session: &Session<'_>, category: &str) -> Result<(), GradebookError> {
    let store = session.store();
    let path = FieldPath::each_element(ASSIGNMENTS, category);
    let masters = store.update_unset(
        &session.catalog(),
        &Query::all().exists(COURSE_NAME),
        Scope::Many,
        &path,
    )?;
    let copies = store.update_unset(&session.roster(), &Query::all(), Scope::Many, &path)?;
    debug!(category, masters, copies, "category stripped");
    Ok(())
}

pub fn master_deleted(
    session: &Session<'_>,
    course: &str,
    assignment: &str,
) -> Result<(), GradebookError> {
    let removed = session.store().update_pull(
        &session.roster(),
        &Query::all().eq(COURSE_NAME, course),
        Scope::Many,
        ASSIGNMENTS,
        &Query::all().eq(ASSIGNMENT_NAME, assignment),
    )?;
    debug!(course, assignment, removed, "student copies removed");
    Ok(())
}

/// Unenrols every student of the course. The course document itself, which holds
/// the masters, is removed by the caller.
pub fn course_deleted(session: &Session<'_>, course: &str) -> Result<(), GradebookError> {
    let removed = session.store().delete(
        &session.roster(),
        &Query::all().eq(COURSE_NAME, course),
        Scope::Many,
    )?;
    debug!(course, removed, "students unenrolled");
    Ok(())
}
