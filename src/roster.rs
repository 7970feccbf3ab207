//! Enrolled students and their per-assignment score sheets.

use crate::assignment::AssignmentRecord;
use crate::catalog;
use crate::error::GradebookError;
use crate::model::{
    doc_array_len, doc_str, same_name, sort_key, EntityKind, StudentSummary, ASSIGNMENTS,
    ASSIGNMENT_NAME, COURSE_NAME, STUDENT_NAME,
};
use crate::session::Session;
use crate::store::{Document, Query, Scope};
use serde_json::Value;
use tracing::info;

pub(crate) fn student_query(course: &str, student: &str) -> Query {
    Query::all()
        .eq(STUDENT_NAME, student)
        .eq(COURSE_NAME, course)
}

/// A fresh copy of `master` for a student: its weighting, and an ungraded slot for
/// every category the master actually uses.
pub(crate) fn stub_for(master: &AssignmentRecord) -> AssignmentRecord {
    let mut stub = AssignmentRecord::new(&master.name, master.weighting);
    stub.categories = master
        .categories
        .iter()
        .filter(|(_, max)| max.map(|m| m > 0.0).unwrap_or(false))
        .map(|(cat, _)| (cat.clone(), None))
        .collect();
    stub
}

pub fn list_students(
    session: &Session<'_>,
    course: &str,
) -> Result<Vec<StudentSummary>, GradebookError> {
    catalog::ensure_course(session, course)?;
    let docs = session
        .store()
        .find(&session.roster(), &Query::all().eq(COURSE_NAME, course))?;
    let mut out: Vec<StudentSummary> = docs
        .iter()
        .filter_map(|d| {
            Some(StudentSummary {
                name: doc_str(d, STUDENT_NAME)?.to_string(),
                course_name: course.to_string(),
                assignment_count: doc_array_len(d, ASSIGNMENTS),
            })
        })
        .collect();
    out.sort_by_cached_key(|s| sort_key(&s.name));
    Ok(out)
}

/// Stored name of the student in `course` matching `input` case-insensitively.
pub fn resolve_student(
    session: &Session<'_>,
    course: &str,
    input: &str,
) -> Result<Option<String>, GradebookError> {
    let docs = session
        .store()
        .find(&session.roster(), &Query::all().eq(COURSE_NAME, course))?;
    Ok(docs
        .iter()
        .filter_map(|d| doc_str(d, STUDENT_NAME))
        .find(|name| same_name(name, input))
        .map(str::to_string))
}

pub fn create_student(
    session: &Session<'_>,
    course: &str,
    name: &str,
) -> Result<StudentSummary, GradebookError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::EmptyName);
    }
    let masters = catalog::master_assignments(session, course)?;
    if resolve_student(session, course, name)?.is_some() {
        return Err(GradebookError::AlreadyExists {
            kind: EntityKind::Student,
            name: name.to_string(),
        });
    }

    let sheets: Vec<Value> = masters
        .iter()
        .map(|m| Value::Object(stub_for(m).to_document()))
        .collect();
    let assignment_count = sheets.len();

    let mut doc = Document::new();
    doc.insert(STUDENT_NAME.to_string(), Value::from(name));
    doc.insert(COURSE_NAME.to_string(), Value::from(course));
    doc.insert(ASSIGNMENTS.to_string(), Value::Array(sheets));
    session.store().insert(&session.roster(), doc)?;
    info!(account = session.account(), course, student = name, "student enrolled");

    Ok(StudentSummary {
        name: name.to_string(),
        course_name: course.to_string(),
        assignment_count,
    })
}

/// The student's assignment copies in stored order.
pub fn student_assignments(
    session: &Session<'_>,
    course: &str,
    student: &str,
) -> Result<Vec<AssignmentRecord>, GradebookError> {
    let doc = session
        .store()
        .find_one(&session.roster(), &student_query(course, student))?
        .ok_or_else(|| GradebookError::not_found(EntityKind::Student, student))?;
    Ok(doc
        .get(ASSIGNMENTS)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(AssignmentRecord::from_document)
                .collect()
        })
        .unwrap_or_default())
}

/// Removes the student's copy with the same name, if any, then stores `record`.
pub(crate) fn replace_assignment(
    session: &Session<'_>,
    course: &str,
    student: &str,
    record: &AssignmentRecord,
) -> Result<(), GradebookError> {
    let store = session.store();
    let query = student_query(course, student);
    if store.find_one(&session.roster(), &query)?.is_none() {
        return Err(GradebookError::not_found(EntityKind::Student, student));
    }
    store.update_pull(
        &session.roster(),
        &query,
        Scope::One,
        ASSIGNMENTS,
        &Query::all().eq(ASSIGNMENT_NAME, record.name.as_str()),
    )?;
    store.update_push(
        &session.roster(),
        &query,
        Scope::One,
        ASSIGNMENTS,
        Value::Object(record.to_document()),
    )?;
    Ok(())
}

pub(crate) fn delete_student(
    session: &Session<'_>,
    course: &str,
    student: &str,
) -> Result<usize, GradebookError> {
    Ok(session
        .store()
        .delete(&session.roster(), &student_query(course, student), Scope::One)?)
}
