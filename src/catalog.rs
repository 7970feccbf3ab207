//! Courses, account-wide categories, and each course's master assignments.

use crate::assignment::AssignmentRecord;
use crate::error::GradebookError;
use crate::model::{
    doc_array_len, doc_str, is_reserved, parse_entry, same_name, sort_key, Category,
    CourseSummary, EntityKind, ASSIGNMENTS, ASSIGNMENT_NAME, CATEGORY, COURSE_NAME,
};
use crate::propagate;
use crate::roster;
use crate::session::Session;
use crate::store::{Document, Query, Scope};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, info, warn};

fn course_query(course: &str) -> Query {
    Query::all().eq(COURSE_NAME, course)
}

fn course_doc(session: &Session<'_>, course: &str) -> Result<Document, GradebookError> {
    session
        .store()
        .find_one(&session.catalog(), &course_query(course))?
        .ok_or_else(|| GradebookError::not_found(EntityKind::Course, course))
}

pub fn ensure_course(session: &Session<'_>, course: &str) -> Result<(), GradebookError> {
    course_doc(session, course).map(|_| ())
}

/// Stored name of the course matching `input` case-insensitively.
pub fn resolve_course(session: &Session<'_>, input: &str) -> Result<Option<String>, GradebookError> {
    let docs = session
        .store()
        .find(&session.catalog(), &Query::all().exists(COURSE_NAME))?;
    Ok(docs
        .iter()
        .filter_map(|d| doc_str(d, COURSE_NAME))
        .find(|name| same_name(name, input))
        .map(str::to_string))
}

pub fn list_courses(session: &Session<'_>) -> Result<Vec<CourseSummary>, GradebookError> {
    let store = session.store();
    let courses = store.find(&session.catalog(), &Query::all().exists(COURSE_NAME))?;
    let students = store.find(&session.roster(), &Query::all().exists(COURSE_NAME))?;

    let mut student_counts: HashMap<&str, usize> = HashMap::new();
    for s in &students {
        if let Some(course) = doc_str(s, COURSE_NAME) {
            *student_counts.entry(course).or_insert(0) += 1;
        }
    }

    let mut out: Vec<CourseSummary> = courses
        .iter()
        .filter_map(|d| {
            let name = doc_str(d, COURSE_NAME)?;
            Some(CourseSummary {
                name: name.to_string(),
                student_count: student_counts.get(name).copied().unwrap_or(0),
                assignment_count: doc_array_len(d, ASSIGNMENTS),
            })
        })
        .collect();
    out.sort_by_cached_key(|c| sort_key(&c.name));
    Ok(out)
}

pub fn create_course(session: &Session<'_>, name: &str) -> Result<CourseSummary, GradebookError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::EmptyName);
    }
    if resolve_course(session, name)?.is_some() {
        return Err(GradebookError::AlreadyExists {
            kind: EntityKind::Course,
            name: name.to_string(),
        });
    }

    let mut doc = Document::new();
    doc.insert(COURSE_NAME.to_string(), Value::from(name));
    doc.insert(ASSIGNMENTS.to_string(), Value::Array(Vec::new()));
    session.store().insert(&session.catalog(), doc)?;
    info!(account = session.account(), course = name, "course created");

    Ok(CourseSummary {
        name: name.to_string(),
        student_count: 0,
        assignment_count: 0,
    })
}

pub fn list_categories(session: &Session<'_>) -> Result<Vec<Category>, GradebookError> {
    let docs = session
        .store()
        .find(&session.catalog(), &Query::all().exists(CATEGORY))?;
    let mut out: Vec<Category> = docs.iter().filter_map(Category::from_document).collect();
    out.sort_by_cached_key(|c| sort_key(&c.name));
    Ok(out)
}

fn resolve_category(session: &Session<'_>, input: &str) -> Result<Option<String>, GradebookError> {
    Ok(list_categories(session)?
        .into_iter()
        .map(|c| c.name)
        .find(|name| same_name(name, input)))
}

pub fn create_category(
    session: &Session<'_>,
    name: &str,
    weighting: &str,
) -> Result<Category, GradebookError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::EmptyName);
    }
    if resolve_category(session, name)?.is_some() {
        return Err(GradebookError::AlreadyExists {
            kind: EntityKind::Category,
            name: name.to_string(),
        });
    }
    if is_reserved(name) {
        return Err(GradebookError::ReservedName(name.to_string()));
    }
    let weighting = parse_entry("Weighting", weighting)?;

    let category = Category {
        name: name.to_string(),
        weighting,
    };
    session
        .store()
        .insert(&session.catalog(), category.to_document())?;
    info!(account = session.account(), category = name, weighting, "category created");
    Ok(category)
}

/// Master assignments of a course in stored order.
pub fn master_assignments(
    session: &Session<'_>,
    course: &str,
) -> Result<Vec<AssignmentRecord>, GradebookError> {
    let doc = course_doc(session, course)?;
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

pub fn list_assignments(
    session: &Session<'_>,
    course: &str,
) -> Result<Vec<AssignmentRecord>, GradebookError> {
    let mut masters = master_assignments(session, course)?;
    masters.sort_by_cached_key(|m| sort_key(&m.name));
    Ok(masters)
}

pub fn find_master(
    session: &Session<'_>,
    course: &str,
    name: &str,
) -> Result<Option<AssignmentRecord>, GradebookError> {
    Ok(master_assignments(session, course)?
        .into_iter()
        .find(|m| m.name == name))
}

pub fn create_assignment(
    session: &Session<'_>,
    course: &str,
    name: &str,
    weighting: &str,
) -> Result<AssignmentRecord, GradebookError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(GradebookError::EmptyName);
    }
    let existing = master_assignments(session, course)?;
    if existing.iter().any(|m| same_name(&m.name, name)) {
        return Err(GradebookError::AlreadyExists {
            kind: EntityKind::Assignment,
            name: name.to_string(),
        });
    }
    if is_reserved(name) {
        return Err(GradebookError::ReservedName(name.to_string()));
    }
    let weighting = parse_entry("Weighting", weighting)?;

    let master = AssignmentRecord::new(name, weighting);
    session.store().update_push(
        &session.catalog(),
        &course_query(course),
        Scope::One,
        ASSIGNMENTS,
        Value::Object(master.to_document()),
    )?;
    propagate::master_created(session, course, &master)?;
    info!(account = session.account(), course, assignment = name, weighting, "assignment created");
    Ok(master)
}

/// Removes any master with the same name, then stores `record` in its place.
pub(crate) fn replace_master(
    session: &Session<'_>,
    course: &str,
    record: &AssignmentRecord,
) -> Result<(), GradebookError> {
    ensure_course(session, course)?;
    let store = session.store();
    store.update_pull(
        &session.catalog(),
        &course_query(course),
        Scope::One,
        ASSIGNMENTS,
        &Query::all().eq(ASSIGNMENT_NAME, record.name.as_str()),
    )?;
    store.update_push(
        &session.catalog(),
        &course_query(course),
        Scope::One,
        ASSIGNMENTS,
        Value::Object(record.to_document()),
    )?;
    Ok(())
}

/// A deletion whose target has been resolved to its stored name but not yet run.
///
/// For assignments and students `name` is the course and `sub_name` the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingDelete {
    pub kind: EntityKind,
    pub name: String,
    pub sub_name: Option<String>,
}

impl PendingDelete {
    pub fn target(&self) -> &str {
        self.sub_name.as_deref().unwrap_or(&self.name)
    }
}

pub fn request_delete(
    session: &Session<'_>,
    kind: EntityKind,
    name: &str,
    sub_name: Option<&str>,
) -> Result<PendingDelete, GradebookError> {
    let name = name.trim();
    let sub_name = sub_name.map(str::trim).unwrap_or("");
    if name.is_empty() {
        return Err(GradebookError::EmptyName);
    }
    let needs_sub = matches!(kind, EntityKind::Assignment | EntityKind::Student);
    if needs_sub && sub_name.is_empty() {
        return Err(GradebookError::EmptyName);
    }
    let missing = |input: &str| GradebookError::not_found(kind, input);

    let pending = match kind {
        EntityKind::Course => PendingDelete {
            kind,
            name: resolve_course(session, name)?.ok_or_else(|| missing(name))?,
            sub_name: None,
        },
        EntityKind::Category => PendingDelete {
            kind,
            name: resolve_category(session, name)?.ok_or_else(|| missing(name))?,
            sub_name: None,
        },
        EntityKind::Assignment => {
            let course = resolve_course(session, name)?
                .ok_or_else(|| GradebookError::not_found(EntityKind::Course, name))?;
            let assignment = master_assignments(session, &course)?
                .into_iter()
                .map(|m| m.name)
                .find(|n| same_name(n, sub_name))
                .ok_or_else(|| missing(sub_name))?;
            PendingDelete {
                kind,
                name: course,
                sub_name: Some(assignment),
            }
        }
        EntityKind::Student => {
            let course = resolve_course(session, name)?
                .ok_or_else(|| GradebookError::not_found(EntityKind::Course, name))?;
            let student = roster::resolve_student(session, &course, sub_name)?
                .ok_or_else(|| missing(sub_name))?;
            PendingDelete {
                kind,
                name: course,
                sub_name: Some(student),
            }
        }
    };
    debug!(?pending, "deletion awaiting confirmation");
    Ok(pending)
}

/// Runs a pending deletion once the account holder has confirmed it.
pub fn confirm_delete(
    session: &Session<'_>,
    pending: &PendingDelete,
    confirming_account: &str,
) -> Result<(), GradebookError> {
    if confirming_account.trim() != session.account() {
        warn!(account = session.account(), "deletion confirmation rejected");
        return Err(GradebookError::ConfirmationRejected);
    }
    execute_delete(session, pending)?;
    info!(account = session.account(), kind = %pending.kind, target = pending.target(), "deleted");
    Ok(())
}

fn execute_delete(session: &Session<'_>, pending: &PendingDelete) -> Result<(), GradebookError> {
    let store = session.store();
    match (pending.kind, pending.sub_name.as_deref()) {
        (EntityKind::Course, _) => {
            store.delete(&session.catalog(), &course_query(&pending.name), Scope::One)?;
            propagate::course_deleted(session, &pending.name)?;
        }
        (EntityKind::Category, _) => {
            store.delete(
                &session.catalog(),
                &Query::all().eq(CATEGORY, pending.name.as_str()),
                Scope::One,
            )?;
            propagate::category_deleted(session, &pending.name)?;
        }
        (EntityKind::Assignment, Some(assignment)) => {
            store.update_pull(
                &session.catalog(),
                &course_query(&pending.name),
                Scope::One,
                ASSIGNMENTS,
                &Query::all().eq(ASSIGNMENT_NAME, assignment),
            )?;
            propagate::master_deleted(session, &pending.name, assignment)?;
        }
        (EntityKind::Student, Some(student)) => {
            roster::delete_student(session, &pending.name, student)?;
        }
        (EntityKind::Assignment | EntityKind::Student, None) => {
            return Err(GradebookError::EmptyName);
        }
    }
    Ok(())
}
