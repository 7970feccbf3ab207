//! Document field names and the small typed views the engine reads out of them.

use crate::error::GradebookError;
use crate::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub const COURSE_NAME: &str = "course name";
pub const STUDENT_NAME: &str = "student name";
pub const CATEGORY: &str = "category";
pub const ASSIGNMENTS: &str = "assignments";
pub const ASSIGNMENT_NAME: &str = "assignment name";
pub const WEIGHTING: &str = "weighting";
pub const ADJUSTED_WEIGHTING: &str = "adjusted weighting";

/// Keys an assignment element already uses for itself; category names share the same
/// object so they may not collide with these.
pub const RESERVED_NAMES: [&str; 3] = [ASSIGNMENT_NAME, WEIGHTING, ADJUSTED_WEIGHTING];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Course,
    Category,
    Assignment,
    Student,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntityKind::Course => "Course",
            EntityKind::Category => "Category",
            EntityKind::Assignment => "Assignment",
            EntityKind::Student => "Student",
        };
        f.write_str(s)
    }
}

pub fn is_reserved(name: &str) -> bool {
    let lower = name.to_lowercase();
    RESERVED_NAMES.iter().any(|r| *r == lower)
}

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_NAMES.contains(&key)
}

pub fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

pub fn sort_key(name: &str) -> String {
    name.to_lowercase()
}

/// Parses one entered number: surrounding whitespace is ignored, negatives and
/// anything that is not a finite number are rejected.
pub fn parse_entry(field: &str, raw: &str) -> Result<f64, GradebookError> {
    let v: f64 = raw
        .trim()
        .parse()
        .map_err(|_| GradebookError::NotANumber {
            field: field.to_string(),
        })?;
    if !v.is_finite() {
        return Err(GradebookError::NotANumber {
            field: field.to_string(),
        });
    }
    if v < 0.0 {
        return Err(GradebookError::NegativeEntry {
            field: field.to_string(),
        });
    }
    Ok(v)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub name: String,
    pub weighting: f64,
}

impl Category {
    pub fn from_document(doc: &Document) -> Option<Self> {
        Some(Self {
            name: doc.get(CATEGORY)?.as_str()?.to_string(),
            weighting: doc.get(WEIGHTING).and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(CATEGORY.to_string(), Value::from(self.name.clone()));
        doc.insert(WEIGHTING.to_string(), Value::from(self.weighting));
        doc
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub name: String,
    pub student_count: usize,
    pub assignment_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentSummary {
    pub name: String,
    pub course_name: String,
    pub assignment_count: usize,
}

pub fn doc_str<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    doc.get(key).and_then(Value::as_str)
}

pub fn doc_array_len(doc: &Document, key: &str) -> usize {
    doc.get(key)
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}
