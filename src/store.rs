//! Document store boundary.
//!
//! The grading engine only ever talks to storage through [`DocumentStore`]. Documents
//! are JSON objects grouped into two collections per account: the course catalog
//! (courses, categories and their master assignments) and the student roster.
//! Every call is atomic on its own; sequences of calls are not.

use serde_json::{Map, Value};

pub type Document = Map<String, Value>;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to serialize document: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("stored document {id} is not a JSON object: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("field '{0}' is not an array")]
    NotAnArray(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Catalog,
    Roster,
}

impl Collection {
    pub fn as_str(self) -> &'static str {
        match self {
            Collection::Catalog => "catalog",
            Collection::Roster => "roster",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub account: String,
    pub collection: Collection,
}

impl Namespace {
    pub fn new(account: &str, collection: Collection) -> Self {
        Self {
            account: account.to_string(),
            collection,
        }
    }
}

/// How many matching documents an update or delete touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    One,
    Many,
}

#[derive(Debug, Clone, PartialEq)]
enum Clause {
    Eq(String, Value),
    Exists(String),
    ElemEq {
        array: String,
        field: String,
        value: Value,
    },
}

/// Conjunction of clauses; the empty query matches every document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    clauses: Vec<Clause>,
}

impl Query {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::Eq(field.to_string(), value.into()));
        self
    }

    pub fn exists(mut self, field: &str) -> Self {
        self.clauses.push(Clause::Exists(field.to_string()));
        self
    }

    /// Matches when some object element of `array` has `field == value`.
    pub fn elem_eq(mut self, array: &str, field: &str, value: impl Into<Value>) -> Self {
        self.clauses.push(Clause::ElemEq {
            array: array.to_string(),
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.clauses.iter().all(|c| match c {
            Clause::Eq(field, value) => doc.get(field) == Some(value),
            Clause::Exists(field) => doc.contains_key(field),
            Clause::ElemEq {
                array,
                field,
                value,
            } => doc
                .get(array)
                .and_then(|v| v.as_array())
                .map(|items| {
                    items
                        .iter()
                        .any(|item| item.get(field.as_str()) == Some(value))
                })
                .unwrap_or(false),
        })
    }
}

/// Target of a set/unset.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldPath {
    /// A top-level field of the document.
    Field(String),
    /// `field` on the first element of `array` whose `key` equals `value`.
    FirstMatch {
        array: String,
        key: String,
        value: Value,
        field: String,
    },
    /// `field` on every object element of `array`.
    EachElement { array: String, field: String },
}

impl FieldPath {
    pub fn field(name: &str) -> Self {
        FieldPath::Field(name.to_string())
    }

    pub fn first_match(array: &str, key: &str, value: impl Into<Value>, field: &str) -> Self {
        FieldPath::FirstMatch {
            array: array.to_string(),
            key: key.to_string(),
            value: value.into(),
            field: field.to_string(),
        }
    }

    pub fn each_element(array: &str, field: &str) -> Self {
        FieldPath::EachElement {
            array: array.to_string(),
            field: field.to_string(),
        }
    }

    /// Returns whether the document changed.
    pub fn set(&self, doc: &mut Document, value: &Value) -> bool {
        self.apply(doc, &mut |obj, field| {
            if obj.get(field) == Some(value) {
                return false;
            }
            obj.insert(field.to_string(), value.clone());
            true
        })
    }

    /// Returns whether the document changed.
    pub fn unset(&self, doc: &mut Document) -> bool {
        self.apply(doc, &mut |obj, field| obj.remove(field).is_some())
    }

    fn apply(&self, doc: &mut Document, f: &mut dyn FnMut(&mut Document, &str) -> bool) -> bool {
        match self {
            FieldPath::Field(field) => f(doc, field),
            FieldPath::FirstMatch {
                array,
                key,
                value,
                field,
            } => {
                let Some(items) = doc.get_mut(array).and_then(|v| v.as_array_mut()) else {
                    return false;
                };
                let Some(obj) = items
                    .iter_mut()
                    .filter_map(|item| item.as_object_mut())
                    .find(|obj| obj.get(key) == Some(value))
                else {
                    return false;
                };
                f(obj, field)
            }
            FieldPath::EachElement { array, field } => {
                let Some(items) = doc.get_mut(array).and_then(|v| v.as_array_mut()) else {
                    return false;
                };
                let mut changed = false;
                for obj in items.iter_mut().filter_map(|item| item.as_object_mut()) {
                    changed |= f(obj, field);
                }
                changed
            }
        }
    }
}

/// Appends to `array`, creating it when absent.
pub fn push_value(doc: &mut Document, array: &str, value: Value) -> Result<bool, StoreError> {
    let slot = doc
        .entry(array.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    let Some(items) = slot.as_array_mut() else {
        return Err(StoreError::NotAnArray(array.to_string()));
    };
    items.push(value);
    Ok(true)
}

/// Removes every object element of `array` matching `element`.
pub fn pull_matching(doc: &mut Document, array: &str, element: &Query) -> Result<bool, StoreError> {
    let Some(slot) = doc.get_mut(array) else {
        return Ok(false);
    };
    let Some(items) = slot.as_array_mut() else {
        return Err(StoreError::NotAnArray(array.to_string()));
    };
    let before = items.len();
    items.retain(|item| {
        item.as_object()
            .map(|obj| !element.matches(obj))
            .unwrap_or(true)
    });
    Ok(items.len() != before)
}

/// Generic document operations over a namespace.
///
/// `find` returns documents in insertion order. Update calls return the number of
/// documents that actually changed; `delete` returns the number removed.
pub trait DocumentStore {
    fn find(&self, ns: &Namespace, query: &Query) -> Result<Vec<Document>, StoreError>;

    fn find_one(&self, ns: &Namespace, query: &Query) -> Result<Option<Document>, StoreError> {
        Ok(self.find(ns, query)?.into_iter().next())
    }

    fn insert(&self, ns: &Namespace, doc: Document) -> Result<(), StoreError>;

    fn update_push(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        array: &str,
        value: Value,
    ) -> Result<usize, StoreError>;

    fn update_pull(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        array: &str,
        element: &Query,
    ) -> Result<usize, StoreError>;

    fn update_set(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        path: &FieldPath,
        value: Value,
    ) -> Result<usize, StoreError>;

    fn update_unset(
        &self,
        ns: &Namespace,
        query: &Query,
        scope: Scope,
        path: &FieldPath,
    ) -> Result<usize, StoreError>;

    fn delete(&self, ns: &Namespace, query: &Query, scope: Scope) -> Result<usize, StoreError>;
}
