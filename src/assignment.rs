use crate::catalog;
use crate::error::GradebookError;
use crate::model::{
    doc_str, is_reserved, is_reserved_key, parse_entry, same_name, Category, EntityKind,
    ADJUSTED_WEIGHTING, ASSIGNMENT_NAME, WEIGHTING,
};
use crate::propagate;
use crate::roster;
use crate::session::Session;
use crate::store::Document;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Which weighting an assignment contributes with when marks are totalled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "mode", content = "weighting", rename_all = "lowercase")]
pub enum WeightingMode {
    Default,
    Adjusted(f64),
}

/// One assignment element: a course's master definition or a student's copy.
///
/// On a master, `categories` holds the maximum attainable score per category (0 means
/// the category is not used). On a student copy it holds the achieved scores, where
/// `None` marks a category that has not been graded yet.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRecord {
    pub name: String,
    pub weighting: f64,
    pub mode: WeightingMode,
    pub categories: BTreeMap<String, Option<f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentMark {
    pub percent: f64,
    pub weighting: f64,
}

impl AssignmentRecord {
    pub fn new(name: &str, weighting: f64) -> Self {
        Self {
            name: name.to_string(),
            weighting,
            mode: WeightingMode::Default,
            categories: BTreeMap::new(),
        }
    }

    pub fn from_document(doc: &Document) -> Option<Self> {
        let name = doc_str(doc, ASSIGNMENT_NAME)?.to_string();
        let weighting = doc.get(WEIGHTING).and_then(Value::as_f64).unwrap_or(0.0);
        let mode = doc
            .get(ADJUSTED_WEIGHTING)
            .and_then(Value::as_f64)
            .map(WeightingMode::Adjusted)
            .unwrap_or(WeightingMode::Default);
        let categories = doc
            .iter()
            .filter(|(k, _)| !is_reserved_key(k))
            .map(|(k, v)| (k.clone(), v.as_f64()))
            .collect();
        Some(Self {
            name,
            weighting,
            mode,
            categories,
        })
    }

    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        doc.insert(ASSIGNMENT_NAME.to_string(), Value::from(self.name.clone()));
        doc.insert(WEIGHTING.to_string(), Value::from(self.weighting));
        if let WeightingMode::Adjusted(w) = self.mode {
            doc.insert(ADJUSTED_WEIGHTING.to_string(), Value::from(w));
        }
        for (cat, score) in &self.categories {
            let v = score.map(Value::from).unwrap_or(Value::Null);
            doc.insert(cat.clone(), v);
        }
        doc
    }

    pub fn effective_weighting(&self) -> f64 {
        match self.mode {
            WeightingMode::Default => self.weighting,
            WeightingMode::Adjusted(w) => w,
        }
    }

    /// Percentage against the course's master of the same name, paired with the
    /// master's weighting.
    pub fn calculate(&self, table: &GradingTable) -> Result<AssignmentMark, GradebookError> {
        let Some(master) = table.master(&self.name) else {
            return Err(GradebookError::not_found(EntityKind::Assignment, &self.name));
        };
        let percent = weighted_percentage(&master.categories, &table.category_weights, &self.categories)
            .ok_or(GradebookError::MarkUnavailable)?;
        Ok(AssignmentMark {
            percent,
            weighting: master.weighting,
        })
    }

    /// Same percentage as [`calculate`](Self::calculate), weighted by the teacher's
    /// override when there is one.
    pub fn calculate_adjusted(&self, table: &GradingTable) -> Result<AssignmentMark, GradebookError> {
        let mark = self.calculate(table)?;
        match self.mode {
            WeightingMode::Default => Ok(mark),
            WeightingMode::Adjusted(w) => Ok(AssignmentMark {
                percent: mark.percent,
                weighting: w,
            }),
        }
    }
}

/// Category-weighted percentage of `scores` out of `maxima`.
///
/// Categories with a zero or missing maximum, no recorded score, or no account-level
/// weighting are skipped. `None` when nothing contributed any weight.
pub fn weighted_percentage(
    maxima: &BTreeMap<String, Option<f64>>,
    weights: &HashMap<String, f64>,
    scores: &BTreeMap<String, Option<f64>>,
) -> Option<f64> {
    let mut mark = 0.0_f64;
    let mut weight_sum = 0.0_f64;
    for (cat, max) in maxima {
        let Some(max) = max.filter(|m| *m != 0.0) else {
            continue;
        };
        let Some(score) = scores.get(cat).copied().flatten() else {
            continue;
        };
        let Some(weight) = weights.get(cat).copied() else {
            continue;
        };
        mark += weight * (score / max) * 100.0;
        weight_sum += weight;
    }
    if weight_sum == 0.0 {
        return None;
    }
    Some(mark / weight_sum)
}

/// Everything needed to mark a course's assignments: its masters and the account's
/// category weightings.
#[derive(Debug, Clone, Default)]
pub struct GradingTable {
    masters: Vec<AssignmentRecord>,
    category_weights: HashMap<String, f64>,
}

impl GradingTable {
    pub fn new(masters: Vec<AssignmentRecord>, categories: &[Category]) -> Self {
        Self {
            masters,
            category_weights: categories
                .iter()
                .map(|c| (c.name.clone(), c.weighting))
                .collect(),
        }
    }

    pub fn load(session: &Session<'_>, course: &str) -> Result<Self, GradebookError> {
        let masters = catalog::master_assignments(session, course)?;
        let categories = catalog::list_categories(session)?;
        debug!(
            course,
            masters = masters.len(),
            categories = categories.len(),
            "loaded grading table"
        );
        Ok(Self::new(masters, &categories))
    }

    pub fn master(&self, name: &str) -> Option<&AssignmentRecord> {
        self.masters.iter().find(|m| m.name == name)
    }

    pub fn masters(&self) -> &[AssignmentRecord] {
        &self.masters
    }
}

/// Raw values a teacher typed into an assignment form.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentForm {
    pub assignment_name: String,
    #[serde(default)]
    pub weighting: String,
    #[serde(default)]
    pub adjusted_weighting: Option<String>,
    #[serde(default)]
    pub scores: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTarget<'a> {
    /// The named student's copy.
    Student(&'a str),
    /// The course's master definition.
    Course,
}

impl AssignmentForm {
    /// Parses every entry. Nothing has been written when this fails.
    fn validate(&self, target: SaveTarget<'_>) -> Result<ParsedForm, GradebookError> {
        let name = self.assignment_name.trim();
        if name.is_empty() {
            return Err(GradebookError::EmptyName);
        }

        let mut categories = BTreeMap::new();
        for (cat, raw) in &self.scores {
            if is_reserved_key(cat) {
                return Err(GradebookError::ReservedName(cat.clone()));
            }
            categories.insert(cat.clone(), Some(parse_entry(cat, raw)?));
        }

        let weighting = match target {
            SaveTarget::Course => Some(parse_entry("Weighting", &self.weighting)?),
            // A student form only echoes the master's weighting back.
            SaveTarget::Student(_) if self.weighting.trim().is_empty() => None,
            SaveTarget::Student(_) => Some(parse_entry("Weighting", &self.weighting)?),
        };
        let adjusted = match (&self.adjusted_weighting, target) {
            (Some(raw), SaveTarget::Student(_)) if !raw.trim().is_empty() => {
                Some(parse_entry("Adjusted weighting", raw)?)
            }
            _ => None,
        };

        Ok(ParsedForm {
            name: name.to_string(),
            weighting,
            adjusted,
            categories,
        })
    }

    pub fn save(
        &self,
        session: &Session<'_>,
        course: &str,
        target: SaveTarget<'_>,
    ) -> Result<AssignmentRecord, GradebookError> {
        let parsed = self.validate(target)?;
        match target {
            SaveTarget::Student(student) => {
                let Some(master) = catalog::find_master(session, course, &parsed.name)? else {
                    return Err(GradebookError::not_found(EntityKind::Assignment, &parsed.name));
                };
                let mode = match parsed.adjusted {
                    Some(w) if w != master.weighting => WeightingMode::Adjusted(w),
                    _ => WeightingMode::Default,
                };
                let record = AssignmentRecord {
                    name: parsed.name,
                    weighting: master.weighting,
                    mode,
                    categories: parsed.categories,
                };
                roster::replace_assignment(session, course, student, &record)?;
                info!(course, student, assignment = %record.name, "saved student assignment");
                Ok(record)
            }
            SaveTarget::Course => {
                if is_reserved(&parsed.name) {
                    return Err(GradebookError::ReservedName(parsed.name));
                }
                // Masters are only ever created by `create_assignment`; a course save
                // edits the existing one under its stored name.
                let Some(stored) = catalog::master_assignments(session, course)?
                    .into_iter()
                    .map(|m| m.name)
                    .find(|n| same_name(n, &parsed.name))
                else {
                    return Err(GradebookError::not_found(EntityKind::Assignment, &parsed.name));
                };
                let record = AssignmentRecord {
                    name: stored,
                    weighting: parsed.weighting.unwrap_or(0.0),
                    mode: WeightingMode::Default,
                    categories: parsed.categories,
                };
                catalog::replace_master(session, course, &record)?;
                propagate::master_weighting_changed(session, course, &record.name, record.weighting)?;
                info!(course, assignment = %record.name, weighting = record.weighting, "saved master assignment");
                Ok(record)
            }
        }
    }
}

struct ParsedForm {
    name: String,
    weighting: Option<f64>,
    adjusted: Option<f64>,
    categories: BTreeMap<String, Option<f64>>,
}
