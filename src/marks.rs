use crate::assignment::{AssignmentMark, AssignmentRecord, GradingTable};
use crate::error::GradebookError;
use crate::model::sort_key;
use crate::roster;
use crate::session::Session;
use serde::Serialize;
use tracing::{debug, warn};

/// A student's assignment copies for one course, ready to be totalled.
#[derive(Debug, Clone)]
pub struct StudentMarks {
    course: String,
    student: String,
    records: Vec<AssignmentRecord>,
    table: GradingTable,
}

/// One line of the student page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRow {
    pub name: String,
    pub default_weighting: f64,
    pub effective_weighting: f64,
    pub adjusted: bool,
    pub mark: Option<f64>,
    pub has_copy: bool,
}

impl StudentMarks {
    pub fn load(session: &Session<'_>, course: &str, student: &str) -> Result<Self, GradebookError> {
        let table = GradingTable::load(session, course)?;
        let records = roster::student_assignments(session, course, student)?;
        Ok(Self::new(course, student, records, table))
    }

    pub fn new(course: &str, student: &str, records: Vec<AssignmentRecord>, table: GradingTable) -> Self {
        Self {
            course: course.to_string(),
            student: student.to_string(),
            records,
            table,
        }
    }

    pub fn records(&self) -> &[AssignmentRecord] {
        &self.records
    }

    /// Stable, case-insensitive sort by assignment name. [`find`](Self::find) relies on it.
    pub fn default_sort(&mut self) {
        self.records.sort_by_cached_key(|r| sort_key(&r.name));
    }

    /// Binary search by case-insensitive name over the sorted records.
    pub fn find(&self, name: &str) -> Option<usize> {
        let key = sort_key(name);
        let idx = self
            .records
            .partition_point(|r| sort_key(&r.name) < key);
        self.records
            .get(idx)
            .filter(|r| sort_key(&r.name) == key)
            .map(|_| idx)
    }

    /// The copy named `name`, case-insensitively. Call [`default_sort`](Self::default_sort) first.
    pub fn record(&self, name: &str) -> Option<&AssignmentRecord> {
        self.find(name).and_then(|idx| self.records.get(idx))
    }

    pub fn table(&self) -> &GradingTable {
        &self.table
    }

    /// Weighted average over every assignment whose mark is available.
    pub fn total_mark(&self) -> Result<f64, GradebookError> {
        self.reduce(|r| r.calculate(&self.table))
    }

    /// As [`total_mark`](Self::total_mark), but with teacher overrides where set.
    pub fn total_mark_adjusted(&self) -> Result<f64, GradebookError> {
        self.reduce(|r| r.calculate_adjusted(&self.table))
    }

    fn reduce<F>(&self, mark_of: F) -> Result<f64, GradebookError>
    where
        F: Fn(&AssignmentRecord) -> Result<AssignmentMark, GradebookError>,
    {
        let mut sum = 0.0_f64;
        let mut weight_sum = 0.0_f64;
        for r in &self.records {
            match mark_of(r) {
                Ok(m) => {
                    sum += m.percent * m.weighting;
                    weight_sum += m.weighting;
                }
                Err(e @ (GradebookError::MarkUnavailable | GradebookError::NotFound { .. })) => {
                    debug!(student = %self.student, assignment = %r.name, reason = %e, "assignment excluded from total");
                }
                Err(e) => return Err(e),
            }
        }
        if weight_sum == 0.0 {
            warn!(course = %self.course, student = %self.student, "no assignment contributed to the total");
            return Err(GradebookError::MarkUnavailable);
        }
        Ok(sum / weight_sum)
    }

    /// Every master of the course, sorted by name, with this student's standing on it.
    pub fn assignment_rows(&self) -> Vec<AssignmentRow> {
        let mut masters: Vec<&AssignmentRecord> = self.table.masters().iter().collect();
        masters.sort_by_cached_key(|m| sort_key(&m.name));

        masters
            .into_iter()
            .map(|master| {
                let copy = self.records.iter().find(|r| r.name == master.name);
                let mark = copy.and_then(|c| c.calculate(&self.table).ok());
                let effective_weighting = match (copy, mark) {
                    (Some(c), Some(_)) => c.effective_weighting(),
                    _ => 0.0,
                };
                AssignmentRow {
                    name: master.name.clone(),
                    default_weighting: master.weighting,
                    effective_weighting,
                    adjusted: copy
                        .map(|c| c.effective_weighting() != c.weighting)
                        .unwrap_or(false),
                    mark: mark.map(|m| m.percent),
                    has_copy: copy.is_some(),
                }
            })
            .collect()
    }
}
