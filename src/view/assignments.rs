//! Assignment list filtering.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::reducer::{Keyed, ListFilter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Draft,
    Published,
    Closed,
    Graded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub id: String,
    pub title: String,
    pub course: String,
    pub status: AssignmentStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub submission_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Keyed for AssignmentSummary {
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssignmentSortKey {
    #[default]
    DueDate,
    Title,
    CreatedAt,
    SubmissionCount,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssignmentFilter {
    pub status: Option<AssignmentStatus>,
    pub course: Option<String>,
    /// Case-insensitive match against title and course.
    pub search: String,
    pub sort_by: AssignmentSortKey,
    pub direction: SortDirection,
}

impl AssignmentFilter {
    pub fn status(mut self, status: AssignmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn course(mut self, course: impl Into<String>) -> Self {
        self.course = Some(course.into());
        self
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = text.into();
        self
    }

    pub fn sort(mut self, sort_by: AssignmentSortKey, direction: SortDirection) -> Self {
        self.sort_by = sort_by;
        self.direction = direction;
        self
    }
}

impl ListFilter<AssignmentSummary> for AssignmentFilter {
    fn matches(&self, item: &AssignmentSummary) -> bool {
        if self.status.is_some_and(|s| s != item.status) {
            return false;
        }
        if let Some(course) = &self.course
            && !course.eq_ignore_ascii_case(&item.course)
        {
            return false;
        }
        let needle = self.search.trim().to_lowercase();
        needle.is_empty()
            || item.title.to_lowercase().contains(&needle)
            || item.course.to_lowercase().contains(&needle)
    }

    /// Assignments without a due date sort last in either direction.
    fn compare(&self, a: &AssignmentSummary, b: &AssignmentSummary) -> Ordering {
        let directed = |ord: Ordering| match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        match self.sort_by {
            AssignmentSortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => directed(x.cmp(&y)),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            AssignmentSortKey::Title => {
                directed(a.title.to_lowercase().cmp(&b.title.to_lowercase()))
            }
            AssignmentSortKey::CreatedAt => directed(a.created_at.cmp(&b.created_at)),
            AssignmentSortKey::SubmissionCount => {
                directed(a.submission_count.cmp(&b.submission_count))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{ListAction, ListState};
    use chrono::TimeDelta;

    fn at(days: i64) -> DateTime<Utc> {
        "2026-09-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap() + TimeDelta::days(days)
    }

    fn assignment(
        id: &str,
        title: &str,
        course: &str,
        status: AssignmentStatus,
        due: Option<i64>,
    ) -> AssignmentSummary {
        AssignmentSummary {
            id: id.into(),
            title: title.into(),
            course: course.into(),
            status,
            due_date: due.map(at),
            submission_count: 0,
            created_at: at(0),
        }
    }

    fn sample() -> Vec<AssignmentSummary> {
        vec![
            assignment("a1", "Essay on Hamlet", "ENG101", AssignmentStatus::Published, Some(10)),
            assignment("a2", "Lab report", "CHEM200", AssignmentStatus::Draft, None),
            assignment("a3", "Sonnet analysis", "ENG101", AssignmentStatus::Published, Some(3)),
            assignment("a4", "Titration quiz", "CHEM200", AssignmentStatus::Closed, Some(1)),
        ]
    }

    fn ids(state: &ListState<AssignmentSummary, AssignmentFilter>) -> Vec<&str> {
        state.view().into_iter().map(|a| a.id.as_str()).collect()
    }

    #[test]
    fn test_default_sorts_by_due_date_missing_last() {
        let state = ListState::<_, AssignmentFilter>::new(sample());
        assert_eq!(ids(&state), vec!["a4", "a3", "a1", "a2"]);
    }

    #[test]
    fn test_descending_keeps_missing_last() {
        let state = ListState::new(sample()).reduce(ListAction::FiltersChanged(
            AssignmentFilter::default().sort(AssignmentSortKey::DueDate, SortDirection::Desc),
        ));
        assert_eq!(ids(&state), vec!["a1", "a3", "a4", "a2"]);
    }

    #[test]
    fn test_status_course_and_search() {
        let state = ListState::new(sample()).reduce(ListAction::FiltersChanged(
            AssignmentFilter::default()
                .status(AssignmentStatus::Published)
                .course("eng101"),
        ));
        assert_eq!(ids(&state), vec!["a3", "a1"]);

        let state = state.reduce(ListAction::FiltersChanged(
            AssignmentFilter::default().search("  HAMLET "),
        ));
        assert_eq!(ids(&state), vec!["a1"]);

        let state = state.reduce(ListAction::FiltersChanged(
            AssignmentFilter::default().search("chem"),
        ));
        assert_eq!(ids(&state), vec!["a4", "a2"]);
    }

    #[test]
    fn test_title_sort_case_insensitive() {
        let state = ListState::new(sample()).reduce(ListAction::FiltersChanged(
            AssignmentFilter::default().sort(AssignmentSortKey::Title, SortDirection::Asc),
        ));
        assert_eq!(ids(&state), vec!["a1", "a2", "a3", "a4"]);
    }

    #[test]
    fn test_server_update_keeps_filters() {
        let filter = AssignmentFilter::default().status(AssignmentStatus::Published);
        let state = ListState::new(sample()).reduce(ListAction::FiltersChanged(filter.clone()));

        let mut closed = sample()[0].clone();
        closed.status = AssignmentStatus::Closed;
        let state = state.reduce(ListAction::Upserted(closed));

        assert_eq!(state.filters, filter);
        assert_eq!(ids(&state), vec!["a3"]);
    }

    #[test]
    fn test_filter_deserializes_partial() {
        let filter: AssignmentFilter =
            serde_json::from_str(r#"{"status":"graded","sortBy":"submissionCount"}"#).unwrap();
        assert_eq!(filter.status, Some(AssignmentStatus::Graded));
        assert_eq!(filter.sort_by, AssignmentSortKey::SubmissionCount);
        assert_eq!(filter.direction, SortDirection::Asc);
        assert!(filter.search.is_empty());
    }
}
