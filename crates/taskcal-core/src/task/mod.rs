//! Task log rows and per-task grouping.
//!
//! The task log is an append-only sheet: every status change of a task is a
//! new row carrying the same `task_id`. Row order in the sheet is treated as
//! chronological, so the last row of a task is its current state. Reordering
//! rows outside taskcal silently changes which row is authoritative.

pub mod log;

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use log::{LogEntry, LogOperation};

/// Sheet row of the header line. Data rows start right below it.
pub const HEADER_ROW: usize = 1;

/// First row index that holds task data.
pub const FIRST_DATA_ROW: usize = HEADER_ROW + 1;

/// One row of the task sheet.
///
/// Column order in the sheet is `[subject, due_date, task_id, status, event_id]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRow {
    /// 1-based sheet row. Only valid until the next row deletion.
    pub row_index: usize,
    pub subject: String,
    pub due_date: Option<NaiveDate>,
    pub task_id: String,
    pub status: String,
    /// Calendar event id; empty when no event was created from this row.
    #[serde(default)]
    pub event_id: String,
}

impl TaskRow {
    /// Whether this row references a calendar event.
    pub fn has_event(&self) -> bool {
        !self.event_id.is_empty()
    }
}

/// All rows of one task, in sheet order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskGroup {
    pub task_id: String,
    rows: Vec<TaskRow>,
}

impl TaskGroup {
    fn new(task_id: String) -> Self {
        Self {
            task_id,
            rows: Vec::new(),
        }
    }

    pub fn rows(&self) -> &[TaskRow] {
        &self.rows
    }

    /// The authoritative row: the last one in sheet order, regardless of dates.
    pub fn latest(&self) -> &TaskRow {
        // Groups are only built by `group_rows`, which never yields an empty group.
        &self.rows[self.rows.len() - 1]
    }

    /// Rows that reference a calendar event, oldest first.
    pub fn existing_events(&self) -> Vec<&TaskRow> {
        self.rows.iter().filter(|r| r.has_event()).collect()
    }

    /// Rows without a calendar event, oldest first.
    pub fn without_event_id(&self) -> Vec<&TaskRow> {
        self.rows.iter().filter(|r| !r.has_event()).collect()
    }

    /// Whether the latest row carries the given completion status.
    pub fn is_complete(&self, complete_status: &str) -> bool {
        self.latest().status == complete_status
    }
}

/// Group rows by `task_id`.
///
/// Groups come out in order of first appearance; rows inside a group keep
/// their sheet order.
pub fn group_rows(rows: Vec<TaskRow>) -> Vec<TaskGroup> {
    let mut groups: Vec<TaskGroup> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for row in rows {
        let idx = match positions.get(&row.task_id) {
            Some(&idx) => idx,
            None => {
                groups.push(TaskGroup::new(row.task_id.clone()));
                positions.insert(row.task_id.clone(), groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[idx].rows.push(row);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(row_index: usize, task_id: &str, status: &str, event_id: &str) -> TaskRow {
        TaskRow {
            row_index,
            subject: format!("subject {row_index}"),
            due_date: None,
            task_id: task_id.to_string(),
            status: status.to_string(),
            event_id: event_id.to_string(),
        }
    }

    #[test]
    fn groups_keep_first_appearance_order() {
        let groups = group_rows(vec![
            row(2, "B", "open", ""),
            row(3, "A", "open", ""),
            row(4, "B", "open", "E1"),
        ]);

        let ids: Vec<_> = groups.iter().map(|g| g.task_id.as_str()).collect();
        assert_eq!(ids, vec!["B", "A"]);
        assert_eq!(groups[0].rows().len(), 2);
        assert_eq!(groups[0].latest().row_index, 4);
    }

    #[test]
    fn latest_is_last_row_even_with_earlier_due_date() {
        let mut first = row(2, "T", "open", "");
        first.due_date = NaiveDate::from_ymd_opt(2030, 1, 1);
        let mut second = row(3, "T", "open", "");
        second.due_date = NaiveDate::from_ymd_opt(2020, 1, 1);

        let groups = group_rows(vec![first, second]);
        assert_eq!(groups[0].latest().row_index, 3);
    }

    #[test]
    fn partitions_rows_by_event_id() {
        let groups = group_rows(vec![
            row(2, "T", "open", "E1"),
            row(3, "T", "open", ""),
            row(4, "T", "open", "E2"),
        ]);
        let group = &groups[0];

        let with: Vec<_> = group.existing_events().iter().map(|r| r.row_index).collect();
        let without: Vec<_> = group.without_event_id().iter().map(|r| r.row_index).collect();
        assert_eq!(with, vec![2, 4]);
        assert_eq!(without, vec![3]);
    }

    #[test]
    fn completion_is_judged_on_latest_row_only() {
        let groups = group_rows(vec![row(2, "T", "complete", ""), row(3, "T", "open", "")]);
        assert!(!groups[0].is_complete("complete"));

        let groups = group_rows(vec![row(2, "T", "open", ""), row(3, "T", "complete", "")]);
        assert!(groups[0].is_complete("complete"));
    }

    proptest! {
        #[test]
        fn grouping_preserves_every_row_in_order(ids in prop::collection::vec(0u8..5, 0..40)) {
            let rows: Vec<TaskRow> = ids
                .iter()
                .enumerate()
                .map(|(i, id)| row(i + FIRST_DATA_ROW, &format!("T{id}"), "open", ""))
                .collect();
            let groups = group_rows(rows.clone());

            let total: usize = groups.iter().map(|g| g.rows().len()).sum();
            prop_assert_eq!(total, rows.len());

            for group in &groups {
                prop_assert!(!group.rows().is_empty());
                let indices: Vec<usize> = group.rows().iter().map(|r| r.row_index).collect();
                let mut sorted = indices.clone();
                sorted.sort_unstable();
                prop_assert_eq!(indices, sorted);
                prop_assert!(group.rows().iter().all(|r| r.task_id == group.task_id));
            }
        }
    }
}
