//! SQLite-backed task sheet and audit log.
//!
//! Rows are kept in insertion order and addressed the way a spreadsheet
//! addresses them: row 1 is the (virtual) header, the first task sits in
//! row 2, and deleting a row moves every later row up by one.

use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::error::StoreError;
use crate::integrations::TaskSheet;
use crate::task::{LogEntry, LogOperation, TaskRow, FIRST_DATA_ROW};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Task sheet stored in SQLite.
pub struct SheetDb {
    conn: Connection,
}

impl SheetDb {
    /// Open (and create if needed) the sheet at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory sheet.
    pub fn open_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS task_rows (
                position  INTEGER PRIMARY KEY AUTOINCREMENT,
                subject   TEXT NOT NULL DEFAULT '',
                due_date  TEXT NOT NULL DEFAULT '',
                task_id   TEXT NOT NULL,
                status    TEXT NOT NULL DEFAULT '',
                event_id  TEXT NOT NULL DEFAULT ''
            );

            CREATE TABLE IF NOT EXISTS task_log (
                id         INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp  TEXT NOT NULL,
                operation  TEXT NOT NULL,
                task_id    TEXT NOT NULL,
                event_id   TEXT NOT NULL DEFAULT '',
                error      TEXT NOT NULL DEFAULT ''
            );

            CREATE INDEX IF NOT EXISTS idx_task_log_task_id ON task_log(task_id);",
        )?;
        Ok(())
    }

    /// Append a task row at the bottom of the sheet. Returns its row index.
    pub fn append_row(
        &self,
        subject: &str,
        due_date: Option<NaiveDate>,
        task_id: &str,
        status: &str,
        event_id: &str,
    ) -> Result<usize, StoreError> {
        let due = due_date
            .map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default();
        self.conn.execute(
            "INSERT INTO task_rows (subject, due_date, task_id, status, event_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![subject, due, task_id, status, event_id],
        )?;
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM task_rows", [], |row| row.get(0))?;
        Ok(count as usize + FIRST_DATA_ROW - 1)
    }

    /// Most recent audit log entries, newest last.
    pub fn log_entries(&self, limit: Option<usize>) -> Result<Vec<LogEntry>, StoreError> {
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = self.conn.prepare(
            "SELECT timestamp, operation, task_id, event_id, error FROM (
                SELECT id, timestamp, operation, task_id, event_id, error
                FROM task_log ORDER BY id DESC LIMIT ?1
             ) ORDER BY id ASC",
        )?;
        let rows = stmt.query_map(params![limit], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for (i, row) in rows.enumerate() {
            let (timestamp, operation, task_id, event_id, error) = row?;
            let timestamp = DateTime::parse_from_rfc3339(&timestamp)
                .map_err(|_| StoreError::InvalidCell {
                    row: i + 1,
                    column: "timestamp",
                    value: timestamp.clone(),
                })?
                .with_timezone(&Utc);
            let operation = operation
                .parse::<LogOperation>()
                .map_err(|_| StoreError::InvalidCell {
                    row: i + 1,
                    column: "operation",
                    value: operation.clone(),
                })?;
            entries.push(LogEntry {
                timestamp,
                operation,
                task_id,
                event_id,
                error,
            });
        }
        Ok(entries)
    }

    /// Storage key of the row currently shown at `row_index`.
    fn position_of(&self, row_index: usize) -> Result<i64, StoreError> {
        if row_index < FIRST_DATA_ROW {
            return Err(StoreError::RowOutOfRange(row_index));
        }
        let offset = (row_index - FIRST_DATA_ROW) as i64;
        self.conn
            .query_row(
                "SELECT position FROM task_rows ORDER BY position LIMIT 1 OFFSET ?1",
                params![offset],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::RowOutOfRange(row_index))
    }
}

impl TaskSheet for SheetDb {
    fn read_rows(&mut self) -> Result<Vec<TaskRow>, StoreError> {
        let mut stmt = self.conn.prepare(
            "SELECT subject, due_date, task_id, status, event_id
             FROM task_rows ORDER BY position",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for (i, row) in rows.enumerate() {
            let (subject, due, task_id, status, event_id) = row?;
            let row_index = i + FIRST_DATA_ROW;
            let due_date = if due.trim().is_empty() {
                None
            } else {
                Some(
                    NaiveDate::parse_from_str(due.trim(), DATE_FORMAT).map_err(|_| {
                        StoreError::InvalidCell {
                            row: row_index,
                            column: "due_date",
                            value: due.clone(),
                        }
                    })?,
                )
            };
            out.push(TaskRow {
                row_index,
                subject,
                due_date,
                task_id,
                status,
                event_id,
            });
        }
        Ok(out)
    }

    fn write_event_id(&mut self, row_index: usize, event_id: &str) -> Result<(), StoreError> {
        let position = self.position_of(row_index)?;
        self.conn.execute(
            "UPDATE task_rows SET event_id = ?1 WHERE position = ?2",
            params![event_id, position],
        )?;
        Ok(())
    }

    fn delete_row(&mut self, row_index: usize) -> Result<(), StoreError> {
        let position = self.position_of(row_index)?;
        self.conn.execute(
            "DELETE FROM task_rows WHERE position = ?1",
            params![position],
        )?;
        Ok(())
    }

    fn append_log(&mut self, entry: &LogEntry) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO task_log (timestamp, operation, task_id, event_id, error)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                entry.timestamp.to_rfc3339(),
                entry.operation.as_str(),
                entry.task_id,
                entry.event_id,
                entry.error,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> SheetDb {
        let db = SheetDb::open_memory().unwrap();
        db.append_row("a", None, "T1", "open", "").unwrap();
        db.append_row("b", NaiveDate::from_ymd_opt(2026, 11, 1), "T2", "open", "E2")
            .unwrap();
        db.append_row("c", None, "T1", "complete", "").unwrap();
        db
    }

    #[test]
    fn rows_start_below_header() {
        let mut db = seeded();
        let rows = db.read_rows().unwrap();
        let indices: Vec<_> = rows.iter().map(|r| r.row_index).collect();
        assert_eq!(indices, vec![2, 3, 4]);
        assert_eq!(rows[1].due_date, NaiveDate::from_ymd_opt(2026, 11, 1));
        assert_eq!(rows[1].event_id, "E2");
        assert_eq!(rows[0].due_date, None);
    }

    #[test]
    fn append_returns_sheet_row() {
        let db = SheetDb::open_memory().unwrap();
        assert_eq!(db.append_row("a", None, "T1", "open", "").unwrap(), 2);
        assert_eq!(db.append_row("b", None, "T1", "open", "").unwrap(), 3);
    }

    #[test]
    fn deleting_shifts_later_rows_up() {
        let mut db = seeded();
        db.delete_row(2).unwrap();

        let rows = db.read_rows().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, "b");
        assert_eq!(rows[0].row_index, 2);

        // Row 4 no longer exists after the shift.
        assert!(matches!(db.delete_row(4), Err(StoreError::RowOutOfRange(4))));
    }

    #[test]
    fn descending_deletes_hit_the_intended_rows() {
        let mut db = seeded();
        for row in [4, 2] {
            db.delete_row(row).unwrap();
        }
        let subjects: Vec<_> = db.read_rows().unwrap().into_iter().map(|r| r.subject).collect();
        assert_eq!(subjects, vec!["b"]);
    }

    #[test]
    fn write_event_id_targets_one_cell() {
        let mut db = seeded();
        db.write_event_id(4, "NEW").unwrap();
        db.write_event_id(3, "").unwrap();

        let rows = db.read_rows().unwrap();
        assert_eq!(rows[2].event_id, "NEW");
        assert_eq!(rows[1].event_id, "");
        assert!(matches!(
            db.write_event_id(1, "x"),
            Err(StoreError::RowOutOfRange(1))
        ));
    }

    #[test]
    fn invalid_due_date_is_reported_with_row() {
        let mut db = SheetDb::open_memory().unwrap();
        db.conn
            .execute(
                "INSERT INTO task_rows (subject, due_date, task_id) VALUES ('x', 'soon', 'T')",
                [],
            )
            .unwrap();
        match db.read_rows() {
            Err(StoreError::InvalidCell { row, column, .. }) => {
                assert_eq!(row, 2);
                assert_eq!(column, "due_date");
            }
            other => panic!("expected invalid cell, got {other:?}"),
        }
    }

    #[test]
    fn log_is_append_only_and_tail_limited() {
        let mut db = SheetDb::open_memory().unwrap();
        db.append_log(&LogEntry::new(LogOperation::Created, "T1", "E1")).unwrap();
        db.append_log(&LogEntry::new(LogOperation::Updated, "T1", "E1")).unwrap();
        db.append_log(&LogEntry::error("T2", "", "calendar down")).unwrap();

        let all = db.log_entries(None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].operation, LogOperation::Created);

        let tail = db.log_entries(Some(2)).unwrap();
        let ops: Vec<_> = tail.iter().map(|e| e.operation).collect();
        assert_eq!(ops, vec![LogOperation::Updated, LogOperation::Error]);
        assert_eq!(tail[1].error, "calendar down");
    }

    #[test]
    fn reopening_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.db");
        {
            let db = SheetDb::open(&path).unwrap();
            db.append_row("persisted", None, "T1", "open", "").unwrap();
        }
        let mut db = SheetDb::open(&path).unwrap();
        assert_eq!(db.read_rows().unwrap()[0].subject, "persisted");
    }
}
