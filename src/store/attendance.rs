use rusqlite::{OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StoreError;
use super::hooks::{Hooks, MarkedAttendance, MutationEvent};
use crate::db::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
}

impl AttendanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
            AttendanceStatus::Late => "LATE",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceEntry {
    pub student_id: String,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceRow {
    pub id: String,
    pub date: String,
    pub class_id: String,
    pub student_id: String,
    pub status: AttendanceStatus,
    pub marked_by: String,
}

/// Marks attendance for a class on one date, all-or-nothing. Any bad entry
/// (say, a student id that does not exist) rolls back every row in the batch.
/// Guardian ids are resolved inside the transaction; the notifications
/// themselves fire post-commit and are not retried.
pub fn mark_attendance_batch(
    pool: &DbPool,
    hooks: &Hooks,
    date: &str,
    class_id: &str,
    marked_by: &str,
    entries: &[AttendanceEntry],
) -> Result<Vec<AttendanceRow>, StoreError> {
    if entries.is_empty() {
        return Err(StoreError::InvalidState("empty attendance batch".to_string()));
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let class_exists = tx
        .query_row("SELECT 1 FROM classes WHERE id = ?", [class_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();
    if !class_exists {
        return Err(StoreError::NotFound("class"));
    }

    let mut marked = Vec::with_capacity(entries.len());
    {
        let mut parent_stmt =
            tx.prepare("SELECT parent_id FROM parent_students WHERE student_id = ?")?;
        for entry in entries {
            let row = AttendanceRow {
                id: Uuid::new_v4().to_string(),
                date: date.to_string(),
                class_id: class_id.to_string(),
                student_id: entry.student_id.clone(),
                status: entry.status,
                marked_by: marked_by.to_string(),
            };
            tx.execute(
                "INSERT INTO attendance(id, date, class_id, student_id, status, marked_by)
                 VALUES(?, ?, ?, ?, ?, ?)",
                (
                    &row.id,
                    &row.date,
                    &row.class_id,
                    &row.student_id,
                    row.status.as_str(),
                    &row.marked_by,
                ),
            )?;

            let parent_ids = parent_stmt
                .query_map([&entry.student_id], |r| r.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            marked.push(MarkedAttendance { row, parent_ids });
        }
    }
    tx.commit()?;

    hooks.emit(&MutationEvent::AttendanceMarked {
        class_id: class_id.to_string(),
        date: date.to_string(),
        marked_by: marked_by.to_string(),
        rows: marked.clone(),
    });
    Ok(marked.into_iter().map(|m| m.row).collect())
}
