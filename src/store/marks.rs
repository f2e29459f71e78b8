use rusqlite::{OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StoreError;
use super::hooks::{Hooks, MutationEvent};
use crate::db::DbPool;
use crate::grade;

#[derive(Debug, Clone, Deserialize)]
pub struct MarkEntry {
    pub student_id: String,
    pub subject: String,
    pub marks_obtained: f64,
    #[serde(default)]
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkRow {
    pub id: String,
    pub exam_id: String,
    pub student_id: String,
    pub subject: String,
    pub marks_obtained: f64,
    pub grade: String,
    pub remarks: Option<String>,
}

/// Records marks for an exam in one transaction, deriving the letter grade
/// per entry from the fixed band table. Any bad entry rolls the whole batch
/// back.
pub fn enter_marks_batch(
    pool: &DbPool,
    hooks: &Hooks,
    exam_id: &str,
    entries: &[MarkEntry],
) -> Result<Vec<MarkRow>, StoreError> {
    if entries.is_empty() {
        return Err(StoreError::InvalidState("empty marks batch".to_string()));
    }
    for entry in entries {
        if !entry.marks_obtained.is_finite() || entry.marks_obtained < 0.0 {
            return Err(StoreError::ValidationFailure(format!(
                "marks_obtained must be a non-negative number, got {}",
                entry.marks_obtained
            )));
        }
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let exam_exists = tx
        .query_row("SELECT 1 FROM exams WHERE id = ?", [exam_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();
    if !exam_exists {
        return Err(StoreError::NotFound("exam"));
    }

    let mut rows = Vec::with_capacity(entries.len());
    for entry in entries {
        let row = MarkRow {
            id: Uuid::new_v4().to_string(),
            exam_id: exam_id.to_string(),
            student_id: entry.student_id.clone(),
            subject: entry.subject.clone(),
            marks_obtained: entry.marks_obtained,
            grade: grade::grade_for(entry.marks_obtained).to_string(),
            remarks: entry.remarks.clone(),
        };
        tx.execute(
            "INSERT INTO marks(id, exam_id, student_id, subject, marks_obtained, grade, remarks)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            (
                &row.id,
                &row.exam_id,
                &row.student_id,
                &row.subject,
                row.marks_obtained,
                &row.grade,
                &row.remarks,
            ),
        )?;
        rows.push(row);
    }
    tx.commit()?;

    hooks.emit(&MutationEvent::MarksEntered {
        exam_id: exam_id.to_string(),
        rows: rows.clone(),
    });
    Ok(rows)
}
