use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::hooks::{Broadcast, MutationEvent, PostCommitHook};
use crate::db::DbPool;

/// Appends one `system_logs` row per mutation and streams it to the admin
/// room. Runs strictly post-commit on its own pooled connection, so a
/// logging failure can never roll back the mutation it describes.
pub struct AuditLogHook {
    pool: DbPool,
    transport: Option<Arc<dyn Broadcast>>,
}

impl AuditLogHook {
    pub fn new(pool: DbPool, transport: Option<Arc<dyn Broadcast>>) -> Self {
        Self { pool, transport }
    }

    fn append(
        &self,
        level: &str,
        message: &str,
        performed_by: Option<&str>,
        metadata: serde_json::Value,
    ) -> anyhow::Result<()> {
        let conn = self.pool.get()?;
        let id = Uuid::new_v4().to_string();
        let created_at = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO system_logs(id, level, message, performed_by, metadata, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            (
                &id,
                level,
                message,
                performed_by,
                metadata.to_string(),
                &created_at,
            ),
        )?;
        if let Some(transport) = &self.transport {
            transport.publish(
                "admin-room",
                "log-update",
                &json!({
                    "id": id,
                    "level": level,
                    "message": message,
                    "performed_by": performed_by,
                    "metadata": metadata,
                    "created_at": created_at,
                }),
            )?;
        }
        Ok(())
    }
}

impl PostCommitHook for AuditLogHook {
    fn after_commit(&self, event: &MutationEvent) -> anyhow::Result<()> {
        match event {
            MutationEvent::BookBorrowed { record, book_title } => self.append(
                "INFO",
                &format!("Book borrowed: {}", book_title),
                Some(&record.user_id),
                json!({ "book_id": record.book_id, "record_id": record.id }),
            ),
            MutationEvent::BookReturned { record } => self.append(
                "INFO",
                "Book returned.",
                Some(&record.user_id),
                json!({ "book_id": record.book_id, "record_id": record.id }),
            ),
            MutationEvent::AttendanceMarked {
                class_id,
                date,
                marked_by,
                rows,
            } => self.append(
                "INFO",
                &format!("Attendance marked for class {} on {}", class_id, date),
                Some(marked_by),
                json!({ "class_id": class_id, "date": date, "count": rows.len() }),
            ),
            MutationEvent::MarksEntered { exam_id, rows } => self.append(
                "INFO",
                &format!("Marks entered for exam {}", exam_id),
                None,
                json!({ "exam_id": exam_id, "count": rows.len() }),
            ),
            MutationEvent::EntityUpdated { entity, updated } => self.append(
                "INFO",
                &format!("Batch update applied to {}", entity),
                None,
                json!({ "entity": entity, "updated": updated }),
            ),
        }
    }
}

/// Pushes each committed attendance row to that student's registered
/// guardians.
pub struct ParentNotifyHook {
    transport: Arc<dyn Broadcast>,
}

impl ParentNotifyHook {
    pub fn new(transport: Arc<dyn Broadcast>) -> Self {
        Self { transport }
    }
}

impl PostCommitHook for ParentNotifyHook {
    fn after_commit(&self, event: &MutationEvent) -> anyhow::Result<()> {
        let MutationEvent::AttendanceMarked { rows, .. } = event else {
            return Ok(());
        };
        for marked in rows {
            let payload = serde_json::to_value(&marked.row)?;
            for parent_id in &marked.parent_ids {
                self.transport.publish(
                    &format!("parent-{}", parent_id),
                    "attendance-update",
                    &payload,
                )?;
            }
        }
        Ok(())
    }
}
