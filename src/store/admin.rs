use rusqlite::types::Value;
use rusqlite::{params_from_iter, TransactionBehavior};
use serde::Deserialize;

use super::error::StoreError;
use super::hooks::{Hooks, MutationEvent};
use crate::db::DbPool;

/// Batch-updatable entity kinds. Each variant carries a fixed table
/// descriptor, so an unsupported target is rejected before any I/O instead of
/// being interpolated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Students,
    Teachers,
    Attendance,
    Exams,
    Marks,
    Notices,
    Grievances,
    Classes,
}

pub struct TableDescriptor {
    pub table: &'static str,
    /// Students and teachers are addressed by their user id; everything else
    /// by the row's own id.
    pub id_column: &'static str,
    pub columns: &'static [&'static str],
}

impl Entity {
    pub fn parse(name: &str) -> Option<Entity> {
        match name {
            "students" => Some(Entity::Students),
            "teachers" => Some(Entity::Teachers),
            "attendance" => Some(Entity::Attendance),
            "exams" => Some(Entity::Exams),
            "marks" => Some(Entity::Marks),
            "notices" => Some(Entity::Notices),
            "grievances" => Some(Entity::Grievances),
            "classes" => Some(Entity::Classes),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().table
    }

    pub fn descriptor(&self) -> &'static TableDescriptor {
        match self {
            Entity::Students => &TableDescriptor {
                table: "students",
                id_column: "user_id",
                columns: &["class_id", "section", "roll_number"],
            },
            Entity::Teachers => &TableDescriptor {
                table: "teachers",
                id_column: "user_id",
                columns: &["employee_id", "subjects", "mpo_id"],
            },
            Entity::Attendance => &TableDescriptor {
                table: "attendance",
                id_column: "id",
                columns: &["date", "status"],
            },
            Entity::Exams => &TableDescriptor {
                table: "exams",
                id_column: "id",
                columns: &["name", "type", "max_marks", "start_date", "end_date"],
            },
            Entity::Marks => &TableDescriptor {
                table: "marks",
                id_column: "id",
                columns: &["subject", "marks_obtained", "grade", "remarks"],
            },
            Entity::Notices => &TableDescriptor {
                table: "notices",
                id_column: "id",
                columns: &["title_en", "title_bn", "content_en", "content_bn", "urgent"],
            },
            Entity::Grievances => &TableDescriptor {
                table: "grievances",
                id_column: "id",
                columns: &[
                    "title",
                    "description",
                    "category",
                    "status",
                    "assigned_to",
                    "resolution",
                ],
            },
            Entity::Classes => &TableDescriptor {
                table: "classes",
                id_column: "id",
                columns: &["name", "section", "room_number", "class_teacher_id"],
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityUpdate {
    pub id: String,
    pub data: serde_json::Map<String, serde_json::Value>,
}

/// Applies an ordered list of partial updates to one entity table inside a
/// single transaction. Unknown entities and unknown columns are rejected
/// before the transaction opens; the first failing UPDATE rolls back every
/// earlier one.
pub fn batch_update_entity(
    pool: &DbPool,
    hooks: &Hooks,
    entity_name: &str,
    updates: &[EntityUpdate],
) -> Result<usize, StoreError> {
    let entity = Entity::parse(entity_name)
        .ok_or_else(|| StoreError::UnknownEntity(entity_name.to_string()))?;
    let desc = entity.descriptor();

    if updates.is_empty() {
        return Err(StoreError::InvalidState("empty update batch".to_string()));
    }
    for update in updates {
        for key in update.data.keys() {
            if !desc.columns.contains(&key.as_str()) {
                return Err(StoreError::ValidationFailure(format!(
                    "unknown column '{}' for entity '{}'",
                    key, entity_name
                )));
            }
        }
    }

    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let mut updated = 0usize;
    for update in updates {
        if update.data.is_empty() {
            continue;
        }
        let set_clause = update
            .data
            .keys()
            .map(|k| format!("{} = ?", k))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            desc.table, set_clause, desc.id_column
        );

        let mut params: Vec<Value> = update
            .data
            .values()
            .map(json_to_sql)
            .collect::<Result<_, _>>()?;
        params.push(Value::Text(update.id.clone()));

        updated += tx.execute(&sql, params_from_iter(params))?;
    }
    tx.commit()?;

    hooks.emit(&MutationEvent::EntityUpdated {
        entity: entity_name.to_string(),
        updated,
    });
    Ok(updated)
}

/// JSON scalar -> SQL value. Arrays and objects are stored as their JSON
/// text, matching how list-valued fields (subjects, target roles) persist.
fn json_to_sql(v: &serde_json::Value) -> Result<Value, StoreError> {
    match v {
        serde_json::Value::Null => Ok(Value::Null),
        serde_json::Value::Bool(b) => Ok(Value::Integer(i64::from(*b))),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::Integer(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Value::Real(f))
            } else {
                Err(StoreError::ValidationFailure(format!(
                    "unsupported numeric value: {}",
                    n
                )))
            }
        }
        serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
        other => Ok(Value::Text(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_covers_every_supported_entity() {
        for name in [
            "students",
            "teachers",
            "attendance",
            "exams",
            "marks",
            "notices",
            "grievances",
            "classes",
        ] {
            let entity = Entity::parse(name).expect(name);
            assert_eq!(entity.descriptor().table, name);
        }
        assert!(Entity::parse("feedback").is_none());
        assert!(Entity::parse("Students").is_none());
    }

    #[test]
    fn students_and_teachers_are_keyed_by_user_id() {
        assert_eq!(Entity::Students.descriptor().id_column, "user_id");
        assert_eq!(Entity::Teachers.descriptor().id_column, "user_id");
        assert_eq!(Entity::Notices.descriptor().id_column, "id");
    }
}
