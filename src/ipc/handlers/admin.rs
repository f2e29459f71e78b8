use chrono::Utc;
use serde_json::json;

use crate::db::DbPool;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Entity, EntityUpdate, Hooks};

fn list_entity(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let entity_name = get_required_str(params, "entity")?;
    let Some(entity) = Entity::parse(&entity_name) else {
        return Err(HandlerErr {
            code: "unknown_entity",
            message: format!("unknown entity: {}", entity_name),
            details: None,
        });
    };
    let desc = entity.descriptor();

    // Column set is fixed per entity, so assembling the SELECT from the
    // descriptor is safe.
    let mut cols: Vec<&str> = vec![desc.id_column];
    cols.extend_from_slice(desc.columns);
    let sql = format!("SELECT {} FROM {}", cols.join(", "), desc.table);

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            let mut obj = serde_json::Map::new();
            for (i, col) in cols.iter().enumerate() {
                let v: rusqlite::types::Value = r.get(i)?;
                obj.insert((*col).to_string(), sql_to_json(v));
            }
            Ok(serde_json::Value::Object(obj))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "rows": rows }))
}

fn sql_to_json(v: rusqlite::types::Value) -> serde_json::Value {
    match v {
        rusqlite::types::Value::Null => serde_json::Value::Null,
        rusqlite::types::Value::Integer(i) => json!(i),
        rusqlite::types::Value::Real(f) => json!(f),
        rusqlite::types::Value::Text(s) => json!(s),
        rusqlite::types::Value::Blob(_) => serde_json::Value::Null,
    }
}

fn parse_updates(params: &serde_json::Value) -> Result<Vec<EntityUpdate>, HandlerErr> {
    let Some(updates_json) = params.get("updates") else {
        return Err(HandlerErr::bad_params("missing updates"));
    };
    serde_json::from_value(updates_json.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("invalid updates: {}", e),
        details: None,
    })
}

fn batch_update(
    pool: &DbPool,
    hooks: &Hooks,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let entity_name = get_required_str(params, "entity")?;
    let updates = parse_updates(params)?;
    let updated = store::batch_update_entity(pool, hooks, &entity_name, &updates)?;
    Ok(json!({ "updated": updated, "count": updates.len() }))
}

fn update_one(
    pool: &DbPool,
    hooks: &Hooks,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let entity_name = get_required_str(params, "entity")?;
    let id = get_required_str(params, "id")?;
    let Some(serde_json::Value::Object(data)) = params.get("data") else {
        return Err(HandlerErr::bad_params("missing data"));
    };
    let update = EntityUpdate {
        id,
        data: data.clone(),
    };
    let updated = store::batch_update_entity(pool, hooks, &entity_name, &[update])?;
    Ok(json!({ "updated": updated }))
}

fn logs_recent(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let limit = params
        .get("limit")
        .and_then(|v| v.as_i64())
        .unwrap_or(50)
        .clamp(1, 500);

    let conn = pool.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, level, message, performed_by, metadata, created_at
         FROM system_logs ORDER BY created_at DESC LIMIT ?",
    )?;
    let rows = stmt
        .query_map([limit], |r| {
            let metadata_raw: Option<String> = r.get(4)?;
            let metadata = metadata_raw
                .and_then(|m| serde_json::from_str(&m).ok())
                .unwrap_or(serde_json::Value::Null);
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "level": r.get::<_, String>(1)?,
                "message": r.get::<_, String>(2)?,
                "performedBy": r.get::<_, Option<String>>(3)?,
                "metadata": metadata,
                "createdAt": r.get::<_, String>(5)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "logs": rows }))
}

fn stats(pool: &DbPool) -> Result<serde_json::Value, HandlerErr> {
    let conn = pool.get()?;
    let students: i64 = conn.query_row("SELECT COUNT(*) FROM students", [], |r| r.get(0))?;
    let teachers: i64 = conn.query_row("SELECT COUNT(*) FROM teachers", [], |r| r.get(0))?;
    let pending_grievances: i64 = conn.query_row(
        "SELECT COUNT(*) FROM grievances WHERE status = 'PENDING'",
        [],
        |r| r.get(0),
    )?;

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let mut stmt = conn.prepare(
        "SELECT status, COUNT(*) FROM attendance WHERE date = ? GROUP BY status",
    )?;
    let mut present = 0i64;
    let mut absent = 0i64;
    let mut late = 0i64;
    let counts = stmt
        .query_map([&today], |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (status, count) in counts {
        match status.as_str() {
            "PRESENT" => present = count,
            "ABSENT" => absent = count,
            "LATE" => late = count,
            _ => {}
        }
    }
    let marked = present + absent + late;
    let attendance_rate = if marked > 0 {
        format!("{:.1}%", (present as f64 / marked as f64) * 100.0)
    } else {
        "0.0%".to_string()
    };

    Ok(json!({
        "totalStudents": students,
        "totalTeachers": teachers,
        "pendingGrievances": pending_grievances,
        "attendanceRate": attendance_rate,
    }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let dispatch = |f: &dyn Fn(&DbPool, &Hooks, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>| {
        let Some((pool, hooks)) = state.open() else {
            return err(&req.id, "no_workspace", "select a workspace first", None);
        };
        match f(pool, hooks, &req.params) {
            Ok(result) => ok(&req.id, result),
            Err(error) => error.response(&req.id),
        }
    };

    match req.method.as_str() {
        "admin.list" => Some(dispatch(&|p, _, params| list_entity(p, params))),
        "admin.update" => Some(dispatch(&update_one)),
        "admin.batchUpdate" => Some(dispatch(&batch_update)),
        "admin.stats" => Some(dispatch(&|p, _, _| stats(p))),
        "logs.recent" => Some(dispatch(&|p, _, params| logs_recent(p, params))),
        _ => None,
    }
}
