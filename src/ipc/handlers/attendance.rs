use rusqlite::params_from_iter;
use serde_json::json;

use crate::db::DbPool;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_optional_str, get_required_date, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, AttendanceEntry, Hooks};

fn mark(
    pool: &DbPool,
    hooks: &Hooks,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let date = get_required_date(params, "date")?;
    let class_id = get_required_str(params, "classId")?;
    let marked_by = get_required_str(params, "markedBy")?;
    let Some(records_json) = params.get("records") else {
        return Err(HandlerErr::bad_params("missing records"));
    };
    let entries: Vec<AttendanceEntry> =
        serde_json::from_value(records_json.clone()).map_err(|e| HandlerErr {
            code: "bad_params",
            message: format!("invalid records: {}", e),
            details: None,
        })?;

    let rows = store::mark_attendance_batch(pool, hooks, &date, &class_id, &marked_by, &entries)?;
    let rows_json: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| serde_json::to_value(r).unwrap_or_else(|_| json!({})))
        .collect();
    Ok(json!({ "marked": rows_json.len(), "records": rows_json }))
}

fn report(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let date = get_optional_str(params, "date");
    let class_id = get_optional_str(params, "classId");

    let mut sql = "SELECT a.id, a.date, a.class_id, a.student_id, a.status, a.marked_by,
                u.display_name, s.roll_number
         FROM attendance a
         JOIN students s ON a.student_id = s.user_id
         JOIN users u ON s.user_id = u.id"
        .to_string();
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(d) = &date {
        clauses.push("a.date = ?");
        args.push(d.clone());
    }
    if let Some(c) = &class_id {
        clauses.push("a.class_id = ?");
        args.push(c.clone());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY a.date, u.display_name");

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "date": r.get::<_, String>(1)?,
                "classId": r.get::<_, String>(2)?,
                "studentId": r.get::<_, String>(3)?,
                "status": r.get::<_, String>(4)?,
                "markedBy": r.get::<_, String>(5)?,
                "studentName": r.get::<_, String>(6)?,
                "rollNumber": r.get::<_, Option<i64>>(7)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "attendance.mark" => {
            let Some((pool, hooks)) = state.open() else {
                return Some(err(&req.id, "no_workspace", "select a workspace first", None));
            };
            Some(match mark(pool, hooks, &req.params) {
                Ok(result) => ok(&req.id, result),
                Err(error) => error.response(&req.id),
            })
        }
        "attendance.report" => {
            let Some((pool, _)) = state.open() else {
                return Some(err(&req.id, "no_workspace", "select a workspace first", None));
            };
            Some(match report(pool, &req.params) {
                Ok(result) => ok(&req.id, result),
                Err(error) => error.response(&req.id),
            })
        }
        _ => None,
    }
}
