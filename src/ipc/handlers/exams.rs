use rusqlite::params_from_iter;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_optional_str, get_required_i64, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Hooks, MarkEntry};

fn create(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let class_id = get_required_str(params, "classId")?;
    let exam_type = get_required_str(params, "type")?;
    let max_marks = get_required_i64(params, "maxMarks")?;
    if max_marks < 1 {
        return Err(HandlerErr::bad_params("maxMarks must be >= 1"));
    }
    let start_date = get_optional_str(params, "startDate");
    let end_date = get_optional_str(params, "endDate");
    let created_by = get_optional_str(params, "createdBy");

    let conn = pool.get()?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO exams(id, name, class_id, type, max_marks, start_date, end_date, created_by)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &name,
            &class_id,
            &exam_type,
            max_marks,
            &start_date,
            &end_date,
            &created_by,
        ),
    )?;
    Ok(json!({ "id": id, "name": name, "classId": class_id, "maxMarks": max_marks }))
}

fn enter_marks(
    pool: &DbPool,
    hooks: &Hooks,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_required_str(params, "examId")?;
    let Some(marks_json) = params.get("marks") else {
        return Err(HandlerErr::bad_params("missing marks"));
    };
    let entries: Vec<MarkEntry> =
        serde_json::from_value(marks_json.clone()).map_err(|e| HandlerErr {
            code: "bad_params",
            message: format!("invalid marks: {}", e),
            details: None,
        })?;

    let rows = store::enter_marks_batch(pool, hooks, &exam_id, &entries)?;
    let rows_json: Vec<serde_json::Value> = rows
        .iter()
        .map(|r| serde_json::to_value(r).unwrap_or_else(|_| json!({})))
        .collect();
    Ok(json!({ "entered": rows_json.len(), "marks": rows_json }))
}

fn results(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let exam_id = get_optional_str(params, "examId");
    let student_id = get_optional_str(params, "studentId");

    let mut sql = "SELECT m.id, m.exam_id, m.student_id, m.subject, m.marks_obtained, m.grade,
                m.remarks, e.name, u.display_name
         FROM marks m
         JOIN exams e ON m.exam_id = e.id
         JOIN students s ON m.student_id = s.user_id
         JOIN users u ON s.user_id = u.id"
        .to_string();
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(e) = &exam_id {
        clauses.push("m.exam_id = ?");
        args.push(e.clone());
    }
    if let Some(s) = &student_id {
        clauses.push("m.student_id = ?");
        args.push(s.clone());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY u.display_name, m.subject");

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params_from_iter(args), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "examId": r.get::<_, String>(1)?,
                "studentId": r.get::<_, String>(2)?,
                "subject": r.get::<_, String>(3)?,
                "marksObtained": r.get::<_, f64>(4)?,
                "grade": r.get::<_, String>(5)?,
                "remarks": r.get::<_, Option<String>>(6)?,
                "examName": r.get::<_, String>(7)?,
                "studentName": r.get::<_, String>(8)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "results": rows }))
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
        "exams.create" => Some(dispatch(&|p, _, params| create(p, params))),
        "exams.enterMarks" => Some(dispatch(&enter_marks)),
        "exams.results" => Some(dispatch(&|p, _, params| results(p, params))),
        _ => None,
    }
}
