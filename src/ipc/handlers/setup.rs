use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_optional_str, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};

const USER_ROLES: [&str; 5] = ["HEADMASTER", "TEACHER", "STUDENT", "PARENT", "COMMITTEE"];

fn users_create(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let display_name = get_required_str(params, "displayName")?;
    let role = get_required_str(params, "role")?;
    if !USER_ROLES.contains(&role.as_str()) {
        return Err(HandlerErr {
            code: "bad_params",
            message: "unknown role".to_string(),
            details: Some(json!({ "role": role })),
        });
    }
    let phone = get_optional_str(params, "phone");

    let conn = pool.get()?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO users(id, email, display_name, role, phone, is_approved, created_at)
         VALUES(?, ?, ?, ?, ?, 1, ?)",
        (
            &id,
            &email,
            &display_name,
            &role,
            &phone,
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(json!({ "id": id, "email": email, "displayName": display_name, "role": role }))
}

fn classes_create(
    pool: &DbPool,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let section = get_required_str(params, "section")?;
    let room_number = get_optional_str(params, "roomNumber");
    let class_teacher_id = get_optional_str(params, "classTeacherId");

    let conn = pool.get()?;
    let id = Uuid::new_v4().to_string();
    conn.execute(
        "INSERT INTO classes(id, name, section, room_number, class_teacher_id)
         VALUES(?, ?, ?, ?, ?)",
        (&id, &name, &section, &room_number, &class_teacher_id),
    )?;
    Ok(json!({ "id": id, "name": name, "section": section }))
}

/// Creates the user row and the student row together; an enrolment that
/// fails halfway leaves nothing behind.
fn students_enroll(
    pool: &DbPool,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let display_name = get_required_str(params, "displayName")?;
    let class_id = get_required_str(params, "classId")?;
    let section = get_optional_str(params, "section");
    let roll_number = params.get("rollNumber").and_then(|v| v.as_i64());
    let phone = get_optional_str(params, "phone");

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let user_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO users(id, email, display_name, role, phone, is_approved, created_at)
         VALUES(?, ?, ?, 'STUDENT', ?, 1, ?)",
        (
            &user_id,
            &email,
            &display_name,
            &phone,
            Utc::now().to_rfc3339(),
        ),
    )?;
    tx.execute(
        "INSERT INTO students(user_id, class_id, section, roll_number)
         VALUES(?, ?, ?, ?)",
        (&user_id, &class_id, &section, &roll_number),
    )?;
    tx.commit()?;
    Ok(json!({
        "userId": user_id,
        "classId": class_id,
        "displayName": display_name
    }))
}

fn teachers_create(
    pool: &DbPool,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let email = get_required_str(params, "email")?;
    let display_name = get_required_str(params, "displayName")?;
    let employee_id = get_required_str(params, "employeeId")?;
    let subjects = params
        .get("subjects")
        .map(|v| v.to_string())
        .unwrap_or_else(|| "[]".to_string());
    let phone = get_optional_str(params, "phone");

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;
    let user_id = Uuid::new_v4().to_string();
    tx.execute(
        "INSERT INTO users(id, email, display_name, role, phone, is_approved, created_at)
         VALUES(?, ?, ?, 'TEACHER', ?, 1, ?)",
        (
            &user_id,
            &email,
            &display_name,
            &phone,
            Utc::now().to_rfc3339(),
        ),
    )?;
    tx.execute(
        "INSERT INTO teachers(user_id, employee_id, subjects) VALUES(?, ?, ?)",
        (&user_id, &employee_id, &subjects),
    )?;
    tx.commit()?;
    Ok(json!({ "userId": user_id, "employeeId": employee_id }))
}

fn parents_link(
    pool: &DbPool,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let parent_id = get_required_str(params, "parentId")?;
    let student_id = get_required_str(params, "studentId")?;

    let conn = pool.get()?;
    conn.execute(
        "INSERT OR IGNORE INTO parent_students(parent_id, student_id) VALUES(?, ?)",
        (&parent_id, &student_id),
    )?;
    Ok(json!({ "parentId": parent_id, "studentId": student_id }))
}

fn with_pool(
    state: &AppState,
    req: &Request,
    f: impl Fn(&DbPool, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some((pool, _)) = state.open() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(pool, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "users.create" => Some(with_pool(state, req, users_create)),
        "classes.create" => Some(with_pool(state, req, classes_create)),
        "students.enroll" => Some(with_pool(state, req, students_enroll)),
        "teachers.create" => Some(with_pool(state, req, teachers_create)),
        "parents.link" => Some(with_pool(state, req, parents_link)),
        _ => None,
    }
}
