use chrono::Utc;
use rusqlite::params_from_iter;
use serde_json::json;
use uuid::Uuid;

use crate::db::DbPool;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    get_optional_str, get_required_date, get_required_i64, get_required_str, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::{self, Hooks};

fn add_book(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let title = get_required_str(params, "title")?;
    let author = get_required_str(params, "author")?;
    let category = get_required_str(params, "category")?;
    let quantity = get_required_i64(params, "quantity")?;
    if quantity < 1 {
        return Err(HandlerErr {
            code: "bad_params",
            message: "quantity must be >= 1".to_string(),
            details: Some(json!({ "quantity": quantity })),
        });
    }
    let isbn = get_optional_str(params, "isbn");
    let cover_url = get_optional_str(params, "coverUrl");

    let conn = pool.get()?;
    let id = Uuid::new_v4().to_string();
    // A new title starts fully on the shelf.
    conn.execute(
        "INSERT INTO books(id, title, author, isbn, category, quantity, available, cover_url, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?)",
        (
            &id,
            &title,
            &author,
            &isbn,
            &category,
            quantity,
            quantity,
            &cover_url,
            Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(json!({
        "id": id,
        "title": title,
        "author": author,
        "category": category,
        "quantity": quantity,
        "available": quantity
    }))
}

fn list_books(pool: &DbPool, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let search = get_optional_str(params, "search");
    let category = get_optional_str(params, "category");

    let mut sql = "SELECT id, title, author, isbn, category, quantity, available, cover_url
         FROM books"
        .to_string();
    let mut clauses: Vec<&str> = Vec::new();
    let mut args: Vec<String> = Vec::new();
    if let Some(c) = &category {
        clauses.push("category = ?");
        args.push(c.clone());
    }
    if let Some(s) = &search {
        clauses.push("(title LIKE ? OR author LIKE ?)");
        let pattern = format!("%{}%", s);
        args.push(pattern.clone());
        args.push(pattern);
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY title");

    let conn = pool.get()?;
    let mut stmt = conn.prepare(&sql)?;
    let books = stmt
        .query_map(params_from_iter(args), |r| {
            Ok(json!({
                "id": r.get::<_, String>(0)?,
                "title": r.get::<_, String>(1)?,
                "author": r.get::<_, String>(2)?,
                "isbn": r.get::<_, Option<String>>(3)?,
                "category": r.get::<_, String>(4)?,
                "quantity": r.get::<_, i64>(5)?,
                "available": r.get::<_, i64>(6)?,
                "coverUrl": r.get::<_, Option<String>>(7)?,
            }))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(json!({ "books": books }))
}

fn borrow(
    pool: &DbPool,
    hooks: &Hooks,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let book_id = get_required_str(params, "bookId")?;
    let user_id = get_required_str(params, "userId")?;
    let due_date = get_required_date(params, "dueDate")?;

    let record = store::borrow_book(pool, hooks, &book_id, &user_id, &due_date)?;
    Ok(serde_json::to_value(record).unwrap_or_else(|_| json!({})))
}

fn give_back(
    pool: &DbPool,
    hooks: &Hooks,
    params: &serde_json::Value,
) -> Result<serde_json::Value, HandlerErr> {
    let record_id = get_required_str(params, "recordId")?;
    let record = store::return_book(pool, hooks, &record_id)?;
    Ok(serde_json::to_value(record).unwrap_or_else(|_| json!({})))
}

fn dispatch(
    state: &AppState,
    req: &Request,
    f: impl Fn(&DbPool, &Hooks, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
) -> serde_json::Value {
    let Some((pool, hooks)) = state.open() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(pool, hooks, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(error) => error.response(&req.id),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "library.addBook" => Some(dispatch(state, req, |p, _, params| add_book(p, params))),
        "library.listBooks" => Some(dispatch(state, req, |p, _, params| list_books(p, params))),
        "library.borrow" => Some(dispatch(state, req, borrow)),
        "library.return" => Some(dispatch(state, req, give_back)),
        _ => None,
    }
}
