use chrono::Utc;
use rusqlite::{OptionalExtension, TransactionBehavior};
use serde::Serialize;
use uuid::Uuid;

use super::error::StoreError;
use super::hooks::{Hooks, MutationEvent};
use crate::db::DbPool;

#[derive(Debug, Clone, Serialize)]
pub struct BorrowRecord {
    pub id: String,
    pub book_id: String,
    pub user_id: String,
    pub borrow_date: String,
    pub due_date: String,
    pub return_date: Option<String>,
    pub status: String,
}

/// Lends one copy of a book. The IMMEDIATE transaction is taken before the
/// availability read, so concurrent borrow attempts on the same book are
/// totally ordered: at most `quantity` records can be BORROWED at once.
pub fn borrow_book(
    pool: &DbPool,
    hooks: &Hooks,
    book_id: &str,
    user_id: &str,
    due_date: &str,
) -> Result<BorrowRecord, StoreError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let book: Option<(String, i64)> = tx
        .query_row(
            "SELECT title, available FROM books WHERE id = ?",
            [book_id],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )
        .optional()?;
    let Some((book_title, available)) = book else {
        return Err(StoreError::NotFound("book"));
    };
    if available <= 0 {
        return Err(StoreError::OutOfStock);
    }

    let record = BorrowRecord {
        id: Uuid::new_v4().to_string(),
        book_id: book_id.to_string(),
        user_id: user_id.to_string(),
        borrow_date: Utc::now().to_rfc3339(),
        due_date: due_date.to_string(),
        return_date: None,
        status: "BORROWED".to_string(),
    };
    tx.execute(
        "INSERT INTO borrow_records(id, book_id, user_id, borrow_date, due_date, return_date, status)
         VALUES(?, ?, ?, ?, ?, NULL, ?)",
        (
            &record.id,
            &record.book_id,
            &record.user_id,
            &record.borrow_date,
            &record.due_date,
            &record.status,
        ),
    )?;
    tx.execute(
        "UPDATE books SET available = available - 1 WHERE id = ?",
        [book_id],
    )?;
    tx.commit()?;

    hooks.emit(&MutationEvent::BookBorrowed {
        record: record.clone(),
        book_title,
    });
    Ok(record)
}

/// Closes a borrow record. A record transitions BORROWED -> RETURNED exactly
/// once; the second attempt fails with `InvalidState` and leaves the book row
/// untouched. `available` is capped at `quantity` on the way back up.
pub fn return_book(pool: &DbPool, hooks: &Hooks, record_id: &str) -> Result<BorrowRecord, StoreError> {
    let mut conn = pool.get()?;
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let row: Option<(String, String, String, String, Option<String>)> = tx
        .query_row(
            "SELECT book_id, user_id, borrow_date, due_date, return_date
             FROM borrow_records WHERE id = ?",
            [record_id],
            |r| {
                Ok((
                    r.get(0)?,
                    r.get(1)?,
                    r.get(2)?,
                    r.get(3)?,
                    r.get(4)?,
                ))
            },
        )
        .optional()?;
    let Some((book_id, user_id, borrow_date, due_date, return_date)) = row else {
        return Err(StoreError::NotFound("borrow record"));
    };
    if return_date.is_some() {
        return Err(StoreError::InvalidState(
            "record already returned".to_string(),
        ));
    }

    let now = Utc::now().to_rfc3339();
    tx.execute(
        "UPDATE borrow_records SET return_date = ?, status = 'RETURNED' WHERE id = ?",
        (&now, record_id),
    )?;
    tx.execute(
        "UPDATE books SET available = MIN(available + 1, quantity) WHERE id = ?",
        [&book_id],
    )?;
    tx.commit()?;

    let record = BorrowRecord {
        id: record_id.to_string(),
        book_id,
        user_id,
        borrow_date,
        due_date,
        return_date: Some(now),
        status: "RETURNED".to_string(),
    };
    hooks.emit(&MutationEvent::BookReturned {
        record: record.clone(),
    });
    Ok(record)
}
