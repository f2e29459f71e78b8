use std::sync::{Arc, Barrier};
use std::thread;

use schoold::db::{self, DbPool};
use schoold::store::{self, Hooks, StoreError};

fn open_test_pool(dir: &tempfile::TempDir) -> DbPool {
    db::open_pool(dir.path()).expect("open pool")
}

fn seed_user(pool: &DbPool, id: &str) {
    let conn = pool.get().expect("conn");
    conn.execute(
        "INSERT INTO users(id, email, display_name, role, is_approved, created_at)
         VALUES(?, ?, ?, 'STUDENT', 1, '2026-01-01T00:00:00Z')",
        (id, format!("{}@example.edu", id), id),
    )
    .expect("seed user");
}

fn seed_book(pool: &DbPool, id: &str, quantity: i64) {
    let conn = pool.get().expect("conn");
    conn.execute(
        "INSERT INTO books(id, title, author, category, quantity, available, created_at)
         VALUES(?, 'Gitanjali', 'Tagore', 'poetry', ?, ?, '2026-01-01T00:00:00Z')",
        (id, quantity, quantity),
    )
    .expect("seed book");
}

fn book_available(pool: &DbPool, id: &str) -> i64 {
    let conn = pool.get().expect("conn");
    conn.query_row("SELECT available FROM books WHERE id = ?", [id], |r| {
        r.get(0)
    })
    .expect("available")
}

fn borrowed_count(pool: &DbPool, book_id: &str) -> i64 {
    let conn = pool.get().expect("conn");
    conn.query_row(
        "SELECT COUNT(*) FROM borrow_records WHERE book_id = ? AND status = 'BORROWED'",
        [book_id],
        |r| r.get(0),
    )
    .expect("count")
}

#[test]
fn last_copy_goes_to_exactly_one_borrower() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = open_test_pool(&dir);
    seed_user(&pool, "user-a");
    seed_user(&pool, "user-b");
    seed_book(&pool, "book-1", 1);

    let hooks = Arc::new(Hooks::new());
    let barrier = Arc::new(Barrier::new(2));
    let mut handles = Vec::new();
    for user in ["user-a", "user-b"] {
        let pool = pool.clone();
        let hooks = hooks.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            store::borrow_book(&pool, &hooks, "book-1", user, "2026-09-01")
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();

    let ok = results.iter().filter(|r| r.is_ok()).count();
    let out_of_stock = results
        .iter()
        .filter(|r| matches!(r, Err(StoreError::OutOfStock)))
        .count();
    assert_eq!(ok, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(book_available(&pool, "book-1"), 0);
    assert_eq!(borrowed_count(&pool, "book-1"), 1);
}

#[test]
fn concurrent_borrows_never_exceed_quantity() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = open_test_pool(&dir);
    let quantity = 3i64;
    seed_book(&pool, "book-1", quantity);
    for i in 0..16 {
        seed_user(&pool, &format!("user-{}", i));
    }

    let hooks = Arc::new(Hooks::new());
    let barrier = Arc::new(Barrier::new(16));
    let mut handles = Vec::new();
    for i in 0..16 {
        let pool = pool.clone();
        let hooks = hooks.clone();
        let barrier = barrier.clone();
        handles.push(thread::spawn(move || {
            barrier.wait();
            store::borrow_book(&pool, &hooks, "book-1", &format!("user-{}", i), "2026-09-01")
        }));
    }
    let results: Vec<_> = handles.into_iter().map(|h| h.join().expect("join")).collect();

    let ok = results.iter().filter(|r| r.is_ok()).count() as i64;
    assert_eq!(ok, quantity);
    assert_eq!(borrowed_count(&pool, "book-1"), quantity);
    assert_eq!(book_available(&pool, "book-1"), 0);
    for r in results {
        if let Err(e) = r {
            assert!(matches!(e, StoreError::OutOfStock), "unexpected error: {e}");
        }
    }
}

#[test]
fn available_stays_within_bounds_under_churn() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = open_test_pool(&dir);
    let quantity = 2i64;
    seed_book(&pool, "book-1", quantity);
    for i in 0..6 {
        seed_user(&pool, &format!("user-{}", i));
    }

    let hooks = Arc::new(Hooks::new());
    let mut handles = Vec::new();
    for i in 0..6 {
        let pool = pool.clone();
        let hooks = hooks.clone();
        handles.push(thread::spawn(move || {
            let user = format!("user-{}", i);
            for _ in 0..5 {
                match store::borrow_book(&pool, &hooks, "book-1", &user, "2026-09-01") {
                    Ok(record) => {
                        store::return_book(&pool, &hooks, &record.id).expect("return");
                    }
                    Err(StoreError::OutOfStock) => {}
                    Err(e) => panic!("unexpected error: {e}"),
                }
            }
        }));
    }
    for h in handles {
        h.join().expect("join");
    }

    let available = book_available(&pool, "book-1");
    assert!((0..=quantity).contains(&available));
    // Every successful borrow was paired with a return.
    assert_eq!(available, quantity);
    assert_eq!(borrowed_count(&pool, "book-1"), 0);
}

#[test]
fn second_return_fails_and_increments_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = open_test_pool(&dir);
    seed_user(&pool, "user-a");
    seed_book(&pool, "book-1", 2);

    let hooks = Hooks::new();
    let record = store::borrow_book(&pool, &hooks, "book-1", "user-a", "2026-09-01").expect("borrow");
    assert_eq!(book_available(&pool, "book-1"), 1);

    let returned = store::return_book(&pool, &hooks, &record.id).expect("first return");
    assert_eq!(returned.status, "RETURNED");
    assert!(returned.return_date.is_some());
    assert_eq!(book_available(&pool, "book-1"), 2);

    let second = store::return_book(&pool, &hooks, &record.id);
    assert!(matches!(second, Err(StoreError::InvalidState(_))));
    assert_eq!(book_available(&pool, "book-1"), 2);
}

#[test]
fn missing_rows_surface_as_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let pool = open_test_pool(&dir);
    let hooks = Hooks::new();

    let borrow = store::borrow_book(&pool, &hooks, "no-such-book", "user-a", "2026-09-01");
    assert!(matches!(borrow, Err(StoreError::NotFound("book"))));

    let ret = store::return_book(&pool, &hooks, "no-such-record");
    assert!(matches!(ret, Err(StoreError::NotFound("borrow record"))));
}
