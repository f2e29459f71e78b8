//! Transactional mutation procedures.
//!
//! Every write path here follows the same shape: check out a pooled
//! connection, open an IMMEDIATE transaction (taking the database write lock
//! before the first guarded read), validate, write, commit. A transaction
//! dropped on an error path rolls back automatically, so no partial batch is
//! ever visible. Post-commit side effects go through the [`hooks::Hooks`]
//! list and can never fail the mutation that triggered them.

pub mod admin;
pub mod attendance;
pub mod audit;
pub mod error;
pub mod hooks;
pub mod library;
pub mod marks;

pub use admin::{batch_update_entity, Entity, EntityUpdate};
pub use attendance::{mark_attendance_batch, AttendanceEntry, AttendanceRow, AttendanceStatus};
pub use audit::{AuditLogHook, ParentNotifyHook};
pub use error::StoreError;
pub use hooks::{Broadcast, Hooks, MarkedAttendance, MutationEvent, PostCommitHook};
pub use library::{borrow_book, return_book, BorrowRecord};
pub use marks::{enter_marks_batch, MarkEntry, MarkRow};
