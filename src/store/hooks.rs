use super::attendance::AttendanceRow;
use super::library::BorrowRecord;
use super::marks::MarkRow;

/// Event handed to post-commit hooks. Carries enough of the committed state
/// that hooks never have to re-read it.
#[derive(Debug, Clone)]
pub enum MutationEvent {
    BookBorrowed {
        record: BorrowRecord,
        book_title: String,
    },
    BookReturned {
        record: BorrowRecord,
    },
    AttendanceMarked {
        class_id: String,
        date: String,
        marked_by: String,
        rows: Vec<MarkedAttendance>,
    },
    MarksEntered {
        exam_id: String,
        rows: Vec<MarkRow>,
    },
    EntityUpdated {
        entity: String,
        updated: usize,
    },
}

/// One committed attendance row plus the guardians registered for that
/// student, resolved inside the marking transaction.
#[derive(Debug, Clone)]
pub struct MarkedAttendance {
    pub row: AttendanceRow,
    pub parent_ids: Vec<String>,
}

/// Fire-and-forget action run after a successful commit. A hook error is
/// logged and dropped; it never changes the outcome of the mutation and is
/// never retried.
pub trait PostCommitHook: Send + Sync {
    fn after_commit(&self, event: &MutationEvent) -> anyhow::Result<()>;
}

impl<T: PostCommitHook + ?Sized> PostCommitHook for std::sync::Arc<T> {
    fn after_commit(&self, event: &MutationEvent) -> anyhow::Result<()> {
        (**self).after_commit(event)
    }
}

/// Transport for real-time pushes, keyed by room the way the dashboard
/// subscribes: `parent-{user_id}` for guardian updates, `admin-room` for
/// log streaming.
pub trait Broadcast: Send + Sync {
    fn publish(&self, room: &str, event: &str, payload: &serde_json::Value) -> anyhow::Result<()>;
}

impl<T: Broadcast + ?Sized> Broadcast for std::sync::Arc<T> {
    fn publish(&self, room: &str, event: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        (**self).publish(room, event, payload)
    }
}

#[derive(Default)]
pub struct Hooks {
    hooks: Vec<Box<dyn PostCommitHook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, hook: Box<dyn PostCommitHook>) {
        self.hooks.push(hook);
    }

    /// Runs every registered hook against `event`, swallowing failures.
    pub fn emit(&self, event: &MutationEvent) {
        for hook in &self.hooks {
            if let Err(e) = hook.after_commit(event) {
                tracing::warn!(error = %e, "post-commit hook failed");
            }
        }
    }
}
