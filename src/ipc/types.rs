use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::db::DbPool;
use crate::store::Hooks;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub pool: Option<DbPool>,
    pub hooks: Arc<Hooks>,
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            workspace: None,
            pool: None,
            hooks: Arc::new(Hooks::new()),
        }
    }

    /// Pool plus hook list, present once a workspace has been selected.
    pub fn open(&self) -> Option<(&DbPool, &Hooks)> {
        self.pool.as_ref().map(|p| (p, self.hooks.as_ref()))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
