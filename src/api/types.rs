//! Shared state for the API router.

use std::path::PathBuf;
use std::sync::Arc;

use rusqlite::Connection;

use crate::db::{self, DatabaseError};

/// Shared context for all API routes. Holds the database location; each
/// request opens its own connection and lets SQLite coordinate access —
/// the store is the only shared resource between requests.
#[derive(Clone)]
pub struct ApiContext {
    db_path: Arc<PathBuf>,
}

impl ApiContext {
    pub fn new(db_path: PathBuf) -> Self {
        Self {
            db_path: Arc::new(db_path),
        }
    }

    pub fn open_db(&self) -> Result<Connection, DatabaseError> {
        db::open_database(&self.db_path)
    }
}
