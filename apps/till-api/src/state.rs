//! Shared handler state.

use till_db::Database;

/// State shared by every handler. Holds the one database handle constructed
/// at startup.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
