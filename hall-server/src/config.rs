//! Hall server configuration

use std::path::PathBuf;

/// Configuration for the hall server core
#[derive(Debug, Clone)]
pub struct HallConfig {
    /// Path of the embedded database file
    pub db_path: PathBuf,
}

impl HallConfig {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            db_path: std::env::var("HALL_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("hall.redb")),
        }
    }

    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
        }
    }
}

impl Default for HallConfig {
    fn default() -> Self {
        Self::from_env()
    }
}
