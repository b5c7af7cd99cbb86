/// Database abstraction layer
///
/// Monitors, their aggregate counters and the append-only ping log live in a
/// local LibSQL (SQLite) database reached through a connection pool.
pub mod migrations;
pub mod models;
pub mod repository;

pub use repository::{Database, DatabaseImpl};

use std::path::Path;

use anyhow::Result;

use crate::pool::{LibsqlManager, LibsqlPool};

/// Initialize database with schema
pub async fn initialize_database(conn: &libsql::Connection) -> Result<()> {
    migrations::run_migrations(conn).await
}

/// Open (or create) the database file, build the pool and migrate the schema
pub async fn open_database(path: &Path, max_connections: usize) -> Result<DatabaseImpl> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = libsql::Builder::new_local(path).build().await?;
    let pool: LibsqlPool = deadpool::managed::Pool::builder(LibsqlManager::new(db))
        .max_size(max_connections.max(1))
        .build()?;

    let conn = pool.get().await.map_err(|e| anyhow::anyhow!("Failed to get database connection: {}", e))?;
    initialize_database(&conn).await?;
    drop(conn);

    tracing::info!(path = %path.display(), "Database ready");
    Ok(DatabaseImpl::new_from_pool(pool))
}
