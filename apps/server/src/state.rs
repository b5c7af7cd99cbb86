use std::sync::Arc;

use uptime_service::analytics::MonitorQueries;
use uptime_service::events::BroadcastRegistry;

/// Shared by every worker
#[derive(Clone)]
pub struct AppState {
    pub queries: MonitorQueries,
    pub registry: Arc<BroadcastRegistry>,
}

impl AppState {
    pub fn new(queries: MonitorQueries, registry: Arc<BroadcastRegistry>) -> Self {
        Self { queries, registry }
    }
}

#[cfg(test)]
pub mod test_support {
    use super::*;
    use tempfile::{TempDir, tempdir};
    use uptime_service::database::{Database, open_database};

    /// State over a throwaway database; keep the `TempDir` alive for the test
    pub async fn test_state() -> (TempDir, Arc<dyn Database>, AppState) {
        let dir = tempdir().unwrap();
        let database: Arc<dyn Database> =
            Arc::new(open_database(&dir.path().join("server.db"), 4).await.unwrap());
        let state = AppState::new(
            MonitorQueries::new(database.clone()),
            Arc::new(BroadcastRegistry::default()),
        );
        (dir, database, state)
    }
}
