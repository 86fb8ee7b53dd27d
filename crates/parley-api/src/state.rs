//! Application state wiring all services together.
//!
//! Services in parley-core are generic over the repository traits; AppState
//! pins them to the concrete SQLite implementations from parley-infra.

use std::path::PathBuf;
use std::sync::Arc;

use parley_core::hub::BroadcastHub;
use parley_core::presence::PresenceService;
use parley_core::relay::MessageRelay;
use parley_core::session::SessionRegistry;
use parley_core::summary::SummaryService;
use parley_infra::sqlite::message::SqliteMessageRepository;
use parley_infra::sqlite::pool::DatabasePool;
use parley_infra::sqlite::user::SqliteUserRepository;

/// Concrete type aliases for the service generics pinned to infra implementations.
pub type ConcreteRelay = MessageRelay<SqliteMessageRepository>;
pub type ConcretePresence = PresenceService<SqliteUserRepository>;
pub type ConcreteSummaries = SummaryService<SqliteMessageRepository>;

/// Shared application state holding the in-memory relay machinery and the
/// services, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<SessionRegistry>,
    pub hub: Arc<BroadcastHub>,
    pub relay: Arc<ConcreteRelay>,
    pub presence: Arc<ConcretePresence>,
    pub summaries: Arc<ConcreteSummaries>,
}

impl AppState {
    /// Initialize the application state: connect to the DB, wire services.
    pub async fn init(data_dir: Option<PathBuf>) -> anyhow::Result<Self> {
        let data_dir = data_dir.unwrap_or_else(default_data_dir);

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let db_url = format!(
            "sqlite://{}?mode=rwc",
            data_dir.join("parley.db").display()
        );
        let db_pool = DatabasePool::new(&db_url).await?;

        // The registry is the single source of truth for channel
        // membership; the hub consults it on every fan-out.
        let registry = Arc::new(SessionRegistry::new());
        let hub = Arc::new(BroadcastHub::new(registry.clone()));

        let relay = MessageRelay::new(
            SqliteMessageRepository::new(db_pool.clone()),
            hub.clone(),
        );
        let presence = PresenceService::new(
            SqliteUserRepository::new(db_pool.clone()),
            hub.clone(),
        );
        let summaries = SummaryService::new(SqliteMessageRepository::new(db_pool));

        Ok(Self {
            registry,
            hub,
            relay: Arc::new(relay),
            presence: Arc::new(presence),
            summaries: Arc::new(summaries),
        })
    }
}

/// `PARLEY_DATA_DIR` env var, falling back to `~/.parley`.
fn default_data_dir() -> PathBuf {
    match std::env::var("PARLEY_DATA_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(".parley")
        }
    }
}
