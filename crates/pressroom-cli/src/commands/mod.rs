//! Command implementations.

pub mod externalize;
pub mod publish;
pub mod run;
pub mod schedule;

pub use self::externalize::execute_externalize;
pub use self::publish::execute_publish;
pub use self::run::execute_run;
pub use self::schedule::execute_schedule;

use crate::config::Config;
use crate::error::Result;
use pressroom_store::SqliteStore;
use std::sync::Arc;

/// Open the configured store.
fn open_store(config: &Config) -> Result<Arc<SqliteStore>> {
    tracing::debug!(path = %config.store.path.display(), "Opening store");
    Ok(Arc::new(SqliteStore::new(&config.store.path)?))
}
