use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{LongboxError, Result};
use crate::collection::ComicCollection;
use crate::config::Config;
use crate::fetcher::{FeedSource, HttpFeedSource};
use crate::rules::RuleSet;
use crate::store::SqliteStore;

/// The explicitly wired dependency graph: store, feed source, and rule
/// set, built once at startup and handed to whatever needs them.
pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub source: Arc<dyn FeedSource + Send + Sync>,
    pub rules: RuleSet,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.db_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        let source: Arc<dyn FeedSource + Send + Sync> =
            Arc::new(HttpFeedSource::new(&config.feed_url, &config.detail_url)?);
        let rules = RuleSet::load_or_init(&config.rules_path()?)?;

        Ok(Self {
            config,
            store,
            source,
            rules,
        })
    }

    /// The weekly release collection backed by this context.
    pub fn collection(&self) -> ComicCollection<SqliteStore> {
        ComicCollection::new(
            "weekly",
            self.store.clone(),
            self.source.clone(),
            self.rules.clone(),
        )
        .with_workers(self.config.workers)
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| LongboxError::Config("Could not find data directory".into()))?;
        let longbox_dir = data_dir.join("longbox");
        std::fs::create_dir_all(&longbox_dir)?;
        Ok(longbox_dir.join("longbox.db"))
    }
}
