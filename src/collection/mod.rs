use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::app::{LongboxError, Result};
use crate::domain::Comic;
use crate::enricher::DetailEnricher;
use crate::fetcher::FeedSource;
use crate::parser::ReleaseParser;
use crate::rules::RuleSet;
use crate::store::{Store, LATEST_RELEASE_DATE_PREF};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    Empty,
    Loading,
    Ready,
    Refreshing,
    /// Storage reported a failure; the in-memory view may be stale.
    Failed,
}

#[derive(Debug, Clone)]
pub struct RefreshSummary {
    pub release_date: NaiveDate,
    pub parsed: usize,
    pub comics: usize,
    pub pulled: usize,
    pub watched: usize,
}

/// The tracked release list: owns the weekly snapshot, its indexes, and
/// the refresh pipeline (fetch → parse → merge → enrich → persist →
/// classify).
///
/// All mutation happens through `&mut self` on one task. A refresh runs
/// to completion; a second refresh issued while one is in flight is
/// rejected, not queued, because the copy-forward state is not
/// reentrant.
pub struct ComicCollection<S: Store> {
    name: String,
    state: CollectionState,
    store: Arc<S>,
    source: Arc<dyn FeedSource + Send + Sync>,
    enricher: DetailEnricher,
    parser: ReleaseParser,
    rules: RuleSet,
    /// Grouping key → main record (variants nested).
    comics: HashMap<String, Comic>,
    /// Raw catalog title → grouping key, mains and variants alike.
    by_original: HashMap<String, String>,
    publishers: Vec<String>,
    latest_date: Option<NaiveDate>,
}

impl<S: Store> ComicCollection<S> {
    pub fn new(
        name: impl Into<String>,
        store: Arc<S>,
        source: Arc<dyn FeedSource + Send + Sync>,
        rules: RuleSet,
    ) -> Self {
        let enricher = DetailEnricher::new(source.clone());
        Self {
            name: name.into(),
            state: CollectionState::Empty,
            store,
            source,
            enricher,
            parser: ReleaseParser::new(),
            rules,
            comics: HashMap::new(),
            by_original: HashMap::new(),
            publishers: Vec::new(),
            latest_date: None,
        }
    }

    /// Bound the number of parallel detail fetches.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.enricher = DetailEnricher::with_workers(self.source.clone(), workers);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CollectionState {
        self.state
    }

    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.latest_date
    }

    pub fn is_empty(&self) -> bool {
        self.comics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.comics.len()
    }

    /// Load the last persisted snapshot, if any.
    pub fn load(&mut self) -> Result<usize> {
        self.state = CollectionState::Loading;
        match self.load_inner() {
            Ok(count) => {
                self.state = CollectionState::Ready;
                Ok(count)
            }
            Err(e) => {
                self.state = CollectionState::Failed;
                Err(e)
            }
        }
    }

    fn load_inner(&mut self) -> Result<usize> {
        let Some(raw) = self.store.pref(LATEST_RELEASE_DATE_PREF)? else {
            self.rebuild_indexes(Vec::new());
            return Ok(0);
        };
        let date = NaiveDate::parse_from_str(&raw, DATE_FORMAT)
            .map_err(|e| LongboxError::Config(format!("bad stored release date '{raw}': {e}")))?;

        let comics = self.store.comics_for_date(date)?;
        let count = comics.len();
        self.latest_date = Some(date);
        self.rebuild_indexes(comics);
        Ok(count)
    }

    /// Fetch the live feed and rebuild the snapshot from it.
    pub async fn refresh(&mut self) -> Result<RefreshSummary> {
        if self.state == CollectionState::Refreshing {
            return Err(LongboxError::RefreshInFlight);
        }
        let prior_state = self.state;
        self.state = CollectionState::Refreshing;

        match self.refresh_inner().await {
            Ok(summary) => {
                self.state = CollectionState::Ready;
                Ok(summary)
            }
            Err(e) => {
                // a failed fetch or parse leaves the old snapshot intact;
                // a storage failure means the view may no longer be trusted
                self.state = if matches!(e, LongboxError::Database(_)) {
                    CollectionState::Failed
                } else {
                    prior_state
                };
                Err(e)
            }
        }
    }

    async fn refresh_inner(&mut self) -> Result<RefreshSummary> {
        let text = self.source.fetch_release_list().await?;
        let outcome = self.parser.parse(&text, self.latest_date, &self.comics)?;
        let date_changed = self.latest_date != Some(outcome.release_date);
        let parsed = outcome.parsed;

        tracing::info!(
            collection = %self.name,
            date = %outcome.release_date,
            parsed,
            "release list parsed"
        );

        let comics: Vec<Comic> = outcome.comics.into_values().collect();
        let mut comics = self.enricher.enrich_all(comics).await;

        self.store.set_pref(
            LATEST_RELEASE_DATE_PREF,
            &outcome.release_date.format(DATE_FORMAT).to_string(),
        )?;

        // mains persist before their variants: a variant row carries its
        // main's assigned id
        for comic in comics.iter_mut() {
            let id = self.store.save_comic(comic)?;
            comic.id = id;
            for variant in comic.variants.iter_mut() {
                variant.main_id = id;
                variant.id = self.store.save_comic(variant)?;
            }
        }

        if date_changed {
            let removed = self.purge_prior(outcome.release_date)?;
            if removed > 0 {
                tracing::info!(removed, "purged prior unmarked records");
            }
        }

        let mut pulled = 0usize;
        let mut watched = 0usize;
        for comic in comics.iter_mut() {
            let before = (comic.pulled, comic.watched);
            self.rules.apply(comic);
            if (comic.pulled, comic.watched) != before {
                self.store.set_flags(comic.id, comic.pulled, comic.watched)?;
            }
            pulled += usize::from(comic.pulled);
            watched += usize::from(comic.watched);
        }

        self.latest_date = Some(outcome.release_date);
        let total = comics.len();
        self.rebuild_indexes(comics);

        Ok(RefreshSummary {
            release_date: outcome.release_date,
            parsed,
            comics: total,
            pulled,
            watched,
        })
    }

    /// Retention delete, re-sent once on failure.
    fn purge_prior(&self, keep: NaiveDate) -> Result<usize> {
        match self.store.delete_except(keep) {
            Ok(removed) => Ok(removed),
            Err(e) => {
                tracing::warn!("retention delete failed, re-sending: {e}");
                self.store.delete_except(keep)
            }
        }
    }

    fn rebuild_indexes(&mut self, comics: Vec<Comic>) {
        self.comics.clear();
        self.by_original.clear();

        let mut publishers: Vec<String> = Vec::new();
        for comic in comics {
            let key = comic.key();
            self.by_original
                .insert(comic.original_string.clone(), key.clone());
            for variant in &comic.variants {
                self.by_original
                    .insert(variant.original_string.clone(), key.clone());
            }
            if !comic.publisher.is_empty() && !publishers.contains(&comic.publisher) {
                publishers.push(comic.publisher.clone());
            }
            self.comics.insert(key, comic);
        }

        publishers.sort_by_key(|p| p.to_lowercase());
        self.publishers = publishers;
    }

    fn resolve_key(&self, name: &str) -> Option<String> {
        if self.comics.contains_key(name) {
            return Some(name.to_string());
        }
        self.by_original.get(name).cloned()
    }

    /// Look up a top-level record by grouping key or raw catalog title.
    pub fn comic(&self, name: &str) -> Option<&Comic> {
        let key = self.resolve_key(name)?;
        self.comics.get(&key)
    }

    pub fn publishers(&self) -> &[String] {
        &self.publishers
    }

    pub fn all_comics(&self) -> Vec<&Comic> {
        let mut comics: Vec<&Comic> = self.comics.values().collect();
        comics.sort_by(|a, b| a.key().to_lowercase().cmp(&b.key().to_lowercase()));
        comics
    }

    pub fn comics_for_publisher(&self, publisher: &str) -> Vec<&Comic> {
        let mut comics: Vec<&Comic> = self
            .comics
            .values()
            .filter(|c| c.publisher.eq_ignore_ascii_case(publisher))
            .collect();
        comics.sort_by(|a, b| a.key().to_lowercase().cmp(&b.key().to_lowercase()));
        comics
    }

    pub fn set_pulled(&mut self, name: &str, value: bool) -> Result<()> {
        let key = self
            .resolve_key(name)
            .ok_or_else(|| LongboxError::ComicNotFound(name.to_string()))?;
        let comic = self
            .comics
            .get_mut(&key)
            .ok_or_else(|| LongboxError::ComicNotFound(name.to_string()))?;

        comic.pulled = value;
        if comic.id > 0 {
            self.store.set_flags(comic.id, comic.pulled, comic.watched)?;
        }
        Ok(())
    }

    pub fn set_watched(&mut self, name: &str, value: bool) -> Result<()> {
        let key = self
            .resolve_key(name)
            .ok_or_else(|| LongboxError::ComicNotFound(name.to_string()))?;
        let comic = self
            .comics
            .get_mut(&key)
            .ok_or_else(|| LongboxError::ComicNotFound(name.to_string()))?;

        comic.watched = value;
        if comic.id > 0 {
            self.store.set_flags(comic.id, comic.pulled, comic.watched)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use crate::rules::{GroupType, ResultType, Rule, RuleGroup, RuleNode};
    use crate::store::SqliteStore;

    const FEED: &str = "New Releases for 01/02/2024\n\
        MARVEL COMICS\n\
        ABC123\tSPIDER-MAN #5\t3.99\n\
        ABC124\tSPIDER-MAN #5 VARIANT\t4.99\n\
        DC COMICS\n\
        DEF200\tBATMAN #100\t5.99\n";

    const DETAIL_PAGE: &str = "<html><body>Writer: Dan Slott<br/></body></html>";

    struct ScriptedSource {
        list: Mutex<String>,
        fail_list: Mutex<bool>,
    }

    impl ScriptedSource {
        fn new(list: &str) -> Arc<Self> {
            Arc::new(Self {
                list: Mutex::new(list.to_string()),
                fail_list: Mutex::new(false),
            })
        }

        fn set_list(&self, list: &str) {
            *self.list.lock().unwrap() = list.to_string();
        }

        fn fail_next(&self, fail: bool) {
            *self.fail_list.lock().unwrap() = fail;
        }
    }

    #[async_trait]
    impl FeedSource for ScriptedSource {
        async fn fetch_release_list(&self) -> Result<String> {
            if *self.fail_list.lock().unwrap() {
                return Err(LongboxError::Other("feed unavailable".into()));
            }
            Ok(self.list.lock().unwrap().clone())
        }

        async fn fetch_detail(&self, _code: &str) -> Result<String> {
            Ok(DETAIL_PAGE.to_string())
        }
    }

    fn pull_cheap_marvel() -> RuleSet {
        RuleSet::new(RuleGroup {
            name: "pull cheap Marvel".into(),
            group_type: GroupType::All,
            result_type: ResultType::Pull,
            allow_reprints: false,
            rules: vec![
                RuleNode::Rule(Rule::new("", "publisher", "is", "Marvel Comics").unwrap()),
                RuleNode::Rule(Rule::new("", "price", "lessThan", "5").unwrap()),
            ],
        })
    }

    fn collection(
        source: Arc<ScriptedSource>,
        rules: RuleSet,
    ) -> ComicCollection<SqliteStore> {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        ComicCollection::new("weekly", store, source, rules)
    }

    #[tokio::test]
    async fn test_refresh_parses_merges_and_classifies() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, pull_cheap_marvel());

        let summary = collection.refresh().await.unwrap();
        assert_eq!(summary.parsed, 3);
        assert_eq!(summary.comics, 2);
        assert_eq!(summary.pulled, 1);
        assert_eq!(collection.state(), CollectionState::Ready);

        let spider = collection.comic("SPIDER-MAN 5").unwrap();
        assert!(spider.pulled, "cheap Marvel rule must fire");
        assert_eq!(spider.variants.len(), 1);
        assert_eq!(spider.writer, "Dan Slott");

        let batman = collection.comic("BATMAN 100").unwrap();
        assert!(!batman.pulled);
    }

    #[tokio::test]
    async fn test_refresh_persists_mains_then_variants() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());
        collection.refresh().await.unwrap();

        let stored = collection
            .store
            .comics_for_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .unwrap();

        let spider = stored
            .iter()
            .find(|c| c.original_string == "SPIDER-MAN #5")
            .unwrap();
        assert!(spider.id > 0);
        assert_eq!(spider.variants.len(), 1);
        assert_eq!(spider.variants[0].main_id, spider.id);
    }

    #[tokio::test]
    async fn test_refresh_records_latest_date_pref() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());
        collection.refresh().await.unwrap();

        assert_eq!(
            collection.store.pref(LATEST_RELEASE_DATE_PREF).unwrap().as_deref(),
            Some("2024-01-02")
        );
        assert_eq!(
            collection.latest_date(),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );
    }

    #[tokio::test]
    async fn test_second_refresh_same_date_keeps_manual_flags() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());

        collection.refresh().await.unwrap();
        collection.set_watched("BATMAN 100", true).unwrap();

        collection.refresh().await.unwrap();
        assert!(collection.comic("BATMAN 100").unwrap().watched);
    }

    #[tokio::test]
    async fn test_new_week_purges_unmarked_and_resets_flags() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source.clone(), RuleSet::default());

        collection.refresh().await.unwrap();
        collection.set_pulled("SPIDER-MAN 5", true).unwrap();

        source.set_list(
            "New Releases for 01/09/2024\n\
             MARVEL COMICS\n\
             ABC900\tSPIDER-MAN #6\t3.99\n",
        );
        collection.refresh().await.unwrap();

        // new snapshot replaces the in-memory view
        assert!(collection.comic("BATMAN 100").is_none());
        assert!(collection.comic("SPIDER-MAN 6").is_some());

        // pulled record from the prior week survives retention
        let old = collection
            .store
            .comics_for_date(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap())
            .unwrap();
        let titles: Vec<&str> = old.iter().map(|c| c.original_string.as_str()).collect();
        assert!(titles.contains(&"SPIDER-MAN #5"));
        assert!(!titles.contains(&"BATMAN #100"));
    }

    #[tokio::test]
    async fn test_load_restores_persisted_snapshot() {
        let source = ScriptedSource::new(FEED);
        let store = Arc::new(SqliteStore::in_memory().unwrap());

        let mut first =
            ComicCollection::new("weekly", store.clone(), source.clone(), RuleSet::default());
        first.refresh().await.unwrap();
        first.set_pulled("SPIDER-MAN 5", true).unwrap();

        let mut second = ComicCollection::new("weekly", store, source, RuleSet::default());
        let count = second.load().unwrap();

        assert_eq!(count, 2);
        assert_eq!(second.state(), CollectionState::Ready);
        assert!(second.comic("SPIDER-MAN 5").unwrap().pulled);
        assert_eq!(second.comic("SPIDER-MAN 5").unwrap().variants.len(), 1);
    }

    #[tokio::test]
    async fn test_load_with_no_history_is_ready_and_empty() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());

        assert_eq!(collection.load().unwrap(), 0);
        assert_eq!(collection.state(), CollectionState::Ready);
        assert!(collection.is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_leaves_snapshot_intact() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source.clone(), RuleSet::default());
        collection.refresh().await.unwrap();

        source.fail_next(true);
        assert!(collection.refresh().await.is_err());

        assert_eq!(collection.state(), CollectionState::Ready);
        assert!(collection.comic("SPIDER-MAN 5").is_some());
    }

    #[tokio::test]
    async fn test_publisher_index_sorted() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());
        collection.refresh().await.unwrap();

        assert_eq!(collection.publishers(), ["DC Comics", "Marvel Comics"]);

        let marvel = collection.comics_for_publisher("Marvel Comics");
        assert_eq!(marvel.len(), 1);
        assert_eq!(marvel[0].key(), "SPIDER-MAN 5");
    }

    #[tokio::test]
    async fn test_lookup_by_original_string() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());
        collection.refresh().await.unwrap();

        // a variant's raw title resolves to its main record
        let main = collection.comic("SPIDER-MAN #5 VARIANT").unwrap();
        assert_eq!(main.key(), "SPIDER-MAN 5");
    }

    #[tokio::test]
    async fn test_toggle_unknown_comic_is_an_error() {
        let source = ScriptedSource::new(FEED);
        let mut collection = collection(source, RuleSet::default());
        collection.refresh().await.unwrap();

        assert!(collection.set_pulled("NO SUCH COMIC", true).is_err());
    }
}
