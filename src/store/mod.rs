pub mod sqlite;
pub mod ticks;

use chrono::NaiveDate;

use crate::app::Result;
use crate::domain::Comic;

pub use sqlite::SqliteStore;

/// Preference key holding the most recent release date seen.
pub const LATEST_RELEASE_DATE_PREF: &str = "latest_release_date";

pub trait Store {
    // Comic operations. Records are identified by (original_string,
    // release_date); saving an existing record updates it in place and
    // keeps its id.
    fn save_comic(&self, comic: &Comic) -> Result<i64>;
    fn comic(&self, id: i64) -> Result<Option<Comic>>;
    /// Top-level records for one release date, variants re-attached.
    fn comics_for_date(&self, date: NaiveDate) -> Result<Vec<Comic>>;
    fn set_flags(&self, id: i64, pulled: bool, watched: bool) -> Result<()>;
    /// Weekly retention: purge records outside `keep` that nobody pulled
    /// or watched. Returns the number of rows removed.
    fn delete_except(&self, keep: NaiveDate) -> Result<usize>;
    fn all_dates(&self) -> Result<Vec<NaiveDate>>;

    // Preference operations
    fn pref(&self, key: &str) -> Result<Option<String>>;
    fn set_pref(&self, key: &str, value: &str) -> Result<()>;
    fn delete_pref(&self, key: &str) -> Result<()>;
}
