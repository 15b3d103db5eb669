pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFeedSource;

/// The external release catalog: a weekly list export plus one detail
/// page per distributor code. Both calls fail atomically per request;
/// a failed detail fetch never affects other records.
#[async_trait]
pub trait FeedSource {
    /// Raw text of the weekly release list.
    async fn fetch_release_list(&self) -> Result<String>;

    /// Raw HTML of one issue's detail page.
    async fn fetch_detail(&self, code: &str) -> Result<String>;
}
