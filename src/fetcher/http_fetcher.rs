use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::app::Result;
use crate::fetcher::FeedSource;

const CODE_PLACEHOLDER: &str = "{code}";

pub struct HttpFeedSource {
    client: Client,
    list_url: Url,
    detail_url: String,
}

impl HttpFeedSource {
    /// `detail_url` is a template holding a `{code}` placeholder.
    pub fn new(list_url: &str, detail_url: &str) -> Result<Self> {
        let list_url = Url::parse(list_url)?;
        // validate the template with a dummy code up front
        Url::parse(&detail_url.replace(CODE_PLACEHOLDER, "JAN240001"))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("longbox/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Ok(Self {
            client,
            list_url,
            detail_url: detail_url.to_string(),
        })
    }
}

#[async_trait]
impl FeedSource for HttpFeedSource {
    async fn fetch_release_list(&self) -> Result<String> {
        let response = self.client.get(self.list_url.clone()).send().await?;
        response.error_for_status_ref()?;
        Ok(response.text().await?)
    }

    async fn fetch_detail(&self, code: &str) -> Result<String> {
        let url = self.detail_url.replace(CODE_PLACEHOLDER, code);
        let response = self.client.get(&url).send().await?;
        response.error_for_status_ref()?;
        Ok(response.text().await?)
    }
}
