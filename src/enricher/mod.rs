use std::sync::Arc;

use futures::future::join_all;
use html_escape::decode_html_entities;
use tokio::sync::Semaphore;

use crate::domain::Comic;
use crate::fetcher::FeedSource;

pub const DEFAULT_WORKERS: usize = 8;

/// Fills creator credits, description, and cover image from per-issue
/// detail pages.
///
/// Each record gets one detail fetch, bounded by a worker semaphore; the
/// whole batch is joined before the caller continues. A failed fetch is
/// logged and leaves that record's fields at their defaults.
pub struct DetailEnricher {
    source: Arc<dyn FeedSource + Send + Sync>,
    semaphore: Arc<Semaphore>,
}

impl DetailEnricher {
    pub fn new(source: Arc<dyn FeedSource + Send + Sync>) -> Self {
        Self::with_workers(source, DEFAULT_WORKERS)
    }

    pub fn with_workers(source: Arc<dyn FeedSource + Send + Sync>, workers: usize) -> Self {
        Self {
            source,
            semaphore: Arc::new(Semaphore::new(workers)),
        }
    }

    /// Enrich every record, variants included. Returns the batch once all
    /// fetches have settled.
    pub async fn enrich_all(&self, comics: Vec<Comic>) -> Vec<Comic> {
        let mut handles = Vec::new();

        for mut comic in comics {
            let source = self.source.clone();
            let semaphore = self.semaphore.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire().await.expect("Semaphore closed");

                enrich_one(source.as_ref(), &mut comic).await;
                for variant in comic.variants.iter_mut() {
                    enrich_one(source.as_ref(), variant).await;
                }
                comic
            }));
        }

        let mut enriched = Vec::new();
        for result in join_all(handles).await {
            match result {
                Ok(comic) => enriched.push(comic),
                Err(e) => {
                    tracing::error!("Enrichment task join error: {}", e);
                }
            }
        }

        enriched
    }
}

async fn enrich_one(source: &(dyn FeedSource + Send + Sync), comic: &mut Comic) {
    if comic.code.is_empty() {
        return;
    }

    match source.fetch_detail(&comic.code).await {
        Ok(html) => apply_detail(comic, &html),
        Err(e) => {
            tracing::warn!("Detail fetch failed for {}: {}", comic.code, e);
        }
    }
}

/// Fill only fields that are still empty, so carried-forward enrichment
/// survives a re-fetch that returns a sparser page.
pub(crate) fn apply_detail(comic: &mut Comic, html: &str) {
    if comic.writer.is_empty() {
        if let Some(value) = labeled_value(html, "Writer") {
            comic.writer = value;
        }
    }
    if comic.artist.is_empty() {
        if let Some(value) = labeled_value(html, "Artist") {
            comic.artist = value;
        }
    }
    if comic.cover_artist.is_empty() {
        if let Some(value) = labeled_value(html, "Cover Artist") {
            comic.cover_artist = value;
        }
    }
    if comic.description.is_empty() {
        if let Some(value) =
            meta_content(html, "og:description").or_else(|| labeled_value(html, "Description"))
        {
            comic.description = value;
        }
    }
    if comic.cover_url.is_empty() {
        if let Some(value) = meta_content(html, "og:image") {
            comic.cover_url = value;
        }
    }
}

/// Extract the text following `Label:`, skipping markup between the label
/// and its value.
fn labeled_value(html: &str, label: &str) -> Option<String> {
    let needle = format!("{label}:");
    let mut from = 0;
    while let Some(rel) = html[from..].find(&needle) {
        let at = from + rel;
        from = at + needle.len();
        // "Artist:" also occurs inside "Cover Artist:"
        if label == "Artist" && html[..at].ends_with("Cover ") {
            continue;
        }
        if let Some(value) = text_after(&html[from..]) {
            return Some(value);
        }
    }
    None
}

fn text_after(mut rest: &str) -> Option<String> {
    loop {
        rest = rest.trim_start();
        if let Some(stripped) = rest.strip_prefix('<') {
            let end = stripped.find('>')?;
            rest = &stripped[end + 1..];
            continue;
        }
        break;
    }
    let end = rest.find(['<', '\n', '\r']).unwrap_or(rest.len());
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| decode_html_entities(value).to_string())
}

/// Value of a `<meta property="..." content="...">` tag.
fn meta_content(html: &str, property: &str) -> Option<String> {
    let needle = format!("property=\"{property}\"");
    let at = html.find(&needle)?;
    let tag_start = html[..at].rfind('<')?;
    let tag_end = at + html[at..].find('>')?;
    let tag = &html[tag_start..tag_end];

    let marker = "content=\"";
    let start = tag.find(marker)? + marker.len();
    let rest = &tag[start..];
    let end = rest.find('"')?;
    let value = rest[..end].trim();
    (!value.is_empty()).then(|| decode_html_entities(value).to_string())
}
