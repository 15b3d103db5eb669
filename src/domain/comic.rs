use std::cmp::Ordering;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One listed issue or variant from the weekly release catalog.
///
/// Identity is the raw catalog title text (`original_string`); two records
/// describing the same listing always carry the same `original_string`.
/// Variant listings of the same issue share a grouping [`key`](Comic::key)
/// and are folded under the cheapest listing by [`merge_variants`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comic {
    pub id: i64,
    pub series: String,
    pub number: f64,
    pub original_string: String,
    pub code: String,
    pub writer: String,
    pub artist: String,
    pub cover_artist: String,
    pub publisher: String,
    pub description: String,
    pub cover_url: String,
    pub price: f64,
    pub release_date: NaiveDate,
    pub reprint: bool,
    pub variant: bool,
    pub pulled: bool,
    pub watched: bool,
    pub main_id: i64,
    pub variants: Vec<Comic>,
}

/// Sentinel issue number for listings without one (graphic novels,
/// collections).
pub const NO_NUMBER: f64 = -1.0;

impl Comic {
    pub fn new(series: String, number: f64, original_string: String, release_date: NaiveDate) -> Self {
        Self {
            id: 0,
            series,
            number,
            original_string,
            code: String::new(),
            writer: String::new(),
            artist: String::new(),
            cover_artist: String::new(),
            publisher: String::new(),
            description: String::new(),
            cover_url: String::new(),
            price: f64::NAN,
            release_date,
            reprint: false,
            variant: false,
            pulled: false,
            watched: false,
            main_id: 0,
            variants: Vec::new(),
        }
    }

    /// Grouping key: listings with the same key are the same underlying
    /// issue and merge into one record.
    pub fn key(&self) -> String {
        if self.number == NO_NUMBER {
            self.series.clone()
        } else {
            format!("{} {}", self.series, self.number)
        }
    }

    /// Display title, `#` before the issue number.
    pub fn title(&self) -> String {
        if self.number == NO_NUMBER {
            self.series.clone()
        } else {
            format!("{} #{}", self.series, self.number)
        }
    }

    /// Carry a previously tracked record's storage identity, user flags,
    /// and enrichment onto a freshly parsed one.
    pub fn copy_state(&mut self, prior: &Comic) {
        self.id = prior.id;
        self.pulled = prior.pulled;
        self.watched = prior.watched;
        if self.writer.is_empty() {
            self.writer = prior.writer.clone();
        }
        if self.artist.is_empty() {
            self.artist = prior.artist.clone();
        }
        if self.cover_artist.is_empty() {
            self.cover_artist = prior.cover_artist.clone();
        }
        if self.description.is_empty() {
            self.description = prior.description.clone();
        }
        if self.cover_url.is_empty() {
            self.cover_url = prior.cover_url.clone();
        }
    }

    /// Fold `candidate` into this record's variant list.
    ///
    /// Returns false without touching anything when `candidate` is this
    /// record itself or is already listed (merging is idempotent by
    /// `original_string`). A candidate that owns variants of its own has
    /// them re-parented here first, so variants never nest.
    pub fn absorb_variant(&mut self, mut candidate: Comic) -> bool {
        if candidate.original_string == self.original_string {
            return false;
        }
        if self
            .variants
            .iter()
            .any(|v| v.original_string == candidate.original_string)
        {
            return false;
        }

        for nested in std::mem::take(&mut candidate.variants) {
            self.absorb_variant(nested);
        }

        candidate.variant = true;
        candidate.main_id = self.id;
        self.variants.push(candidate);
        true
    }
}

/// Collapse a pool of listings sharing a grouping key into one main record.
///
/// The cheapest listing wins (NaN prices sort last); price ties break on
/// case-insensitive `original_string` order. Everything else becomes a
/// variant of the winner.
pub fn merge_variants(mut pool: Vec<Comic>) -> Option<Comic> {
    if pool.is_empty() {
        return None;
    }

    pool.sort_by(|a, b| compare_listings(a, b));

    let mut main = pool.remove(0);
    main.variant = false;
    main.main_id = 0;

    for candidate in pool {
        main.absorb_variant(candidate);
    }

    Some(main)
}

fn compare_listings(a: &Comic, b: &Comic) -> Ordering {
    a.price.total_cmp(&b.price).then_with(|| {
        a.original_string
            .to_lowercase()
            .cmp(&b.original_string.to_lowercase())
    })
}
