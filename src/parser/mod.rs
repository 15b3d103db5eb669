use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use html_escape::decode_html_entities;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::app::{LongboxError, Result};
use crate::domain::comic::NO_NUMBER;
use crate::domain::{merge_variants, Comic};

/// Header line that dates the whole batch, e.g. `New Releases for 1/2/2024`.
static RELEASE_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"New Releases for (\d{1,2}/\d{1,2}/\d{4})").expect("release header pattern")
});

/// Item title shape: `SERIES #NUMBER`, trailing text (covers, printings)
/// ignored for grouping.
static ITEM_TITLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<series>.+?)\s+#(?P<number>\d+(?:\.\d+)?)").expect("item title pattern")
});

/// Subsequent-printing marker: `2ND PTG`, `(3RD) PTG`, `4 PTG`.
static PRINTING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\(?\d+(?:st|nd|rd|th)?\)?\s*ptg").expect("printing pattern"));

/// Section headers are matched case-sensitively against the raw feed text;
/// longer keywords first so `DARK HORSE` never falls through to `DC`.
const PUBLISHER_KEYWORDS: &[(&str, &str)] = &[
    ("DARK HORSE", "Dark Horse Comics"),
    ("DYNAMITE", "Dynamite Entertainment"),
    ("MARVEL", "Marvel Comics"),
    ("IMAGE", "Image Comics"),
    ("BOOM", "Boom! Studios"),
    ("IDW", "IDW Publishing"),
    ("DC", "DC Comics"),
];

/// Listings that fail the `#number` pattern but cost at most this much are
/// kept as no-number records (graphic novels, collections); pricier
/// non-matches are merchandise and dropped.
const GRAPHIC_NOVEL_MAX_PRICE: f64 = 7.0;

#[derive(Debug)]
pub struct ParseOutcome {
    pub release_date: NaiveDate,
    /// Grouping key to merged main record, variants folded in.
    pub comics: HashMap<String, Comic>,
    /// Publisher names in order of first encounter.
    pub publishers: Vec<String>,
    /// Count of unique item lines parsed into records.
    pub parsed: usize,
}

/// Parses the weekly release feed text into merged comic records.
///
/// The parser itself is stateless: the caller passes its previously
/// tracked records (keyed by grouping key) and their batch date. When the
/// feed's date matches, storage ids, pulled/watched flags, and enrichment
/// carry forward by `original_string`, and previously tracked families
/// merge with this batch's pools. A different date starts a fresh
/// snapshot and the prior records are ignored wholesale.
#[derive(Clone, Default)]
pub struct ReleaseParser;

impl ReleaseParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(
        &self,
        text: &str,
        prior_date: Option<NaiveDate>,
        prior: &HashMap<String, Comic>,
    ) -> Result<ParseOutcome> {
        let mut release_date: Option<NaiveDate> = None;
        let mut carry: HashMap<&str, &Comic> = HashMap::new();
        let mut carry_active = false;

        let mut current_publisher = String::new();
        let mut publishers: Vec<String> = Vec::new();
        let mut pools: HashMap<String, Vec<Comic>> = HashMap::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut parsed = 0usize;

        for line in text.split(['\n', '\r']) {
            if release_date.is_none() {
                if let Some(caps) = RELEASE_HEADER.captures(line) {
                    let date = NaiveDate::parse_from_str(&caps[1], "%m/%d/%Y").map_err(|e| {
                        LongboxError::FeedParse(format!("bad release date '{}': {e}", &caps[1]))
                    })?;
                    release_date = Some(date);
                    if prior_date == Some(date) {
                        carry_active = true;
                        for main in prior.values() {
                            carry.insert(main.original_string.as_str(), main);
                            for variant in &main.variants {
                                carry.insert(variant.original_string.as_str(), variant);
                            }
                        }
                    }
                    continue;
                }
            }

            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 3 {
                if line.trim().len() < 3 {
                    continue;
                }
                if let Some(name) = canonical_publisher(line) {
                    current_publisher = name.to_string();
                    if !publishers.iter().any(|p| p == name) {
                        publishers.push(name.to_string());
                    }
                }
                continue;
            }

            let Some(date) = release_date else {
                tracing::debug!("item line before release date header skipped: {line}");
                continue;
            };

            let code = fields[0].trim();
            let title = decode_html_entities(fields[1].trim()).to_string();
            let price = parse_price(fields[2]);

            let Some((series, number, reprint)) = parse_title(&title, price) else {
                tracing::debug!("non-comic listing discarded: {title}");
                continue;
            };

            if seen.contains(&title) {
                tracing::debug!("duplicate listing skipped: {title}");
                continue;
            }
            seen.insert(title.clone());

            let mut comic = Comic::new(series, number, title.clone(), date);
            comic.code = code.to_string();
            comic.price = price;
            comic.publisher = current_publisher.clone();
            comic.reprint = reprint;

            if carry_active {
                if let Some(tracked) = carry.get(title.as_str()) {
                    comic.copy_state(tracked);
                }
            }

            parsed += 1;
            pools.entry(comic.key()).or_default().push(comic);
        }

        let Some(release_date) = release_date else {
            return Err(LongboxError::FeedParse(
                "feed carried no release date header".into(),
            ));
        };

        let mut comics: HashMap<String, Comic> = HashMap::new();

        // Same-date re-fetch: pool previously tracked families with this
        // batch's listings, and keep families the feed no longer lists.
        if carry_active {
            for (key, prior_main) in prior {
                match pools.get_mut(key) {
                    Some(pool) => {
                        let mut family = prior_main.clone();
                        let mut members = std::mem::take(&mut family.variants);
                        members.push(family);
                        for member in members {
                            if !seen.contains(&member.original_string) {
                                pool.push(member);
                            }
                        }
                    }
                    None => {
                        comics.insert(key.clone(), prior_main.clone());
                    }
                }
            }
        }

        for (key, pool) in pools {
            if let Some(merged) = merge_variants(pool) {
                comics.insert(key, merged);
            }
        }

        Ok(ParseOutcome {
            release_date,
            comics,
            publishers,
            parsed,
        })
    }
}

fn canonical_publisher(line: &str) -> Option<&'static str> {
    PUBLISHER_KEYWORDS
        .iter()
        .find(|(keyword, _)| line.contains(keyword))
        .map(|(_, name)| *name)
}

/// Strip everything but digits, `.` and `-`, then parse. Malformed text
/// yields NaN; such records are kept, not dropped.
fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    cleaned.parse().unwrap_or(f64::NAN)
}

fn parse_title(title: &str, price: f64) -> Option<(String, f64, bool)> {
    if let Some(caps) = ITEM_TITLE.captures(title) {
        let series = caps.name("series")?.as_str().trim().to_string();
        let number: f64 = caps.name("number")?.as_str().parse().ok()?;
        Some((series, number, PRINTING_MARKER.is_match(title)))
    } else if price <= GRAPHIC_NOVEL_MAX_PRICE {
        Some((title.to_string(), NO_NUMBER, false))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = "New Releases for 01/02/2024\n\
        MARVEL COMICS\n\
        ABC123\tSPIDER-MAN #5\t3.99\n\
        ABC124\tSPIDER-MAN #5 VARIANT\t4.99\n\
        DC COMICS\n\
        DEF200\tBATMAN #100\t$4.99\n";

    fn parse(text: &str) -> ParseOutcome {
        ReleaseParser::new()
            .parse(text, None, &HashMap::new())
            .unwrap()
    }

    #[test]
    fn test_release_date_header() {
        let outcome = parse(FEED);
        assert_eq!(
            outcome.release_date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn test_missing_date_header_is_an_error() {
        let result = ReleaseParser::new().parse("ABC\tX #1\t3.99\n", None, &HashMap::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_variants_merge_under_cheapest_listing() {
        let outcome = parse(FEED);
        let main = &outcome.comics["SPIDER-MAN 5"];

        assert_eq!(main.original_string, "SPIDER-MAN #5");
        assert_eq!(main.price, 3.99);
        assert!(!main.variant);
        assert_eq!(main.variants.len(), 1);
        assert_eq!(main.variants[0].original_string, "SPIDER-MAN #5 VARIANT");
        assert_eq!(main.variants[0].price, 4.99);
    }

    #[test]
    fn test_publisher_sections_apply_to_following_items() {
        let outcome = parse(FEED);
        assert_eq!(outcome.comics["SPIDER-MAN 5"].publisher, "Marvel Comics");
        assert_eq!(outcome.comics["BATMAN 100"].publisher, "DC Comics");
        assert_eq!(outcome.publishers, vec!["Marvel Comics", "DC Comics"]);
    }

    #[test]
    fn test_unrecognized_header_keeps_current_publisher() {
        let feed = "New Releases for 01/02/2024\n\
            MARVEL COMICS\n\
            SOME UNRELATED HEADER\n\
            ABC123\tSPIDER-MAN #5\t3.99\n";
        let outcome = parse(feed);
        assert_eq!(outcome.comics["SPIDER-MAN 5"].publisher, "Marvel Comics");
    }

    #[test]
    fn test_currency_noise_stripped_from_price() {
        let outcome = parse(FEED);
        assert_eq!(outcome.comics["BATMAN 100"].price, 4.99);
    }

    #[test]
    fn test_malformed_price_propagates_as_nan() {
        let feed = "New Releases for 01/02/2024\n\
            MARVEL COMICS\n\
            ABC123\tSPIDER-MAN #5\tPI\n";
        let outcome = parse(feed);
        assert!(outcome.comics["SPIDER-MAN 5"].price.is_nan());
    }

    #[test]
    fn test_cheap_unnumbered_listing_becomes_graphic_novel() {
        let feed = "New Releases for 01/02/2024\n\
            IMAGE COMICS\n\
            GHI300\tSAGA TP VOL 01\t6.99\n";
        let outcome = parse(feed);
        let gn = &outcome.comics["SAGA TP VOL 01"];
        assert_eq!(gn.number, NO_NUMBER);
        assert_eq!(gn.key(), gn.series);
    }

    #[test]
    fn test_expensive_unnumbered_listing_is_discarded() {
        let feed = "New Releases for 01/02/2024\n\
            IMAGE COMICS\n\
            GHI301\tSAGA POSTER PORTFOLIO\t24.99\n";
        let outcome = parse(feed);
        assert!(outcome.comics.is_empty());
        assert_eq!(outcome.parsed, 0);
    }

    #[test]
    fn test_printing_marker_sets_reprint() {
        let feed = "New Releases for 01/02/2024\n\
            MARVEL COMICS\n\
            ABC125\tSPIDER-MAN #4 2ND PTG\t3.99\n";
        let outcome = parse(feed);
        assert!(outcome.comics["SPIDER-MAN 4"].reprint);
    }

    #[test]
    fn test_short_noise_lines_skipped() {
        let feed = "New Releases for 01/02/2024\n\
            --\n\
            \n\
            MARVEL COMICS\n\
            ABC123\tSPIDER-MAN #5\t3.99\n";
        let outcome = parse(feed);
        assert_eq!(outcome.parsed, 1);
    }

    #[test]
    fn test_carriage_return_line_endings() {
        let feed = "New Releases for 01/02/2024\r\nMARVEL COMICS\r\nABC123\tSPIDER-MAN #5\t3.99\r\n";
        let outcome = parse(feed);
        assert_eq!(outcome.parsed, 1);
        assert!(outcome.comics.contains_key("SPIDER-MAN 5"));
    }

    #[test]
    fn test_duplicate_listing_counted_once() {
        let feed = "New Releases for 01/02/2024\n\
            MARVEL COMICS\n\
            ABC123\tSPIDER-MAN #5\t3.99\n\
            ABC123\tSPIDER-MAN #5\t3.99\n";
        let outcome = parse(feed);
        assert_eq!(outcome.parsed, 1);
        assert!(outcome.comics["SPIDER-MAN 5"].variants.is_empty());
    }

    #[test]
    fn test_same_date_refetch_carries_user_state_forward() {
        let first = parse(FEED);
        let mut prior = first.comics;
        prior.get_mut("SPIDER-MAN 5").unwrap().pulled = true;
        prior.get_mut("SPIDER-MAN 5").unwrap().id = 7;

        let second = ReleaseParser::new()
            .parse(FEED, Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()), &prior)
            .unwrap();

        let main = &second.comics["SPIDER-MAN 5"];
        assert!(main.pulled);
        assert_eq!(main.id, 7);
    }

    #[test]
    fn test_new_date_discards_prior_state() {
        let first = parse(FEED);
        let mut prior = first.comics;
        prior.get_mut("SPIDER-MAN 5").unwrap().pulled = true;

        let next_week = FEED.replace("01/02/2024", "01/09/2024");
        let second = ReleaseParser::new()
            .parse(
                &next_week,
                Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
                &prior,
            )
            .unwrap();

        assert!(!second.comics["SPIDER-MAN 5"].pulled);
    }

    #[test]
    fn test_same_date_refetch_keeps_unlisted_families() {
        let first = parse(FEED);
        let prior = first.comics;

        let shorter = "New Releases for 01/02/2024\n\
            MARVEL COMICS\n\
            ABC123\tSPIDER-MAN #5\t3.99\n";
        let second = ReleaseParser::new()
            .parse(shorter, Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()), &prior)
            .unwrap();

        // BATMAN 100 was not re-listed but the batch date is unchanged.
        assert!(second.comics.contains_key("BATMAN 100"));
        // The unlisted variant pools back under the re-listed main.
        assert_eq!(second.comics["SPIDER-MAN 5"].variants.len(), 1);
    }

    #[test]
    fn test_new_date_drops_unlisted_families() {
        let first = parse(FEED);
        let prior = first.comics;

        let next_week = "New Releases for 01/09/2024\n\
            MARVEL COMICS\n\
            ABC900\tSPIDER-MAN #6\t3.99\n";
        let second = ReleaseParser::new()
            .parse(
                next_week,
                Some(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()),
                &prior,
            )
            .unwrap();

        assert!(!second.comics.contains_key("BATMAN 100"));
        assert!(second.comics.contains_key("SPIDER-MAN 6"));
    }

    #[test]
    fn test_fractional_issue_numbers() {
        let feed = "New Releases for 01/02/2024\n\
            IMAGE COMICS\n\
            GHI310\tGIDEON FALLS #2.5\t3.99\n";
        let outcome = parse(feed);
        assert!(outcome.comics.contains_key("GIDEON FALLS 2.5"));
    }
}
