use crate::app::{AppContext, LongboxError, Result};
use crate::domain::Comic;
use crate::store::Store;

pub async fn refresh(ctx: &AppContext) -> Result<()> {
    let mut collection = ctx.collection();
    collection.load()?;

    println!("Refreshing release list...");
    let summary = collection.refresh().await?;

    println!(
        "Releases for {}: {} listings parsed into {} comics ({} pulled, {} watched)",
        summary.release_date, summary.parsed, summary.comics, summary.pulled, summary.watched
    );
    Ok(())
}

pub fn list(
    ctx: &AppContext,
    publisher: Option<&str>,
    only_pulled: bool,
    only_watched: bool,
) -> Result<()> {
    let mut collection = ctx.collection();
    collection.load()?;

    let comics = match publisher {
        Some(p) => collection.comics_for_publisher(p),
        None => collection.all_comics(),
    };

    let mut shown = 0;
    for comic in comics {
        if only_pulled && !comic.pulled {
            continue;
        }
        if only_watched && !comic.watched {
            continue;
        }
        println!("{}", format_line(comic));
        shown += 1;
    }

    if shown == 0 {
        println!("No comics");
    }
    Ok(())
}

pub fn publishers(ctx: &AppContext) -> Result<()> {
    let mut collection = ctx.collection();
    collection.load()?;

    if collection.publishers().is_empty() {
        println!("No publishers");
        return Ok(());
    }

    for publisher in collection.publishers() {
        let count = collection.comics_for_publisher(publisher).len();
        println!("{} ({} comics)", publisher, count);
    }
    Ok(())
}

pub fn pull(ctx: &AppContext, title: &str, value: bool) -> Result<()> {
    let mut collection = ctx.collection();
    collection.load()?;

    let display = collection
        .comic(title)
        .map(Comic::title)
        .ok_or_else(|| LongboxError::ComicNotFound(title.to_string()))?;
    collection.set_pulled(title, value)?;

    println!("{} {}", if value { "Pulled" } else { "Unpulled" }, display);
    Ok(())
}

pub fn watch(ctx: &AppContext, title: &str, value: bool) -> Result<()> {
    let mut collection = ctx.collection();
    collection.load()?;

    let display = collection
        .comic(title)
        .map(Comic::title)
        .ok_or_else(|| LongboxError::ComicNotFound(title.to_string()))?;
    collection.set_watched(title, value)?;

    println!("{} {}", if value { "Watching" } else { "Unwatched" }, display);
    Ok(())
}

pub fn dates(ctx: &AppContext) -> Result<()> {
    let dates = ctx.store.all_dates()?;
    if dates.is_empty() {
        println!("No stored release dates");
        return Ok(());
    }
    for date in dates {
        println!("{}", date);
    }
    Ok(())
}

fn format_line(comic: &Comic) -> String {
    let marker = match (comic.pulled, comic.watched) {
        (true, _) => "P",
        (false, true) => "W",
        _ => " ",
    };

    let price = if comic.price.is_nan() {
        "  ?  ".to_string()
    } else {
        format!("{:5.2}", comic.price)
    };

    let mut line = format!("{} {} {}  [{}]", marker, price, comic.title(), comic.publisher);
    if !comic.variants.is_empty() {
        line.push_str(&format!(" (+{} variants)", comic.variants.len()));
    }
    if comic.reprint {
        line.push_str(" (reprint)");
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::NaiveDate;

    #[test]
    fn test_format_line_markers_and_variants() {
        let mut comic = Comic::new(
            "SPIDER-MAN".into(),
            5.0,
            "SPIDER-MAN #5".into(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        comic.price = 3.99;
        comic.publisher = "Marvel Comics".into();
        comic.pulled = true;

        let mut variant = comic.clone();
        variant.original_string = "SPIDER-MAN #5 VARIANT".into();
        comic.absorb_variant(variant);

        let line = format_line(&comic);
        assert!(line.starts_with("P "));
        assert!(line.contains("SPIDER-MAN #5"));
        assert!(line.contains("(+1 variants)"));
    }

    #[test]
    fn test_format_line_nan_price() {
        let comic = Comic::new(
            "SPIDER-MAN".into(),
            5.0,
            "SPIDER-MAN #5".into(),
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
        );
        let line = format_line(&comic);
        assert!(line.contains("?"));
        assert!(!line.contains("NaN"));
    }
}
