use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{LongboxError, Result};
use crate::domain::Comic;
use crate::store::{ticks, Store};

const COMIC_COLUMNS: &str = "id, series, number, writer, artist, cover_artist, publisher, \
     description, price, pulled, watched, code, cover_url, reprint, variant, \
     release_date, original_string, main_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.lock()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|_| LongboxError::Database(rusqlite::Error::InvalidQuery))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            LongboxError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn map_comic(row: &Row<'_>) -> rusqlite::Result<Comic> {
        Ok(Comic {
            id: row.get(0)?,
            series: row.get(1)?,
            number: row.get(2)?,
            writer: row.get(3)?,
            artist: row.get(4)?,
            cover_artist: row.get(5)?,
            publisher: row.get(6)?,
            description: row.get(7)?,
            price: row.get::<_, Option<f64>>(8)?.unwrap_or(f64::NAN),
            pulled: row.get::<_, i32>(9)? != 0,
            watched: row.get::<_, i32>(10)? != 0,
            code: row.get(11)?,
            cover_url: row.get(12)?,
            reprint: row.get::<_, i32>(13)? != 0,
            variant: row.get::<_, i32>(14)? != 0,
            release_date: ticks::to_date(row.get(15)?).unwrap_or_default(),
            original_string: row.get(16)?,
            main_id: row.get(17)?,
            variants: Vec::new(),
        })
    }
}

impl Store for SqliteStore {
    fn save_comic(&self, comic: &Comic) -> Result<i64> {
        let conn = self.lock()?;
        let date_ticks = ticks::from_date(comic.release_date);
        // SQLite has no NaN; malformed prices persist as NULL
        let price: Option<f64> = (!comic.price.is_nan()).then_some(comic.price);

        conn.execute(
            "INSERT INTO comics (series, number, writer, artist, cover_artist, publisher,
                                 description, price, pulled, watched, code, cover_url,
                                 reprint, variant, release_date, original_string, main_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
             ON CONFLICT(original_string, release_date) DO UPDATE SET
                 series = excluded.series,
                 number = excluded.number,
                 writer = excluded.writer,
                 artist = excluded.artist,
                 cover_artist = excluded.cover_artist,
                 publisher = excluded.publisher,
                 description = excluded.description,
                 price = excluded.price,
                 pulled = excluded.pulled,
                 watched = excluded.watched,
                 code = excluded.code,
                 cover_url = excluded.cover_url,
                 reprint = excluded.reprint,
                 variant = excluded.variant,
                 main_id = excluded.main_id",
            params![
                comic.series,
                comic.number,
                comic.writer,
                comic.artist,
                comic.cover_artist,
                comic.publisher,
                comic.description,
                price,
                comic.pulled as i32,
                comic.watched as i32,
                comic.code,
                comic.cover_url,
                comic.reprint as i32,
                comic.variant as i32,
                date_ticks,
                comic.original_string,
                comic.main_id,
            ],
        )?;

        let id = conn.query_row(
            "SELECT id FROM comics WHERE original_string = ?1 AND release_date = ?2",
            params![comic.original_string, date_ticks],
            |row| row.get(0),
        )?;

        Ok(id)
    }

    fn comic(&self, id: i64) -> Result<Option<Comic>> {
        let conn = self.lock()?;
        let result = conn
            .query_row(
                &format!("SELECT {COMIC_COLUMNS} FROM comics WHERE id = ?1"),
                params![id],
                Self::map_comic,
            )
            .optional()?;
        Ok(result)
    }

    fn comics_for_date(&self, date: NaiveDate) -> Result<Vec<Comic>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {COMIC_COLUMNS} FROM comics WHERE release_date = ?1 ORDER BY original_string"
        ))?;

        let rows = stmt
            .query_map(params![ticks::from_date(date)], Self::map_comic)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let (mains, variants): (Vec<_>, Vec<_>) = rows.into_iter().partition(|c| !c.variant);
        let mut by_id: HashMap<i64, Comic> = mains.into_iter().map(|c| (c.id, c)).collect();

        let mut orphans = Vec::new();
        for variant in variants {
            match by_id.get_mut(&variant.main_id) {
                Some(main) => main.variants.push(variant),
                None => {
                    tracing::debug!(
                        "variant {} has no main record, keeping top-level",
                        variant.original_string
                    );
                    orphans.push(variant);
                }
            }
        }

        let mut comics: Vec<Comic> = by_id.into_values().chain(orphans).collect();
        comics.sort_by(|a, b| a.key().to_lowercase().cmp(&b.key().to_lowercase()));
        Ok(comics)
    }

    fn set_flags(&self, id: i64, pulled: bool, watched: bool) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE comics SET pulled = ?1, watched = ?2 WHERE id = ?3",
            params![pulled as i32, watched as i32, id],
        )?;
        Ok(())
    }

    fn delete_except(&self, keep: NaiveDate) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM comics
             WHERE release_date != ?1
               AND pulled = 0 AND watched = 0
               AND main_id NOT IN (SELECT id FROM comics WHERE pulled = 1 OR watched = 1)",
            params![ticks::from_date(keep)],
        )?;
        Ok(removed)
    }

    fn all_dates(&self) -> Result<Vec<NaiveDate>> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT DISTINCT release_date FROM comics ORDER BY release_date")?;

        let dates = stmt
            .query_map([], |row| row.get::<_, i64>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(ticks::to_date)
            .collect();

        Ok(dates)
    }

    fn pref(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        let value = conn
            .query_row(
                "SELECT value FROM prefs WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_pref(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO prefs (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value],
        )?;
        Ok(())
    }

    fn delete_pref(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM prefs WHERE key = ?1", params![key])?;
        Ok(())
    }
}
