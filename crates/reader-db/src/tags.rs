//! `tags` table: the tags the user follows or gets by default, keyed by `(slug, type)`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reader_types::{ReaderTag, ReaderTagType};
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, error, warn};

use crate::config::{CacheConfig, DEFAULT_AUTO_UPDATE_DELAY_MINUTES};
use crate::dates;
use crate::error::Result;
use crate::{ReaderDatabase, row_count};

const TAG_COLUMNS: &str = "slug, display_name, title, type, endpoint, date_updated";

pub struct TagTable {
    db: Arc<ReaderDatabase>,
    auto_update_delay_minutes: i64,
}

impl TagTable {
    pub fn new(db: Arc<ReaderDatabase>) -> Self {
        Self {
            db,
            auto_update_delay_minutes: DEFAULT_AUTO_UPDATE_DELAY_MINUTES,
        }
    }

    pub fn from_config(db: Arc<ReaderDatabase>, config: &CacheConfig) -> Self {
        Self::new(db).with_auto_update_delay(config.auto_update_delay_minutes)
    }

    /// Negative delays are clamped to zero.
    pub fn with_auto_update_delay(mut self, minutes: i64) -> Self {
        self.auto_update_delay_minutes = minutes.max(0);
        self
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.count()? == 0)
    }

    pub fn count(&self) -> Result<i64> {
        self.db.with_conn(|conn| row_count(conn, "tags"))
    }

    pub fn count_of_type(&self, tag_type: ReaderTagType) -> Result<i64> {
        self.db.with_conn(|conn| {
            let count = conn.query_row(
                "SELECT COUNT(*) FROM tags WHERE type = ?1",
                [tag_type.to_i64()],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    // -- Writes --

    /// Replace every tag with `tags` in one transaction. Empty input leaves the table alone.
    pub fn replace_all(&self, tags: &[ReaderTag]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        let result = self.db.with_transaction(|tx| {
            tx.execute("DELETE FROM tags", [])?;
            insert_or_replace(tx, tags)
        });
        if let Err(e) = &result {
            error!("Failed to replace tags, keeping previous set: {}", e);
        }
        result
    }

    /// Like `replace_all`, but only followed tags are removed first.
    pub fn replace_followed(&self, tags: &[ReaderTag]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        let result = self.db.with_transaction(|tx| {
            tx.execute(
                "DELETE FROM tags WHERE type = ?1",
                [ReaderTagType::Followed.to_i64()],
            )?;
            insert_or_replace(tx, tags)
        });
        if let Err(e) = &result {
            error!("Failed to replace followed tags, keeping previous set: {}", e);
        }
        result
    }

    pub fn upsert(&self, tag: &ReaderTag) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(tag))
    }

    /// Insert-or-replace each tag by `(slug, type)`. All or nothing.
    pub fn upsert_batch(&self, tags: &[ReaderTag]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        self.db.with_transaction(|tx| insert_or_replace(tx, tags))?;
        debug!("Upserted {} tags", tags.len());
        Ok(())
    }

    pub fn delete(&self, tag: &ReaderTag) -> Result<()> {
        self.delete_batch(std::slice::from_ref(tag))
    }

    pub fn delete_batch(&self, tags: &[ReaderTag]) -> Result<()> {
        if tags.is_empty() {
            return Ok(());
        }

        self.db.with_transaction(|tx| {
            let mut stmt = tx.prepare_cached("DELETE FROM tags WHERE slug = ?1 AND type = ?2")?;
            for tag in tags {
                stmt.execute(params![tag.slug, tag.tag_type.to_i64()])?;
            }
            Ok(())
        })?;
        debug!("Deleted {} tags", tags.len());
        Ok(())
    }

    // -- Lookups --

    pub fn exists(&self, tag: &ReaderTag) -> Result<bool> {
        self.db
            .with_conn(|conn| exists_of_type(conn, &tag.slug, tag.tag_type))
    }

    pub fn is_followed_tag_name(&self, slug: &str) -> Result<bool> {
        if slug.is_empty() {
            return Ok(false);
        }
        self.db
            .with_conn(|conn| exists_of_type(conn, slug, ReaderTagType::Followed))
    }

    pub fn get(&self, slug: &str, tag_type: ReaderTagType) -> Result<Option<ReaderTag>> {
        if slug.is_empty() {
            return Ok(None);
        }

        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM tags WHERE slug = ?1 AND type = ?2 LIMIT 1",
                TAG_COLUMNS
            );
            query_one(conn, &sql, params![slug, tag_type.to_i64()])
        })
    }

    /// First tag whose endpoint ends with `endpoint`.
    pub fn get_by_endpoint_suffix(&self, endpoint: &str) -> Result<Option<ReaderTag>> {
        if endpoint.is_empty() {
            return Ok(None);
        }

        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tags WHERE endpoint LIKE ?1 LIMIT 1", TAG_COLUMNS);
            query_one(conn, &sql, params![format!("%{}", endpoint)])
        })
    }

    pub fn get_endpoint(&self, tag: &ReaderTag) -> Result<Option<String>> {
        self.db.with_conn(|conn| {
            let endpoint: Option<Option<String>> = conn
                .query_row(
                    "SELECT endpoint FROM tags WHERE slug = ?1 AND type = ?2",
                    params![tag.slug, tag.tag_type.to_i64()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(endpoint.flatten())
        })
    }

    pub fn get_all_of_type(&self, tag_type: ReaderTagType) -> Result<Vec<ReaderTag>> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tags WHERE type = ?1 ORDER BY slug", TAG_COLUMNS);
            query_many(conn, &sql, params![tag_type.to_i64()])
        })
    }

    pub fn get_default(&self) -> Result<Vec<ReaderTag>> {
        self.get_all_of_type(ReaderTagType::Default)
    }

    pub fn get_followed(&self) -> Result<Vec<ReaderTag>> {
        self.get_all_of_type(ReaderTagType::Followed)
    }

    pub fn get_custom_list(&self) -> Result<Vec<ReaderTag>> {
        self.get_all_of_type(ReaderTagType::CustomList)
    }

    pub fn get_bookmarked(&self) -> Result<Vec<ReaderTag>> {
        self.get_all_of_type(ReaderTagType::Bookmarked)
    }

    pub fn get_discover_post_cards(&self) -> Result<Vec<ReaderTag>> {
        self.get_all_of_type(ReaderTagType::DiscoverPostCards)
    }

    pub fn get_all(&self) -> Result<Vec<ReaderTag>> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tags ORDER BY slug, type", TAG_COLUMNS);
            query_many(conn, &sql, [])
        })
    }

    pub fn get_first(&self) -> Result<Option<ReaderTag>> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM tags ORDER BY slug, type LIMIT 1", TAG_COLUMNS);
            query_one(conn, &sql, [])
        })
    }

    // -- Freshness --

    /// Stored `date_updated`, or an empty string if the tag is unknown or was never touched.
    pub fn get_last_updated(&self, tag: &ReaderTag) -> Result<String> {
        self.db.with_conn(|conn| {
            let updated: Option<Option<String>> = conn
                .query_row(
                    "SELECT date_updated FROM tags WHERE slug = ?1 AND type = ?2",
                    params![tag.slug, tag.tag_type.to_i64()],
                    |r| r.get(0),
                )
                .optional()?;
            Ok(updated.flatten().unwrap_or_default())
        })
    }

    pub fn touch_updated(&self, tag: &ReaderTag) -> Result<()> {
        self.set_last_updated(tag, Utc::now())
    }

    /// Mark the tag as never updated.
    pub fn clear_updated(&self, tag: &ReaderTag) -> Result<()> {
        self.set_last_updated(tag, DateTime::<Utc>::UNIX_EPOCH)
    }

    pub fn set_last_updated(&self, tag: &ReaderTag, when: DateTime<Utc>) -> Result<()> {
        let date = dates::iso8601_from(when);
        self.db.with_conn_mut(|conn| {
            conn.execute(
                "UPDATE tags SET date_updated = ?1 WHERE slug = ?2 AND type = ?3",
                params![date, tag.slug, tag.tag_type.to_i64()],
            )?;
            Ok(())
        })
    }

    pub fn should_auto_update(&self, tag: &ReaderTag) -> Result<bool> {
        self.should_auto_update_at(tag, Utc::now())
    }

    /// True if the tag was never updated or is at least the configured
    /// number of whole minutes old as of `now`.
    pub fn should_auto_update_at(&self, tag: &ReaderTag, now: DateTime<Utc>) -> Result<bool> {
        let updated = self.get_last_updated(tag)?;
        Ok(match minutes_since(&updated, now) {
            None => true,
            Some(minutes) => minutes >= self.auto_update_delay_minutes,
        })
    }
}

/// `None` means never updated. Garbage timestamps count as fresh.
fn minutes_since(updated: &str, now: DateTime<Utc>) -> Option<i64> {
    if updated.is_empty() {
        return None;
    }
    match dates::parse_iso8601(updated) {
        Some(dt) => Some(dates::minutes_between(dt, now)),
        None => {
            warn!("Unparseable tag timestamp {:?}, treating as fresh", updated);
            Some(0)
        }
    }
}

fn insert_or_replace(conn: &Connection, tags: &[ReaderTag]) -> Result<()> {
    let mut stmt = conn.prepare_cached(
        "INSERT OR REPLACE INTO tags (slug, display_name, title, type, endpoint)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for tag in tags {
        stmt.execute(params![
            tag.slug,
            tag.display_name,
            tag.title,
            tag.tag_type.to_i64(),
            tag.endpoint
        ])?;
    }
    Ok(())
}

fn exists_of_type(conn: &Connection, slug: &str, tag_type: ReaderTagType) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM tags WHERE slug = ?1 AND type = ?2",
            params![slug, tag_type.to_i64()],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

fn query_one<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Option<ReaderTag>> {
    let mut stmt = conn.prepare(sql)?;
    let tag = stmt.query_row(params, tag_from_row).optional()?;
    Ok(tag)
}

fn query_many<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ReaderTag>> {
    let mut stmt = conn.prepare(sql)?;
    let tags = stmt
        .query_map(params, tag_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tags)
}

/// A NULL slug or a non-integer type is a malformed row and fails the read.
fn tag_from_row(row: &Row<'_>) -> rusqlite::Result<ReaderTag> {
    Ok(ReaderTag {
        slug: row.get("slug")?,
        display_name: row.get::<_, Option<String>>("display_name")?.unwrap_or_default(),
        title: row.get::<_, Option<String>>("title")?.unwrap_or_default(),
        tag_type: ReaderTagType::from_i64(row.get("type")?),
        endpoint: row.get::<_, Option<String>>("endpoint")?.unwrap_or_default(),
        date_updated: row.get("date_updated")?,
    })
}
