//! `users` table: the current user plus anyone who liked a post or comment.

use std::sync::Arc;

use reader_types::ReaderUser;
use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tracing::debug;

use crate::avatar::rewrite_avatar_url;
use crate::error::Result;
use crate::{ReaderDatabase, row_count};

const USER_COLUMNS: &str = "user_id, blog_id, user_name, display_name, url, profile_url, avatar_url";

pub struct UserTable {
    db: Arc<ReaderDatabase>,
}

impl UserTable {
    pub fn new(db: Arc<ReaderDatabase>) -> Self {
        Self { db }
    }

    pub fn count(&self) -> Result<i64> {
        self.db.with_conn(|conn| row_count(conn, "users"))
    }

    pub fn upsert(&self, user: &ReaderUser) -> Result<()> {
        self.upsert_batch(std::slice::from_ref(user))
    }

    /// Insert-or-replace each user by `user_id` in a single transaction.
    pub fn upsert_batch(&self, users: &[ReaderUser]) -> Result<()> {
        if users.is_empty() {
            return Ok(());
        }

        self.db.with_transaction(|tx| {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT OR REPLACE INTO users ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                USER_COLUMNS
            ))?;
            for user in users {
                stmt.execute(params![
                    user.user_id,
                    user.blog_id,
                    user.user_name,
                    user.display_name,
                    user.url,
                    user.profile_url,
                    user.avatar_url
                ])?;
            }
            Ok(())
        })?;
        debug!("Upserted {} users", users.len());
        Ok(())
    }

    /// Avatar URLs for `user_ids`, resized to `avatar_size`.
    ///
    /// If `current_user_id` is among the ids its avatar comes first and always
    /// counts toward `max` (`max <= 0` means no limit). Unknown ids are skipped.
    pub fn get_avatar_urls(
        &self,
        user_ids: &[i64],
        max: i32,
        avatar_size: u32,
        current_user_id: i64,
    ) -> Result<Vec<String>> {
        let ids = avatar_query_ids(user_ids, max, current_user_id);
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let rows = self.db.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT user_id, avatar_url FROM users WHERE user_id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })?;

        let mut avatars = Vec::with_capacity(rows.len());
        for (user_id, avatar_url) in rows {
            let url = rewrite_avatar_url(&avatar_url, avatar_size);
            if user_id == current_user_id {
                avatars.insert(0, url);
            } else {
                avatars.push(url);
            }
        }
        Ok(avatars)
    }

    pub fn get_current_user(&self, user_id: i64) -> Result<Option<ReaderUser>> {
        self.db.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE user_id = ?1", USER_COLUMNS);
            let user = conn.query_row(&sql, [user_id], user_from_row).optional()?;
            Ok(user)
        })
    }

    /// Users who liked the post, by display name. `max <= 0` returns all of them.
    pub fn get_users_who_like_post(&self, blog_id: i64, post_id: i64, max: i32) -> Result<Vec<ReaderUser>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE user_id IN
                     (SELECT user_id FROM post_likes WHERE blog_id = ?1 AND post_id = ?2)
                 ORDER BY display_name
                 LIMIT ?3",
                USER_COLUMNS
            );
            query_users(conn, &sql, params![blog_id, post_id, sql_limit(max)])
        })
    }

    pub fn get_users_who_like_comment(&self, blog_id: i64, comment_id: i64, max: i32) -> Result<Vec<ReaderUser>> {
        self.db.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM users WHERE user_id IN
                     (SELECT user_id FROM comment_likes WHERE blog_id = ?1 AND comment_id = ?2)
                 ORDER BY display_name
                 LIMIT ?3",
                USER_COLUMNS
            );
            query_users(conn, &sql, params![blog_id, comment_id, sql_limit(max)])
        })
    }
}

/// Ids to fetch: current user first (if requested), then the rest in input
/// order, deduplicated, until `max` is reached.
fn avatar_query_ids(user_ids: &[i64], max: i32, current_user_id: i64) -> Vec<i64> {
    let limit = usize::try_from(max).ok().filter(|m| *m > 0);
    let mut ids = Vec::new();

    if user_ids.contains(&current_user_id) {
        ids.push(current_user_id);
    }
    for &id in user_ids {
        if limit.is_some_and(|m| ids.len() >= m) {
            break;
        }
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// SQLite treats a negative LIMIT as unbounded.
fn sql_limit(max: i32) -> i64 {
    if max > 0 { i64::from(max) } else { -1 }
}

fn query_users<P: rusqlite::Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<ReaderUser>> {
    let mut stmt = conn.prepare(sql)?;
    let users = stmt
        .query_map(params, user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(users)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<ReaderUser> {
    let text = |name: &str| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(name)?.unwrap_or_default())
    };

    Ok(ReaderUser {
        user_id: row.get("user_id")?,
        blog_id: row.get::<_, Option<i64>>("blog_id")?.unwrap_or_default(),
        user_name: text("user_name")?,
        display_name: text("display_name")?,
        url: text("url")?,
        profile_url: text("profile_url")?,
        avatar_url: text("avatar_url")?,
    })
}
