//! `post_likes` / `comment_likes`: which users liked which post or comment.

use std::sync::Arc;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::ReaderDatabase;
use crate::error::Result;

/// What a like is attached to. Selects the association table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LikeTarget {
    Post,
    Comment,
}

impl LikeTarget {
    fn table(self) -> &'static str {
        match self {
            Self::Post => "post_likes",
            Self::Comment => "comment_likes",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            Self::Post => "post_id",
            Self::Comment => "comment_id",
        }
    }
}

pub struct LikeTable {
    db: Arc<ReaderDatabase>,
}

impl LikeTable {
    pub fn new(db: Arc<ReaderDatabase>) -> Self {
        Self { db }
    }

    // -- Posts --

    /// Replace the set of users who liked a post.
    pub fn set_likes_for_post(&self, blog_id: i64, post_id: i64, user_ids: &[i64]) -> Result<()> {
        self.set_likes(LikeTarget::Post, blog_id, post_id, user_ids)
    }

    pub fn set_current_user_likes_post(&self, blog_id: i64, post_id: i64, user_id: i64, liked: bool) -> Result<()> {
        self.set_user_like(LikeTarget::Post, blog_id, post_id, user_id, liked)
    }

    pub fn get_likes_for_post(&self, blog_id: i64, post_id: i64) -> Result<Vec<i64>> {
        self.get_likes(LikeTarget::Post, blog_id, post_id)
    }

    pub fn count_likes_for_post(&self, blog_id: i64, post_id: i64) -> Result<i64> {
        self.count_likes(LikeTarget::Post, blog_id, post_id)
    }

    pub fn is_post_liked_by(&self, blog_id: i64, post_id: i64, user_id: i64) -> Result<bool> {
        self.is_liked_by(LikeTarget::Post, blog_id, post_id, user_id)
    }

    // -- Comments --

    pub fn set_likes_for_comment(&self, blog_id: i64, comment_id: i64, user_ids: &[i64]) -> Result<()> {
        self.set_likes(LikeTarget::Comment, blog_id, comment_id, user_ids)
    }

    pub fn set_current_user_likes_comment(
        &self,
        blog_id: i64,
        comment_id: i64,
        user_id: i64,
        liked: bool,
    ) -> Result<()> {
        self.set_user_like(LikeTarget::Comment, blog_id, comment_id, user_id, liked)
    }

    pub fn get_likes_for_comment(&self, blog_id: i64, comment_id: i64) -> Result<Vec<i64>> {
        self.get_likes(LikeTarget::Comment, blog_id, comment_id)
    }

    pub fn count_likes_for_comment(&self, blog_id: i64, comment_id: i64) -> Result<i64> {
        self.count_likes(LikeTarget::Comment, blog_id, comment_id)
    }

    pub fn is_comment_liked_by(&self, blog_id: i64, comment_id: i64, user_id: i64) -> Result<bool> {
        self.is_liked_by(LikeTarget::Comment, blog_id, comment_id, user_id)
    }

    /// Forget every like.
    pub fn purge(&self) -> Result<()> {
        self.db.with_transaction(|tx| {
            tx.execute("DELETE FROM post_likes", [])?;
            tx.execute("DELETE FROM comment_likes", [])?;
            Ok(())
        })
    }

    // -- Shared --

    fn set_likes(&self, target: LikeTarget, blog_id: i64, item_id: i64, user_ids: &[i64]) -> Result<()> {
        self.db.with_transaction(|tx| {
            tx.execute(
                &format!(
                    "DELETE FROM {} WHERE blog_id = ?1 AND {} = ?2",
                    target.table(),
                    target.id_column()
                ),
                params![blog_id, item_id],
            )?;
            for &user_id in user_ids {
                insert_like(tx, target, blog_id, item_id, user_id)?;
            }
            Ok(())
        })?;
        debug!(
            "Stored {} likes for {:?} {}/{}",
            user_ids.len(),
            target,
            blog_id,
            item_id
        );
        Ok(())
    }

    fn set_user_like(&self, target: LikeTarget, blog_id: i64, item_id: i64, user_id: i64, liked: bool) -> Result<()> {
        self.db.with_conn_mut(|conn| {
            if liked {
                insert_like(conn, target, blog_id, item_id, user_id)
            } else {
                conn.execute(
                    &format!(
                        "DELETE FROM {} WHERE blog_id = ?1 AND {} = ?2 AND user_id = ?3",
                        target.table(),
                        target.id_column()
                    ),
                    params![blog_id, item_id, user_id],
                )?;
                Ok(())
            }
        })
    }

    fn get_likes(&self, target: LikeTarget, blog_id: i64, item_id: i64) -> Result<Vec<i64>> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT user_id FROM {} WHERE blog_id = ?1 AND {} = ?2 ORDER BY user_id",
                target.table(),
                target.id_column()
            ))?;
            let ids = stmt
                .query_map(params![blog_id, item_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    fn count_likes(&self, target: LikeTarget, blog_id: i64, item_id: i64) -> Result<i64> {
        self.db.with_conn(|conn| {
            let count = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM {} WHERE blog_id = ?1 AND {} = ?2",
                    target.table(),
                    target.id_column()
                ),
                params![blog_id, item_id],
                |r| r.get(0),
            )?;
            Ok(count)
        })
    }

    fn is_liked_by(&self, target: LikeTarget, blog_id: i64, item_id: i64, user_id: i64) -> Result<bool> {
        self.db.with_conn(|conn| {
            let found = conn
                .query_row(
                    &format!(
                        "SELECT 1 FROM {} WHERE blog_id = ?1 AND {} = ?2 AND user_id = ?3",
                        target.table(),
                        target.id_column()
                    ),
                    params![blog_id, item_id, user_id],
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }
}

fn insert_like(conn: &Connection, target: LikeTarget, blog_id: i64, item_id: i64, user_id: i64) -> Result<()> {
    conn.execute(
        &format!(
            "INSERT OR REPLACE INTO {} (blog_id, {}, user_id) VALUES (?1, ?2, ?3)",
            target.table(),
            target.id_column()
        ),
        params![blog_id, item_id, user_id],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> LikeTable {
        LikeTable::new(Arc::new(ReaderDatabase::open_in_memory().unwrap()))
    }

    #[test]
    fn test_set_likes_replaces_previous_set() {
        let t = table();
        t.set_likes_for_post(1, 10, &[3, 1, 2]).unwrap();
        t.set_likes_for_post(1, 10, &[4, 2]).unwrap();

        assert_eq!(t.get_likes_for_post(1, 10).unwrap(), vec![2, 4]);
        assert_eq!(t.count_likes_for_post(1, 10).unwrap(), 2);
    }

    #[test]
    fn test_posts_and_comments_are_separate() {
        let t = table();
        t.set_likes_for_post(1, 10, &[5]).unwrap();
        t.set_likes_for_comment(1, 10, &[6]).unwrap();

        assert_eq!(t.get_likes_for_post(1, 10).unwrap(), vec![5]);
        assert_eq!(t.get_likes_for_comment(1, 10).unwrap(), vec![6]);
        assert!(t.get_likes_for_post(2, 10).unwrap().is_empty());
    }

    #[test]
    fn test_toggle_current_user_like() {
        let t = table();
        t.set_current_user_likes_post(1, 10, 42, true).unwrap();
        t.set_current_user_likes_post(1, 10, 42, true).unwrap();
        assert!(t.is_post_liked_by(1, 10, 42).unwrap());
        assert_eq!(t.count_likes_for_post(1, 10).unwrap(), 1);

        t.set_current_user_likes_post(1, 10, 42, false).unwrap();
        assert!(!t.is_post_liked_by(1, 10, 42).unwrap());

        t.set_current_user_likes_comment(1, 7, 42, true).unwrap();
        assert!(t.is_comment_liked_by(1, 7, 42).unwrap());
        assert_eq!(t.count_likes_for_comment(1, 7).unwrap(), 1);
    }

    #[test]
    fn test_purge() {
        let t = table();
        t.set_likes_for_post(1, 10, &[1, 2]).unwrap();
        t.set_likes_for_comment(1, 11, &[3]).unwrap();
        t.purge().unwrap();

        assert_eq!(t.count_likes_for_post(1, 10).unwrap(), 0);
        assert_eq!(t.count_likes_for_comment(1, 11).unwrap(), 0);
    }
}
