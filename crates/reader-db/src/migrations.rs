use rusqlite::Connection;
use tracing::info;

use crate::error::Result;

pub const SCHEMA_VERSION: i64 = 2;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Reader DB: running migration v1 (tags, users)");
        conn.execute_batch(
            "
            CREATE TABLE tags (
                slug            TEXT COLLATE NOCASE,
                display_name    TEXT COLLATE NOCASE,
                title           TEXT COLLATE NOCASE,
                type            INTEGER DEFAULT 0,
                endpoint        TEXT,
                date_updated    TEXT,
                PRIMARY KEY (slug, type)
            );

            CREATE TABLE users (
                user_id         INTEGER PRIMARY KEY,
                blog_id         INTEGER DEFAULT 0,
                user_name       TEXT,
                display_name    TEXT COLLATE NOCASE,
                url             TEXT,
                profile_url     TEXT,
                avatar_url      TEXT
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Reader DB: running migration v2 (likes)");
        conn.execute_batch(
            "
            CREATE TABLE post_likes (
                post_id     INTEGER,
                blog_id     INTEGER,
                user_id     INTEGER,
                PRIMARY KEY (blog_id, post_id, user_id)
            );

            CREATE TABLE comment_likes (
                comment_id  INTEGER,
                blog_id     INTEGER,
                user_id     INTEGER,
                PRIMARY KEY (blog_id, comment_id, user_id)
            );

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    Ok(())
}

pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS tags;
        DROP TABLE IF EXISTS users;
        DROP TABLE IF EXISTS post_likes;
        DROP TABLE IF EXISTS comment_likes;
        DROP TABLE IF EXISTS schema_version;
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(conn: &Connection) -> i64 {
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_run_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();
        assert_eq!(version(&conn), SCHEMA_VERSION);
    }

    #[test]
    fn test_upgrades_from_v1() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        conn.execute_batch(
            "DROP TABLE post_likes; DROP TABLE comment_likes; DELETE FROM schema_version WHERE version = 2;",
        )
        .unwrap();

        run(&conn).unwrap();
        assert_eq!(version(&conn), 2);
        conn.execute("INSERT INTO post_likes (blog_id, post_id, user_id) VALUES (1, 2, 3)", [])
            .unwrap();
    }

    #[test]
    fn test_tag_key_is_slug_and_type() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();

        conn.execute("INSERT INTO tags (slug, type) VALUES ('Travel', 0)", []).unwrap();
        conn.execute("INSERT INTO tags (slug, type) VALUES ('travel', 1)", []).unwrap();
        // NOCASE makes this a duplicate key
        assert!(conn.execute("INSERT INTO tags (slug, type) VALUES ('TRAVEL', 0)", []).is_err());
    }
}
