use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use reader_db::{ReaderDatabase, TagTable, UserTable};
use reader_types::{ReaderTag, ReaderTagType, ReaderUser};

/// Inspect and maintain the local reader cache.
#[derive(Parser, Debug)]
#[command(name = "reader-cache", about = "Inspect and maintain the local reader cache", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Row counts per tag type and number of cached users
    Status,

    /// Replace every cached tag with the JSON array in FILE
    ImportTags {
        file: PathBuf,
    },

    /// Upsert users from a JSON array in REST API shape
    ImportUsers {
        file: PathBuf,
    },

    /// List tags that are due for a refresh
    Stale,

    /// Drop and recreate the cache schema
    Reset,
}

/// The table handles a command operates on, all sharing one database.
pub struct Cache {
    pub db: Arc<ReaderDatabase>,
    pub tags: TagTable,
    pub users: UserTable,
}

pub fn run(command: &Command, cache: &Cache, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Status => status(cache, out),
        Command::ImportTags { file: path } => {
            let tags: Vec<ReaderTag> = read_json(path)?;
            if tags.is_empty() {
                warn!("{} contains no tags, leaving cache untouched", path.display());
            }
            cache.tags.replace_all(&tags)?;
            info!("Imported {} tags from {}", tags.len(), path.display());
            writeln!(out, "imported {} tags", tags.len())?;
            Ok(())
        }
        Command::ImportUsers { file: path } => {
            let values: Vec<serde_json::Value> = read_json(path)?;
            let users = values
                .into_iter()
                .map(ReaderUser::from_json)
                .collect::<serde_json::Result<Vec<_>>>()
                .with_context(|| format!("invalid user in {}", path.display()))?;
            cache.users.upsert_batch(&users)?;
            info!("Imported {} users from {}", users.len(), path.display());
            writeln!(out, "imported {} users", users.len())?;
            Ok(())
        }
        Command::Stale => {
            for tag in cache.tags.get_all()? {
                if cache.tags.should_auto_update(&tag)? {
                    writeln!(out, "{}\t{}\t{}", tag.tag_type.as_str(), tag.slug, tag.label())?;
                }
            }
            Ok(())
        }
        Command::Reset => {
            cache.db.reset()?;
            writeln!(out, "cache reset")?;
            Ok(())
        }
    }
}

fn status(cache: &Cache, out: &mut impl Write) -> Result<()> {
    writeln!(out, "tags: {}", cache.tags.count()?)?;
    for tag_type in ReaderTagType::ALL {
        writeln!(out, "  {}: {}", tag_type.as_str(), cache.tags.count_of_type(tag_type)?)?;
    }
    writeln!(out, "users: {}", cache.users.count()?)?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> Cache {
        let db = Arc::new(ReaderDatabase::open_in_memory().unwrap());
        Cache {
            tags: TagTable::new(db.clone()),
            users: UserTable::new(db.clone()),
            db,
        }
    }

    fn run_to_string(command: &Command, cache: &Cache) -> String {
        let mut out = Vec::new();
        run(command, cache, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse() {
        let cli = Cli::try_parse_from(["reader-cache", "status"]).unwrap();
        assert_eq!(cli.command, Command::Status);

        let cli = Cli::try_parse_from(["reader-cache", "import-tags", "tags.json"]).unwrap();
        assert_eq!(
            cli.command,
            Command::ImportTags {
                file: PathBuf::from("tags.json")
            }
        );

        assert!(Cli::try_parse_from(["reader-cache", "import-users"]).is_err());
        assert!(Cli::try_parse_from(["reader-cache", "import-tags", "a.json", "b.json"]).is_err());
        assert!(Cli::try_parse_from(["reader-cache", "frobnicate"]).is_err());
        assert!(Cli::try_parse_from(["reader-cache"]).is_err());
    }

    #[test]
    fn test_import_and_status() {
        let dir = tempfile::tempdir().unwrap();
        let tags_path = dir.path().join("tags.json");
        std::fs::write(
            &tags_path,
            r#"[
                {"slug": "rust", "display_name": "Rust", "tag_type": "followed"},
                {"slug": "news", "display_name": "News", "endpoint": "/read/tags/news/posts"}
            ]"#,
        )
        .unwrap();
        let users_path = dir.path().join("users.json");
        std::fs::write(
            &users_path,
            r#"[{"ID": 1, "login": "ada", "name": "Ada", "avatar_URL": null}]"#,
        )
        .unwrap();

        let cache = cache();
        assert_eq!(run_to_string(&Command::ImportTags { file: tags_path }, &cache), "imported 2 tags\n");
        assert_eq!(run_to_string(&Command::ImportUsers { file: users_path }, &cache), "imported 1 users\n");

        let status = run_to_string(&Command::Status, &cache);
        assert!(status.starts_with("tags: 2\n"));
        assert!(status.contains("  followed: 1\n"));
        assert!(status.contains("  default: 1\n"));
        assert!(status.ends_with("users: 1\n"));
    }

    #[test]
    fn test_stale_lists_never_updated_tags() {
        let cache = cache();
        let fresh = ReaderTag::new("fresh", "Fresh", "", "", ReaderTagType::Followed);
        let stale = ReaderTag::new("stale", "Stale", "", "", ReaderTagType::Followed);
        cache.tags.upsert_batch(&[fresh.clone(), stale]).unwrap();
        cache.tags.touch_updated(&fresh).unwrap();

        assert_eq!(run_to_string(&Command::Stale, &cache), "followed\tstale\tStale\n");
    }

    #[test]
    fn test_reset() {
        let cache = cache();
        cache
            .tags
            .upsert(&ReaderTag::new("rust", "", "", "", ReaderTagType::Default))
            .unwrap();

        run_to_string(&Command::Reset, &cache);
        assert!(cache.tags.is_empty().unwrap());
    }

    #[test]
    fn test_import_missing_file_fails() {
        let cache = cache();
        let mut out = Vec::new();
        let result = run(
            &Command::ImportTags {
                file: PathBuf::from("/nonexistent/tags.json"),
            },
            &cache,
            &mut out,
        );
        assert!(result.is_err());
    }
}
