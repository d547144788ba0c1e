use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "reader.db";
pub const DEFAULT_AUTO_UPDATE_DELAY_MINUTES: i64 = 10;
pub const DEFAULT_READER_POOL_SIZE: usize = 4;

/// Cache settings, read from `READER_*` environment variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub db_path: PathBuf,
    /// Minutes after which a tag's cached content is due for a refresh.
    pub auto_update_delay_minutes: i64,
    pub reader_pool_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            auto_update_delay_minutes: DEFAULT_AUTO_UPDATE_DELAY_MINUTES,
            reader_pool_size: DEFAULT_READER_POOL_SIZE,
        }
    }
}

impl CacheConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unparseable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("READER_DB_PATH")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));
        let auto_update_delay_minutes = lookup("READER_AUTO_UPDATE_DELAY_MINUTES")
            .and_then(|v| v.trim().parse().ok())
            .filter(|m: &i64| *m >= 0)
            .unwrap_or(DEFAULT_AUTO_UPDATE_DELAY_MINUTES);
        let reader_pool_size = lookup("READER_POOL_SIZE")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_READER_POOL_SIZE)
            .max(1);

        Self {
            db_path,
            auto_update_delay_minutes,
            reader_pool_size,
        }
    }
}
