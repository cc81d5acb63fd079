//! Runtime configuration, read from `LECTIO_*` environment variables

use crate::error::LectioError;
use crate::search::SEARCH_LIMIT;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_BASE_URL: &str = "https://lectio.app/data/";

#[derive(Debug, Clone, PartialEq)]
pub struct LectioConfig {
    /// Offline cache for translation files and the local manifest.
    pub data_dir: PathBuf,
    pub settings_db: PathBuf,
    /// Translation files are fetched from `<base_url><file name>`.
    pub base_url: String,
    pub search_limit: usize,
    pub search_delay: Duration,
}

fn default_search_delay_ms() -> u64 {
    0
}

impl LectioConfig {
    pub fn from_env() -> Result<Self, LectioError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, LectioError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = lookup("LECTIO_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(get_data_dir);
        let settings_db = lookup("LECTIO_SETTINGS_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("settings.db"));

        let mut base_url = lookup("LECTIO_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        if !(base_url.starts_with("https://") || base_url.starts_with("http://")) {
            return Err(LectioError::Config(format!(
                "LECTIO_BASE_URL must be an http(s) URL, got '{}'",
                base_url
            )));
        }
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        let search_limit = parse_or(&lookup, "LECTIO_SEARCH_LIMIT", SEARCH_LIMIT);
        let search_delay = Duration::from_millis(parse_or(
            &lookup,
            "LECTIO_SEARCH_DELAY_MS",
            default_search_delay_ms(),
        ));

        Ok(Self {
            data_dir,
            settings_db,
            base_url,
            search_limit,
            search_delay,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + Copy,
{
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key = %key, value = %raw, "invalid number, using default");
            default
        }),
    }
}

/// Resolve the data directory
///
/// - Development: an existing `data/` directory in or above the working directory
/// - Otherwise: the platform data directory (`~/.local/share/Lectio`, `~/Library/Application Support/Lectio`, ...)
/// - Fallback: `./data`
pub fn get_data_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        let dev_paths = [PathBuf::from("data"), PathBuf::from("../data")];
        for path in &dev_paths {
            if path.join("manifest.local.json").exists() {
                return path.canonicalize().unwrap_or_else(|_| path.clone());
            }
        }
    }

    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("Lectio");
    }

    PathBuf::from("data")
}
