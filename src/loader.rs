//! Translation download and offline cache
//!
//! Each translation is one immutable JSON file. A file downloaded once is
//! recorded in `manifest.local.json` with its SHA-256 and is loaded from disk
//! from then on, without touching the network.

use crate::corpus::Corpus;
use crate::error::LectioError;
use crate::registry::{LoadEvent, LoadState, TranslationRegistry, TranslationSlot};
use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

const LOCAL_MANIFEST: &str = "manifest.local.json";

/// Attempts per translation before reporting failure.
const FETCH_ATTEMPTS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationSource {
    pub id: &'static str,
    pub label: &'static str,
    pub file_name: &'static str,
    /// Needs data consent before it is downloaded.
    pub optional: bool,
    pub size_label: Option<&'static str>,
}

/// Known translations in display order.
pub const CATALOG: &[TranslationSource] = &[
    TranslationSource {
        id: "kor",
        label: "개역한글",
        file_name: "korean_bible.json",
        optional: false,
        size_label: None,
    },
    TranslationSource {
        id: "kjv",
        label: "KJV",
        file_name: "kjv_bible.json",
        optional: false,
        size_label: None,
    },
    TranslationSource {
        id: "ja",
        label: "口語訳",
        file_name: "japanese_bible.json",
        optional: true,
        size_label: Some("약 21MB"),
    },
    TranslationSource {
        id: "ita",
        label: "Riveduta",
        file_name: "italian_bible.json",
        optional: true,
        size_label: Some("약 4.7MB"),
    },
];

pub fn source(id: &str) -> Option<&'static TranslationSource> {
    CATALOG.iter().find(|s| s.id == id)
}

/// A registry with one unloaded slot per catalog entry.
pub fn catalog_registry() -> TranslationRegistry {
    let mut registry = TranslationRegistry::new();
    for source in CATALOG {
        registry.add_slot(TranslationSlot::new(source.id, source.label, source.optional));
    }
    registry
}

/// Local manifest structure (stored in data directory)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalManifest {
    pub files: HashMap<String, LocalFile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFile {
    pub hash: String,
    pub size: u64,
    pub downloaded_at: String,
}

pub fn load_local_manifest(data_dir: &Path) -> Option<LocalManifest> {
    let content = fs::read_to_string(data_dir.join(LOCAL_MANIFEST)).ok()?;
    serde_json::from_str(&content).ok()
}

pub fn save_local_manifest(data_dir: &Path, manifest: &LocalManifest) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    let content = serde_json::to_string_pretty(manifest)?;
    fs::write(data_dir.join(LOCAL_MANIFEST), content)?;
    Ok(())
}

pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)?;
    Ok(hex::encode(hasher.finalize()))
}

/// Verify file hash matches expected
pub fn verify_file_hash(path: &Path, expected_hash: &str) -> Result<bool> {
    let expected = expected_hash.strip_prefix("sha256:").unwrap_or(expected_hash);
    Ok(hash_file(path)? == expected)
}

/// Load a translation from the offline cache, if a verified copy exists.
pub fn load_cached(data_dir: &Path, source: &TranslationSource) -> Result<Option<Corpus>> {
    let Some(manifest) = load_local_manifest(data_dir) else {
        return Ok(None);
    };
    let Some(entry) = manifest.files.get(source.file_name) else {
        return Ok(None);
    };
    let path = data_dir.join(source.file_name);
    if !path.exists() {
        return Ok(None);
    }
    if !verify_file_hash(&path, &entry.hash)? {
        warn!(translation = source.id, path = %path.display(), "cached file hash mismatch, refetching");
        return Ok(None);
    }
    let bytes = fs::read(&path).with_context(|| format!("Failed to read {:?}", path))?;
    let corpus = Corpus::from_json(source.id, &bytes)?;
    Ok(Some(corpus))
}

/// Download `url` to `path` through a `.part` file. Returns (sha256, size).
async fn download_file(client: &reqwest::Client, url: &str, path: &Path) -> Result<(String, u64)> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LectioError::Network(e.to_string()))
        .context("Failed to start download")?;

    if !response.status().is_success() {
        return Err(LectioError::Network(format!("HTTP {} for {}", response.status(), url)).into());
    }

    let part_path = path.with_extension("json.part");
    let mut file = fs::File::create(&part_path)?;
    let mut hasher = Sha256::new();
    let mut size: u64 = 0;
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                drop(file);
                let _ = fs::remove_file(&part_path);
                return Err(LectioError::Download(format!("error reading body: {}", e)).into());
            }
        };
        file.write_all(&chunk)?;
        hasher.update(&chunk);
        size += chunk.len() as u64;
    }
    file.flush()?;
    drop(file);

    fs::rename(&part_path, path)?;
    Ok((hex::encode(hasher.finalize()), size))
}

#[derive(Clone)]
pub struct TranslationLoader {
    client: reqwest::Client,
    base_url: String,
    data_dir: PathBuf,
    manifest_lock: Arc<Mutex<()>>,
    tx: mpsc::UnboundedSender<LoadEvent>,
}

impl TranslationLoader {
    pub fn new(
        base_url: impl Into<String>,
        data_dir: impl Into<PathBuf>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LoadEvent>)> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()?;
        let (tx, rx) = mpsc::unbounded_channel();
        let loader = Self {
            client,
            base_url: base_url.into(),
            data_dir: data_dir.into(),
            manifest_lock: Arc::new(Mutex::new(())),
            tx,
        };
        Ok((loader, rx))
    }

    /// Cache first, then the network with one retry.
    pub async fn fetch(&self, source: &TranslationSource) -> Result<Corpus> {
        if let Some(corpus) = load_cached(&self.data_dir, source)? {
            info!(translation = source.id, "loaded from offline cache");
            return Ok(corpus);
        }

        let url = format!("{}{}", self.base_url, source.file_name);
        let path = self.data_dir.join(source.file_name);
        let mut last_err = anyhow!("no attempt made");
        for attempt in 1..=FETCH_ATTEMPTS {
            info!(translation = source.id, url = %url, attempt, "downloading translation");
            match download_file(&self.client, &url, &path).await {
                Ok((hash, size)) => {
                    let bytes = fs::read(&path)?;
                    let corpus = Corpus::from_json(source.id, &bytes)?;
                    self.record(source, hash, size).await?;
                    return Ok(corpus);
                }
                Err(e) => {
                    warn!(translation = source.id, attempt, error = %e, "download failed");
                    last_err = e;
                }
            }
        }
        Err(last_err.context(format!("failed to fetch {} translation", source.id)))
    }

    async fn record(&self, source: &TranslationSource, hash: String, size: u64) -> Result<()> {
        let _guard = self.manifest_lock.lock().await;
        let mut manifest = load_local_manifest(&self.data_dir).unwrap_or_default();
        manifest.files.insert(
            source.file_name.to_string(),
            LocalFile {
                hash,
                size,
                downloaded_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        save_local_manifest(&self.data_dir, &manifest)
    }

    /// Start loading `id` in the background. Progress arrives as [`LoadEvent`]s.
    pub fn request(&self, id: &str) {
        let Some(source) = source(id) else {
            let _ = self.tx.send(LoadEvent {
                id: id.to_string(),
                state: LoadState::Failed(format!("unknown translation {}", id)),
            });
            return;
        };
        let _ = self.tx.send(LoadEvent {
            id: id.to_string(),
            state: LoadState::Loading,
        });

        let loader = self.clone();
        tokio::spawn(async move {
            let state = match loader.fetch(source).await {
                Ok(corpus) => LoadState::Ready(Arc::new(corpus)),
                Err(e) => LoadState::Failed(format!("{:#}", e)),
            };
            let _ = loader.tx.send(LoadEvent {
                id: source.id.to_string(),
                state,
            });
        });
    }
}
