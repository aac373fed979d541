//! Disk cache for fetched pages and images
//!
//! Layout under the cache root:
//!
//! ```text
//! <root>/pages/<key>.html      page cache, TTL-governed
//! <root>/posters/<key><suffix> image cache, no TTL
//! <root>/debug.log             never touched by clear()
//! ```
//!
//! Every public operation is infallible from the caller's point of view:
//! read failures are misses, write failures are no-ops and size failures
//! are zero.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::Toggles;

/// File name of the debug log colocated in the cache root
pub const DEBUG_LOG_NAME: &str = "debug.log";

const PAGES_DIR: &str = "pages";
const POSTERS_DIR: &str = "posters";

static NON_ALNUM_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").unwrap());

/// Disambiguates temp files of concurrent writers within one process
static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Cache I/O failures, only ever logged
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to walk cache directory: {0}")]
    Walk(#[from] walkdir::Error),
}

impl CacheError {
    fn io(path: &Path, source: io::Error) -> Self {
        CacheError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Derive the on-disk key for a URL
///
/// Runs of non-alphanumeric characters collapse to one `_`; leading and
/// trailing separators are stripped.
pub fn cache_key(url: &str) -> String {
    NON_ALNUM_RUN
        .replace_all(url, "_")
        .trim_matches('_')
        .to_string()
}

/// Purpose of a cached image, which selects its file suffix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Poster,
    Backdrop,
    Celebrity,
}

impl ImageKind {
    pub fn suffix(self) -> &'static str {
        match self {
            ImageKind::Poster => ".img",
            ImageKind::Backdrop => ".bd.jpg",
            ImageKind::Celebrity => ".cel.img",
        }
    }
}

impl std::str::FromStr for ImageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "poster" | "" => Ok(ImageKind::Poster),
            "backdrop" => Ok(ImageKind::Backdrop),
            "celebrity" => Ok(ImageKind::Celebrity),
            other => Err(format!("unknown image kind: {}", other)),
        }
    }
}

/// Filesystem-backed page and image cache
#[derive(Debug, Clone)]
pub struct DiskCache {
    root: PathBuf,
    toggles: Arc<Toggles>,
}

impl DiskCache {
    pub fn new(root: impl Into<PathBuf>, toggles: Arc<Toggles>) -> Self {
        Self {
            root: root.into(),
            toggles,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn toggles(&self) -> &Arc<Toggles> {
        &self.toggles
    }

    fn page_path(&self, url: &str) -> PathBuf {
        self.root
            .join(PAGES_DIR)
            .join(format!("{}.html", cache_key(url)))
    }

    /// Location of an image in the poster pool
    pub fn image_path(&self, url: &str, kind: ImageKind) -> PathBuf {
        self.root
            .join(POSTERS_DIR)
            .join(format!("{}{}", cache_key(url), kind.suffix()))
    }

    /// Create the root, `pages/` and `posters/` directories
    pub fn ensure_dirs(&self) -> Result<(), CacheError> {
        for dir in [
            self.root.clone(),
            self.root.join(PAGES_DIR),
            self.root.join(POSTERS_DIR),
        ] {
            fs::create_dir_all(&dir).map_err(|e| CacheError::io(&dir, e))?;
        }
        Ok(())
    }

    /// Cached page bytes if the entry is at most `ttl_seconds` old
    ///
    /// Stale entries stay on disk until the next `put` replaces them.
    pub fn get(&self, url: &str, ttl_seconds: u64) -> Option<Vec<u8>> {
        if !self.toggles.cache_enabled() {
            return None;
        }

        let path = self.page_path(url);
        match read_if_fresh(&path, Duration::from_secs(ttl_seconds)) {
            Ok(Some(bytes)) => {
                debug!("Cache hit for {}", url);
                Some(bytes)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Cache read failed, treating as miss: {}", e);
                None
            }
        }
    }

    /// Store page bytes, replacing any previous entry
    pub fn put(&self, url: &str, bytes: &[u8]) {
        if !self.toggles.cache_enabled() {
            return;
        }

        let path = self.page_path(url);
        if let Err(e) = self.ensure_dirs().and_then(|_| write_whole(&path, bytes)) {
            warn!("Cache write failed, skipping: {}", e);
        }
    }

    /// Cached image bytes; images never expire
    pub fn get_image(&self, url: &str, kind: ImageKind) -> Option<Vec<u8>> {
        if !self.toggles.cache_enabled() {
            return None;
        }

        let path = self.image_path(url, kind);
        match fs::read(&path) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => {
                debug!("Image cache read failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn put_image(&self, url: &str, kind: ImageKind, bytes: &[u8]) {
        if !self.toggles.cache_enabled() {
            return;
        }

        let path = self.image_path(url, kind);
        if let Err(e) = self.ensure_dirs().and_then(|_| write_whole(&path, bytes)) {
            warn!("Image cache write failed, skipping: {}", e);
        }
    }

    /// Delete every cached page and image, keeping the debug log
    pub fn clear(&self) {
        if let Err(e) = self.remove_all_but_log() {
            warn!("Cache clear incomplete: {}", e);
        }
        if let Err(e) = self.ensure_dirs() {
            warn!("Failed to recreate cache directories: {}", e);
        }
    }

    fn remove_all_but_log(&self) -> Result<(), CacheError> {
        if !self.root.exists() {
            return Ok(());
        }

        let log_path = self.root.join(DEBUG_LOG_NAME);
        for entry in WalkDir::new(&self.root).min_depth(1).contents_first(true) {
            let entry = entry?;
            let path = entry.path();

            let result = if entry.file_type().is_dir() {
                fs::remove_dir(path)
            } else if path == log_path {
                continue;
            } else {
                fs::remove_file(path)
            };

            // Keep going: one undeletable file must not stop the rest.
            if let Err(e) = result {
                debug!("Could not remove {}: {}", path.display(), e);
            }
        }
        Ok(())
    }

    /// Total size of everything under the cache root, 0 on any error
    ///
    /// Advisory only; nothing is evicted based on it.
    pub fn size_bytes(&self) -> u64 {
        match self.try_size_bytes() {
            Ok(size) => size,
            Err(e) => {
                debug!("Cache size unavailable: {}", e);
                0
            }
        }
    }

    fn try_size_bytes(&self) -> Result<u64, CacheError> {
        let mut total = 0;
        for entry in WalkDir::new(&self.root) {
            let entry = entry?;
            if entry.file_type().is_file() {
                total += entry.metadata()?.len();
            }
        }
        Ok(total)
    }
}

fn read_if_fresh(path: &Path, ttl: Duration) -> Result<Option<Vec<u8>>, CacheError> {
    let metadata = match fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(CacheError::io(path, e)),
    };

    let modified = metadata.modified().map_err(|e| CacheError::io(path, e))?;
    // A modification time in the future counts as brand new.
    let age = SystemTime::now()
        .duration_since(modified)
        .unwrap_or(Duration::ZERO);

    if age > ttl {
        return Ok(None);
    }

    fs::read(path).map(Some).map_err(|e| CacheError::io(path, e))
}

/// Write to a sibling temp file, then rename over the target
///
/// Concurrent writers of one key end up last-write-wins with a complete
/// file either way.
fn write_whole(path: &Path, bytes: &[u8]) -> Result<(), CacheError> {
    let seq = WRITE_SEQ.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("tmp.{}.{}", std::process::id(), seq));

    fs::write(&tmp, bytes).map_err(|e| CacheError::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        CacheError::io(path, e)
    })
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Keys contain only alphanumerics and single underscores, with
        /// no separator at either end.
        #[test]
        fn property_cache_key_shape(url in ".{0,120}") {
            let key = cache_key(&url);
            prop_assert!(key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
            prop_assert!(!key.contains("__"));
            prop_assert!(!key.starts_with('_'));
            prop_assert!(!key.ends_with('_'));
            prop_assert_eq!(cache_key(&url), key);
        }

        /// Immediately after a write, any positive TTL returns the bytes.
        #[test]
        fn property_round_trip_any_ttl(
            url in "https://[a-z]{3,10}\\.com/[a-z0-9/]{0,20}",
            body in prop::collection::vec(any::<u8>(), 0..256),
            ttl in 1u64..100_000,
        ) {
            let dir = tempfile::TempDir::new().unwrap();
            let cache = DiskCache::new(dir.path(), Arc::new(Toggles::default()));
            cache.put(&url, &body);
            prop_assert_eq!(cache.get(&url, ttl), Some(body));
        }
    }
}
