//! Cache module for incremental regeneration
//!
//! Records when each generated page was last rendered and a hash of its
//! output. A page younger than its revalidation window is fresh and is not
//! fetched again; a stale page is re-rendered and only rewritten on disk when
//! its HTML changed.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::SystemTime;

/// Cache directory, relative to the site directory
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = ".spacetraveling-cache/db.json";

/// A generated page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageEntry {
    /// Hash of the rendered HTML
    pub content_hash: u64,
    /// When the page was last rendered (unix timestamp), `None` once invalidated
    pub generated_at: Option<u64>,
    /// Output path relative to public dir
    pub output_path: String,
}

/// Page freshness ledger
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Hash of the site config (a change makes every page stale)
    pub config_hash: u64,
    /// Generated pages, keyed by route (`/`, `/post/<uid>/`, `/404`)
    pub pages: HashMap<String, PageEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 2;

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<CacheDb>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, rebuilding cache"),
                Err(e) => tracing::warn!("Ignoring unreadable cache: {}", e),
            }
        }
        Self::new()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;

        let cache_path = base_dir.join(CACHE_FILE);
        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_path, content)?;
        Ok(())
    }

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Whether `route` was rendered less than `max_age` seconds before `now`
    pub fn is_fresh(&self, route: &str, now: u64, max_age: u64) -> bool {
        self.pages
            .get(route)
            .and_then(|entry| entry.generated_at)
            .is_some_and(|generated_at| now.saturating_sub(generated_at) < max_age)
    }

    /// Record a render of `route`. Returns whether its HTML changed.
    pub fn record(&mut self, route: &str, html: &str, output_path: &str, now: u64) -> bool {
        let content_hash = hash_content(html);
        let changed = self
            .pages
            .get(route)
            .map_or(true, |entry| entry.content_hash != content_hash);

        self.pages.insert(
            route.to_string(),
            PageEntry {
                content_hash,
                generated_at: Some(now),
                output_path: output_path.to_string(),
            },
        );
        changed
    }

    pub fn remove(&mut self, route: &str) -> Option<PageEntry> {
        self.pages.remove(route)
    }

    /// Routes of all generated post pages
    pub fn post_routes(&self) -> Vec<String> {
        let mut routes: Vec<String> = self
            .pages
            .keys()
            .filter(|route| route.starts_with("/post/"))
            .cloned()
            .collect();
        routes.sort();
        routes
    }

    /// Apply a generation pass that ran on a copy taken as `before`.
    /// Entries recorded here while the pass ran are kept.
    pub fn merge_pass(&mut self, before: &CacheDb, after: CacheDb) {
        self.version = after.version;
        self.config_hash = after.config_hash;
        for route in before.pages.keys() {
            if !after.pages.contains_key(route) {
                self.pages.remove(route);
            }
        }
        for (route, entry) in after.pages {
            if before.pages.get(&route) != Some(&entry) {
                self.pages.insert(route, entry);
            }
        }
    }

    /// Mark every page stale, e.g. after a config change
    pub fn invalidate_all(&mut self) {
        for entry in self.pages.values_mut() {
            entry.generated_at = None;
        }
    }
}

/// Calculate a hash for page content
pub fn hash_content(content: &str) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Calculate a hash for a file on disk, 0 when missing
pub fn hash_file(path: &Path) -> Result<u64> {
    if !path.exists() {
        return Ok(0);
    }
    let content = fs::read_to_string(path)?;
    Ok(hash_content(&content))
}

/// Current time as unix timestamp
pub fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
