//! Per-URL scene cache, keyed on `MD5(url)` salted with `(width, height, fps)`
//! so two campaigns at different output resolutions never share a recording
//! (§4.F, §4.G step 3, §9 Open Questions).

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tracing::debug;

pub struct SceneCache {
    cache_dir: PathBuf,
}

impl SceneCache {
    /// `cache_dir` lives beside the per-render working directory so repeated
    /// URLs across leads are recorded once (§4.F).
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self { cache_dir: cache_root.into() }
    }

    fn key(&self, url: &str, width: u32, height: u32, fps: f64) -> String {
        let mut hasher = Md5::new();
        hasher.update(url.as_bytes());
        hasher.update(format!("|{width}|{height}|{fps}").as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn cached_path(&self, url: &str, width: u32, height: u32, fps: f64) -> PathBuf {
        self.cache_dir.join(format!("{}.mp4", self.key(url, width, height, fps)))
    }

    pub async fn lookup(&self, url: &str, width: u32, height: u32, fps: f64) -> Option<PathBuf> {
        let path = self.cached_path(url, width, height, fps);
        if tokio::fs::metadata(&path).await.map(|m| m.len() > 0).unwrap_or(false) {
            debug!(url, path = %path.display(), "scene cache hit");
            Some(path)
        } else {
            None
        }
    }

    /// Populate the cache from an already-normalized scene file.
    pub async fn store(&self, url: &str, width: u32, height: u32, fps: f64, normalized_path: &Path) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        let dest = self.cached_path(url, width, height, fps);
        tokio::fs::copy(normalized_path, &dest).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_resolutions_hash_differently() {
        let cache = SceneCache::new("/tmp/cache");
        let a = cache.key("https://example.com", 1920, 1080, 60.0);
        let b = cache.key("https://example.com", 1280, 720, 60.0);
        assert_ne!(a, b);
    }

    #[test]
    fn same_inputs_hash_identically() {
        let cache = SceneCache::new("/tmp/cache");
        let a = cache.key("https://example.com", 1920, 1080, 60.0);
        let b = cache.key("https://example.com", 1920, 1080, 60.0);
        assert_eq!(a, b);
    }
}
