//! Retention-driven working-directory cleanup (§4.H "Retention-driven cleanup").
//!
//! Deletion deadlines are tracked in-process and revalidated on each tick rather
//! than relying on a bare timer, so a restart doesn't forget pending deletions; a
//! periodic mtime-based mop-up recovers any deadline lost to a process restart.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

pub struct CleanupTracker {
    deadlines: Mutex<HashMap<PathBuf, DateTime<Utc>>>,
    campaigns_root: PathBuf,
    cleanup_max_age_days: i64,
}

impl CleanupTracker {
    pub fn new(campaigns_root: impl Into<PathBuf>, cleanup_max_age_days: i64) -> Self {
        Self {
            deadlines: Mutex::new(HashMap::new()),
            campaigns_root: campaigns_root.into(),
            cleanup_max_age_days,
        }
    }

    /// Schedule `dir` for deletion after `retention`.
    pub fn schedule(&self, dir: PathBuf, retention: chrono::Duration) {
        let deadline = Utc::now() + retention;
        self.deadlines.lock().unwrap().insert(dir, deadline);
    }

    /// Revalidate all pending deadlines and delete any directory whose deadline
    /// has passed. Failures are logged, never propagated (§4.H).
    pub async fn tick(&self) {
        let due: Vec<PathBuf> = {
            let mut deadlines = self.deadlines.lock().unwrap();
            let now = Utc::now();
            let due: Vec<PathBuf> = deadlines
                .iter()
                .filter(|(_, deadline)| **deadline <= now)
                .map(|(path, _)| path.clone())
                .collect();
            for path in &due {
                deadlines.remove(path);
            }
            due
        };

        for dir in due {
            if let Err(e) = tokio::fs::remove_dir_all(&dir).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(dir = %dir.display(), error = %e, "failed to remove working directory");
                }
            } else {
                debug!(dir = %dir.display(), "removed working directory past retention");
            }
        }

        self.mop_up().await;
    }

    /// Remove any campaign directory whose own mtime exceeds `cleanup_max_age_days`,
    /// recovering deadlines lost to a process restart (§4.H).
    async fn mop_up(&self) {
        let Ok(mut entries) = tokio::fs::read_dir(&self.campaigns_root).await else {
            return;
        };

        let cutoff = std::time::SystemTime::now()
            - std::time::Duration::from_secs((self.cleanup_max_age_days.max(0) as u64) * 86_400);

        while let Ok(Some(entry)) = entries.next_entry().await {
            let Ok(metadata) = entry.metadata().await else { continue };
            if !metadata.is_dir() {
                continue;
            }
            let Ok(modified) = metadata.modified() else { continue };
            if modified < cutoff {
                let path = entry.path();
                if let Err(e) = tokio::fs::remove_dir_all(&path).await {
                    warn!(dir = %path.display(), error = %e, "mop-up removal failed");
                } else {
                    debug!(dir = %path.display(), "mop-up removed stale campaign directory");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn removes_directories_past_their_deadline() {
        let root = tempfile::tempdir().unwrap();
        let stale = root.path().join("stale-render");
        tokio::fs::create_dir_all(&stale).await.unwrap();

        let tracker = CleanupTracker::new(root.path(), 30);
        tracker.schedule(stale.clone(), chrono::Duration::milliseconds(-1));
        tracker.tick().await;

        assert!(!stale.exists());
    }

    #[tokio::test]
    async fn leaves_directories_before_their_deadline() {
        let root = tempfile::tempdir().unwrap();
        let fresh = root.path().join("fresh-render");
        tokio::fs::create_dir_all(&fresh).await.unwrap();

        let tracker = CleanupTracker::new(root.path(), 30);
        tracker.schedule(fresh.clone(), chrono::Duration::hours(1));
        tracker.tick().await;

        assert!(fresh.exists());
    }
}
