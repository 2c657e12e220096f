//! Retention sweep for persisted render artifacts.

use std::path::Path;
use std::time::{Duration, SystemTime};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Spawns the background task that periodically deletes rendered images
/// older than the retention window.
pub fn spawn_sweeper(
    temp_dir: impl AsRef<Path>,
    retention: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    let temp_dir = temp_dir.as_ref().to_path_buf();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip it so a fresh start
        // doesn't race artifact creation
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_once(&temp_dir, retention);
        }
    })
}

fn sweep_once(temp_dir: &Path, retention: Duration) {
    debug!("Sweeping {} for artifacts older than {:?}", temp_dir.display(), retention);
    let entries = match std::fs::read_dir(temp_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read temp dir {}: {}", temp_dir.display(), e);
            return;
        }
    };

    let now = SystemTime::now();
    let mut removed = 0usize;
    for entry in entries.flatten() {
        let path = entry.path();
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if is_expired(modified, now, retention) {
            match std::fs::remove_file(&path) {
                Ok(_) => removed += 1,
                Err(e) => warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
    if removed > 0 {
        info!("Swept {} expired artifacts from {}", removed, temp_dir.display());
    }
}

fn is_expired(modified: SystemTime, now: SystemTime, retention: Duration) -> bool {
    match now.duration_since(modified) {
        Ok(age) => age > retention,
        // Clock skew: modified in the future, keep the file
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expiry_compares_age_to_retention() {
        let now = SystemTime::now();
        let retention = Duration::from_secs(3600);
        assert!(is_expired(now - Duration::from_secs(7200), now, retention));
        assert!(!is_expired(now - Duration::from_secs(60), now, retention));
    }

    #[test]
    fn future_timestamps_never_expire() {
        let now = SystemTime::now();
        let retention = Duration::from_secs(3600);
        assert!(!is_expired(now + Duration::from_secs(60), now, retention));
    }

    #[test]
    fn sweep_leaves_fresh_files_alone() {
        let dir = std::env::temp_dir().join(format!("webshot_sweep_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("fresh.png");
        std::fs::write(&file, b"data").unwrap();

        sweep_once(&dir, Duration::from_secs(3600));
        assert!(file.exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
