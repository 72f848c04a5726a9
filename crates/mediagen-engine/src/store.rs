use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use chrono::Utc;
use mediagen_contracts::error::GenerateError;
use mediagen_contracts::request::{MediaBytes, MediaKind};
use uuid::Uuid;

/// Persists normalized media under a base directory:
/// `images/`, `videos/`, and `temp/` for partial writes and uploads.
/// Names encode kind, creation time, and a random suffix, so they never
/// collide and never need locking.
#[derive(Debug, Clone)]
pub struct FileStore {
    images_dir: PathBuf,
    videos_dir: PathBuf,
    temp_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let base_dir = base_dir.into();
        let store = Self {
            images_dir: base_dir.join("images"),
            videos_dir: base_dir.join("videos"),
            temp_dir: base_dir.join("temp"),
        };
        for dir in [&store.images_dir, &store.videos_dir, &store.temp_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(store)
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Write media to its kind directory. The write goes to a temporary
    /// path first and is renamed into place, so the returned path either
    /// holds the full file or nothing was left behind.
    pub fn save(&self, media: &MediaBytes, kind: MediaKind) -> Result<PathBuf, GenerateError> {
        if media.is_empty() {
            return Err(GenerateError::Write(
                "refusing to persist an empty media payload".to_string(),
            ));
        }

        let file_name = unique_file_name(kind.as_str(), media.extension(kind));
        let final_path = match kind {
            MediaKind::Image => self.images_dir.join(&file_name),
            MediaKind::Video => self.videos_dir.join(&file_name),
        };
        let partial = self
            .temp_dir
            .join(format!(".partial-{}", Uuid::new_v4().simple()));

        fs::write(&partial, &media.bytes).map_err(|err| {
            GenerateError::Write(format!("failed writing {}: {err}", partial.display()))
        })?;
        if let Err(err) = fs::rename(&partial, &final_path) {
            let _ = fs::remove_file(&partial);
            return Err(GenerateError::Write(format!(
                "failed moving media into {}: {err}",
                final_path.display()
            )));
        }
        Ok(final_path)
    }

    /// Stash caller-supplied bytes (e.g. an uploaded source frame) under
    /// `temp/` so generation can reference them by path.
    pub fn save_temp(
        &self,
        bytes: &[u8],
        original_name: &str,
    ) -> Result<PathBuf, GenerateError> {
        let stamp = Utc::now().format("%Y%m%d_%H%M%S");
        let safe_name: String = original_name
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
            .collect();
        let path = self.temp_dir.join(format!("temp_{stamp}_{safe_name}"));
        fs::write(&path, bytes).map_err(|err| {
            GenerateError::Write(format!("failed writing {}: {err}", path.display()))
        })?;
        Ok(path)
    }

    /// Delete temp artifacts older than the threshold. Per-file failures
    /// are logged and skipped; returns how many files were removed.
    pub fn cleanup_temp(&self, older_than: Duration) -> usize {
        let Ok(entries) = fs::read_dir(&self.temp_dir) else {
            return 0;
        };
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let age = entry
                .metadata()
                .and_then(|meta| meta.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok());
            let Some(age) = age else {
                continue;
            };
            if age < older_than {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(err) => {
                    log::warn!("skipping temp cleanup of {}: {err}", path.display());
                }
            }
        }
        removed
    }

    /// Stored files for the gallery view, newest first.
    pub fn list(&self, filter: Option<MediaKind>) -> Vec<PathBuf> {
        let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
        let dirs: Vec<&PathBuf> = match filter {
            Some(MediaKind::Image) => vec![&self.images_dir],
            Some(MediaKind::Video) => vec![&self.videos_dir],
            None => vec![&self.images_dir, &self.videos_dir],
        };
        for dir in dirs {
            let Ok(entries) = fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let path = entry.path();
                if !path.is_file() {
                    continue;
                }
                let modified = entry
                    .metadata()
                    .and_then(|meta| meta.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                files.push((modified, path));
            }
        }
        files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));
        files.into_iter().map(|(_, path)| path).collect()
    }

    pub fn file_size(&self, path: &Path) -> Option<u64> {
        fs::metadata(path).map(|meta| meta.len()).ok()
    }
}

fn unique_file_name(kind: &str, ext: &str) -> String {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{kind}_{stamp}_{}.{ext}", &suffix[..8])
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::time::Duration;

    use mediagen_contracts::request::{MediaBytes, MediaKind};

    use super::FileStore;

    fn media(bytes: &[u8], mime: &str) -> MediaBytes {
        MediaBytes::new(bytes.to_vec(), Some(mime.to_string()))
    }

    #[test]
    fn save_places_full_file_under_kind_directory() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;

        let path = store.save(&media(b"png-bytes", "image/png"), MediaKind::Image)?;
        assert!(path.starts_with(store.images_dir()));
        assert!(path.extension().is_some_and(|ext| ext == "png"));
        assert_eq!(fs::read(&path)?, b"png-bytes");
        assert!(store.file_size(&path).unwrap() > 0);

        // No partial artifact lingers in temp.
        assert_eq!(fs::read_dir(store.temp_dir())?.count(), 0);
        Ok(())
    }

    #[test]
    fn saves_in_same_second_get_distinct_paths() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;

        let first = store.save(&media(b"one", "image/png"), MediaKind::Image)?;
        let second = store.save(&media(b"two", "image/png"), MediaKind::Image)?;
        assert_ne!(first, second);
        assert_eq!(fs::read(&first)?, b"one");
        assert_eq!(fs::read(&second)?, b"two");
        Ok(())
    }

    #[test]
    fn video_media_lands_in_videos_dir_with_mime_extension() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;

        let path = store.save(&media(b"webm-bytes", "video/webm"), MediaKind::Video)?;
        assert!(path.starts_with(store.videos_dir()));
        assert!(path.extension().is_some_and(|ext| ext == "webm"));
        Ok(())
    }

    #[test]
    fn empty_payload_is_rejected() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;
        assert!(store.save(&media(b"", "image/png"), MediaKind::Image).is_err());
        Ok(())
    }

    #[test]
    fn cleanup_removes_old_and_keeps_young() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;
        let kept = store.save_temp(b"upload", "frame.png")?;

        // Everything is younger than an hour, so nothing goes.
        assert_eq!(store.cleanup_temp(Duration::from_secs(3600)), 0);
        assert!(kept.exists());

        // With a zero threshold the same file is stale.
        assert_eq!(store.cleanup_temp(Duration::ZERO), 1);
        assert!(!kept.exists());
        Ok(())
    }

    #[test]
    fn save_temp_sanitizes_hostile_names() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;
        let path = store.save_temp(b"data", "../../etc/passwd")?;
        assert_eq!(path.parent(), Some(store.temp_dir()));
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(!name.contains('/'));
        assert!(name.ends_with(".._.._etc_passwd"));
        Ok(())
    }

    #[test]
    fn list_is_newest_first_and_filterable() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let store = FileStore::new(temp.path())?;
        store.save(&media(b"img", "image/png"), MediaKind::Image)?;
        store.save(&media(b"vid", "video/mp4"), MediaKind::Video)?;

        assert_eq!(store.list(None).len(), 2);
        assert_eq!(store.list(Some(MediaKind::Image)).len(), 1);
        assert_eq!(store.list(Some(MediaKind::Video)).len(), 1);
        Ok(())
    }
}
