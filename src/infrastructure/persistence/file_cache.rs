//! File Audio Cache - 文件系统缓存实现
//!
//! 实现 AudioCachePort trait
//!
//! 目录布局:
//! ```text
//! <root>/<fingerprint>/<cache_key>.wav
//! <root>/<fingerprint>/<cache_key>.wav.in-progress   (写入中)
//! ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::application::ports::{AudioCachePort, CacheError, CleanupReport, IN_PROGRESS_SUFFIX};
use crate::domain::book::BookFingerprint;

/// 文件系统音频缓存
pub struct FileAudioCache {
    /// 缓存根目录
    root: PathBuf,
}

impl FileAudioCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 获取缓存根目录
    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl AudioCachePort for FileAudioCache {
    fn book_dir(&self, fingerprint: &BookFingerprint) -> PathBuf {
        self.root.join(fingerprint.as_str())
    }

    async fn ensure_book_dir(&self, fingerprint: &BookFingerprint) -> Result<PathBuf, CacheError> {
        let dir = self.book_dir(fingerprint);

        // create_dir_all 对已存在的目录返回 Ok，并发首次创建也安全
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::IoError(format!("{}: {}", dir.display(), e)))?;

        Ok(dir)
    }

    async fn exists(&self, path: &Path) -> bool {
        if path.as_os_str().to_string_lossy().ends_with(IN_PROGRESS_SUFFIX) {
            return false;
        }
        matches!(fs::metadata(path).await, Ok(meta) if meta.is_file())
    }

    async fn cleanup(&self, fingerprint: &BookFingerprint) -> CleanupReport {
        let dir = self.book_dir(fingerprint);
        let mut report = CleanupReport::default();

        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to read cache directory");
                report.failures.push(format!("{}: {}", dir.display(), e));
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    report.failures.push(format!("{}: {}", dir.display(), e));
                    break;
                }
            };

            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => report.removed_files += 1,
                // 并发删除或已被清理
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove cache entry");
                    report.failures.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        if let Err(e) = fs::remove_dir(&dir).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %dir.display(), error = %e, "Failed to remove cache directory");
                report.failures.push(format!("{}: {}", dir.display(), e));
            }
        }

        tracing::info!(
            fingerprint = %fingerprint,
            files = report.removed_files,
            failures = report.failures.len(),
            "Cache cleaned up"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{generate_cache_key, in_progress_path};
    use tempfile::tempdir;

    #[test]
    fn test_resolve_path_is_deterministic_and_namespaced() {
        let cache = FileAudioCache::new("/cache");
        let fp1 = BookFingerprint::from_hex("aaaa");
        let fp2 = BookFingerprint::from_hex("bbbb");
        let key = generate_cache_key("Hello", "af_heart", 1.0);

        assert_eq!(cache.resolve_path(&fp1, &key), cache.resolve_path(&fp1, &key));
        assert_ne!(cache.resolve_path(&fp1, &key), cache.resolve_path(&fp2, &key));
        assert_eq!(
            cache.resolve_path(&fp1, &key),
            PathBuf::from(format!("/cache/aaaa/{}.wav", key))
        );
    }

    #[tokio::test]
    async fn test_ensure_book_dir_is_idempotent() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path());
        let fp = BookFingerprint::from_hex("abc");

        let (a, b) = tokio::join!(cache.ensure_book_dir(&fp), cache.ensure_book_dir(&fp));
        assert_eq!(a.unwrap(), b.unwrap());
        assert!(cache.ensure_book_dir(&fp).await.unwrap().is_dir());
    }

    #[tokio::test]
    async fn test_in_progress_file_is_not_an_entry() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path());
        let fp = BookFingerprint::from_hex("abc");
        cache.ensure_book_dir(&fp).await.unwrap();

        let path = cache.resolve_path(&fp, "key");
        std::fs::write(in_progress_path(&path), b"partial").unwrap();

        assert!(!cache.exists(&path).await);
        assert!(!cache.exists(&in_progress_path(&path)).await);

        std::fs::write(&path, b"done").unwrap();
        assert!(cache.exists(&path).await);
    }

    #[tokio::test]
    async fn test_cleanup_removes_entries_and_tolerates_missing_dir() {
        let temp_dir = tempdir().unwrap();
        let cache = FileAudioCache::new(temp_dir.path());
        let fp = BookFingerprint::from_hex("abc");
        cache.ensure_book_dir(&fp).await.unwrap();

        for key in ["a", "b"] {
            std::fs::write(cache.resolve_path(&fp, key), b"data").unwrap();
        }
        std::fs::write(in_progress_path(&cache.resolve_path(&fp, "c")), b"partial").unwrap();

        let report = cache.cleanup(&fp).await;
        assert_eq!(report.removed_files, 3);
        assert!(report.is_clean());
        assert!(!cache.book_dir(&fp).exists());

        // 第二次清理：目录已不存在
        let report = cache.cleanup(&fp).await;
        assert_eq!(report, CleanupReport::default());
    }
}
