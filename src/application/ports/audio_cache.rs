//! Audio Cache Port - 合成音频缓存
//!
//! 以书籍指纹为命名空间、以文本内容寻址的文件缓存抽象，具体实现在 infrastructure/persistence

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::domain::book::BookFingerprint;

/// 缓存文件扩展名
pub const CACHE_ENTRY_EXTENSION: &str = "wav";

/// 写入中的临时文件后缀
pub const IN_PROGRESS_SUFFIX: &str = ".in-progress";

/// Audio Cache 错误
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    IoError(String),
}

/// 清理结果
///
/// cleanup 从不向调用方返回错误，失败只记录在这里
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub removed_files: usize,
    pub failures: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Audio Cache Port
///
/// 缓存条目路径: `<cache_root>/<fingerprint>/<cache_key>.wav`
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 书籍命名空间目录（纯函数）
    fn book_dir(&self, fingerprint: &BookFingerprint) -> PathBuf;

    /// 缓存条目路径（纯函数，确定性）
    fn resolve_path(&self, fingerprint: &BookFingerprint, cache_key: &str) -> PathBuf {
        self.book_dir(fingerprint)
            .join(format!("{}.{}", cache_key, CACHE_ENTRY_EXTENSION))
    }

    /// 创建命名空间目录（幂等，可并发调用）
    async fn ensure_book_dir(&self, fingerprint: &BookFingerprint) -> Result<PathBuf, CacheError>;

    /// 已完成的缓存条目是否存在（写入中的临时文件不算）
    async fn exists(&self, path: &Path) -> bool;

    /// 删除书籍的全部缓存条目
    async fn cleanup(&self, fingerprint: &BookFingerprint) -> CleanupReport;
}

/// 生成缓存 key
///
/// md5(voice ‖ speed ‖ text)：同样的文本在同一音色配置下得到同一个 key
pub fn generate_cache_key(text: &str, voice: &str, speed: f32) -> String {
    let material = format!("{}\u{1f}{:.3}\u{1f}{}", voice, speed, text);
    let digest = md5::compute(material.as_bytes());
    format!("{:x}", digest)
}

/// 写入中的兄弟路径: `<name>.in-progress`
pub fn in_progress_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(IN_PROGRESS_SUFFIX);
    PathBuf::from(name)
}
