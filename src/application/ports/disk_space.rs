//! Disk Space Port - 可用磁盘空间探测

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DiskProbeError {
    #[error("No disk found for path: {0}")]
    NoDisk(String),

    #[error("IO error: {0}")]
    Io(String),
}

#[async_trait]
pub trait DiskSpacePort: Send + Sync {
    /// path 所在磁盘的可用字节数
    async fn available_bytes(&self, path: &Path) -> Result<u64, DiskProbeError>;
}
