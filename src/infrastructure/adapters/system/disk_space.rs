//! 基于 sysinfo 的磁盘空间探测
//!
//! 实现 DiskSpacePort trait

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use sysinfo::Disks;

use crate::application::ports::{DiskProbeError, DiskSpacePort};

/// 最近的已存在祖先目录（规范化后）
fn existing_ancestor(path: &Path) -> Result<PathBuf, DiskProbeError> {
    let mut current = Some(path);
    while let Some(candidate) = current {
        if let Ok(resolved) = candidate.canonicalize() {
            return Ok(resolved);
        }
        current = candidate.parent();
    }
    std::env::current_dir()
        .and_then(|dir| dir.canonicalize())
        .map_err(|e| DiskProbeError::Io(e.to_string()))
}

/// 在 (挂载点, 可用字节) 中选出挂载点是 path 最长前缀的一项
fn pick_disk<'a, I>(path: &Path, disks: I) -> Option<u64>
where
    I: IntoIterator<Item = (&'a Path, u64)>,
{
    disks
        .into_iter()
        .filter(|(mount, _)| path.starts_with(mount))
        .max_by_key(|(mount, _)| mount.components().count())
        .map(|(_, available)| available)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SysinfoDiskSpace;

impl SysinfoDiskSpace {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiskSpacePort for SysinfoDiskSpace {
    async fn available_bytes(&self, path: &Path) -> Result<u64, DiskProbeError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || {
            let resolved = existing_ancestor(&path)?;
            let disks = Disks::new_with_refreshed_list();
            let available = pick_disk(
                &resolved,
                disks.list().iter().map(|d| (d.mount_point(), d.available_space())),
            )
            .ok_or_else(|| DiskProbeError::NoDisk(resolved.display().to_string()))?;

            tracing::debug!(path = %resolved.display(), available, "Probed disk space");
            Ok(available)
        })
        .await
        .map_err(|e| DiskProbeError::Io(e.to_string()))?
    }
}
