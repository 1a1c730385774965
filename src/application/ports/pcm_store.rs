//! PCM Store Port - 磁盘上的单声道 PCM 文件
//!
//! 缓存条目通过这个端口读写

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::domain::audio::AudioSegment;

#[derive(Debug, Error)]
pub enum PcmError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Invalid PCM file: {0}")]
    Format(String),
}

/// PCM 写入器
///
/// 接收 f32 样本，按 16 位有符号整数写盘
pub trait PcmSink: Send {
    fn write(&mut self, samples: &[f32]) -> Result<(), PcmError>;

    /// 写入文件头并关闭，返回总帧数
    fn finalize(self: Box<Self>) -> Result<u64, PcmError>;
}

/// PCM Store Port
#[async_trait]
pub trait PcmStorePort: Send + Sync {
    /// 在 path 处创建单声道写入器（覆盖已存在的文件）
    fn create(&self, path: &Path, sample_rate: u32) -> Result<Box<dyn PcmSink>, PcmError>;

    /// 打开已完成的文件，读取采样率与帧数
    async fn open(&self, path: &Path) -> Result<AudioSegment, PcmError>;
}
