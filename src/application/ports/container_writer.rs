//! Container Writer Port - 带标签的音频容器写入（Ogg Opus）

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::domain::audio::AudioTimeline;

#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Encoding error: {0}")]
    EncodingError(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// 图片类型（FLAC / ID3v2 APIC 编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PictureType {
    FileIcon = 1,
    FrontCover = 3,
}

/// 附加图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub picture_type: PictureType,
    pub mime: String,
    pub description: String,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// 扁平标签集合
///
/// 标签按插入顺序写出，同名标签允许重复
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagSet {
    pub comments: Vec<(String, String)>,
    pub pictures: Vec<Picture>,
}

impl TagSet {
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.comments.push((name.into(), value.into()));
    }

    /// 第一个同名标签的值
    pub fn get(&self, name: &str) -> Option<&str> {
        self.comments
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Container Writer Port
#[async_trait]
pub trait ContainerWriterPort: Send + Sync {
    /// 按时间线顺序编码全部片段，连同标签写入 destination
    async fn write(
        &self,
        audio: &AudioTimeline,
        tags: &TagSet,
        destination: &Path,
    ) -> Result<(), ContainerError>;
}
