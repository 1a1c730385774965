//! Tag Writer - 容器标签与原子落盘
//!
//! 标签映射表（BookMetadata 字段 → 标签名）:
//!
//! | 字段        | 标签          |
//! |-------------|---------------|
//! | title       | `TITLE`       |
//! | creator     | `ARTIST`      |
//! | date        | `DATE`        |
//! | publisher   | `PUBLISHER`   |
//! | description | `DESCRIPTION` |
//! | language    | `LANGUAGE`    |
//!
//! 之后是固定的 `ORGANIZATION` / `PERFORMER` / `COPYRIGHT`，
//! 以及每个章节标记的 `CHAPTERnnn`（起始时间）与 `CHAPTERnnnNAME`（标题）。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::application::error::ConversionError;
use crate::application::ports::{ContainerWriterPort, Picture, PictureType, TagSet};
use crate::domain::audio::AudioTimeline;
use crate::domain::book::{BookMetadata, ChapterMarker};

/// 固定标签
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBoilerplate {
    pub organization: String,
    pub performer: String,
    pub copyright: String,
}

impl Default for TagBoilerplate {
    fn default() -> Self {
        Self {
            organization: "epubcast".to_string(),
            performer: "Kokoro TextToSpeech".to_string(),
            copyright: "https://creativecommons.org/licenses/by-sa/4.0/".to_string(),
        }
    }
}

/// 已落盘的有声书
#[derive(Debug, Clone, PartialEq)]
pub struct FinalizedAudiobook {
    pub path: PathBuf,
    pub duration_secs: f64,
    pub chapters: usize,
}

/// 生成完整标签集合（纯函数）
pub fn build_tags(
    metadata: &BookMetadata,
    markers: &[ChapterMarker],
    boilerplate: &TagBoilerplate,
) -> TagSet {
    let mut tags = TagSet::default();

    let fields: [(&str, Option<&str>); 6] = [
        ("TITLE", Some(metadata.title.as_str())),
        ("ARTIST", metadata.creator.as_deref()),
        ("DATE", metadata.date.as_deref()),
        ("PUBLISHER", metadata.publisher.as_deref()),
        ("DESCRIPTION", metadata.description.as_deref()),
        ("LANGUAGE", metadata.language.as_deref()),
    ];
    for (name, value) in fields {
        if let Some(value) = value.filter(|v| !v.trim().is_empty()) {
            tags.push(name, value);
        }
    }

    tags.push("ORGANIZATION", &boilerplate.organization);
    tags.push("PERFORMER", &boilerplate.performer);
    tags.push("COPYRIGHT", &boilerplate.copyright);

    for (index, marker) in markers.iter().enumerate() {
        tags.push(format!("CHAPTER{:03}", index), marker.start_time_str());
        tags.push(format!("CHAPTER{:03}NAME", index), &marker.title);
    }

    if let Some(cover) = &metadata.cover {
        let (width, height) = cover.dimensions().unwrap_or((0, 0));
        for picture_type in [PictureType::FrontCover, PictureType::FileIcon] {
            tags.pictures.push(Picture {
                picture_type,
                mime: cover.mime.clone(),
                description: "Cover image".to_string(),
                width,
                height,
                data: cover.data.clone(),
            });
        }
    }

    tags
}

/// 最终写入的临时路径: 目标目录下的 `.<文件名>.in-progress`
pub fn working_path(destination: &Path) -> PathBuf {
    let name = destination
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audiobook".to_string());
    let dir = destination.parent().unwrap_or_else(|| Path::new(""));
    dir.join(format!(".{}.in-progress", name))
}

pub struct TagWriter {
    writer: Arc<dyn ContainerWriterPort>,
    boilerplate: TagBoilerplate,
}

impl TagWriter {
    pub fn new(writer: Arc<dyn ContainerWriterPort>, boilerplate: TagBoilerplate) -> Self {
        Self {
            writer,
            boilerplate,
        }
    }

    /// 编码、写标签并原子移动到 destination
    ///
    /// 失败时 destination 保持不存在（或保持旧内容），临时文件被删除
    pub async fn finalize(
        &self,
        audio: &AudioTimeline,
        markers: &[ChapterMarker],
        metadata: &BookMetadata,
        destination: &Path,
    ) -> Result<FinalizedAudiobook, ConversionError> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ConversionError::filesystem(
                    format!("Failed to create output directory {}", parent.display()),
                    e,
                )
            })?;
        }

        let working = working_path(destination);
        remove_if_exists(&working).await?;

        let tags = build_tags(metadata, markers, &self.boilerplate);
        tracing::debug!(
            tags = tags.comments.len(),
            pictures = tags.pictures.len(),
            path = %working.display(),
            "Writing tagged container"
        );

        let written = async {
            self.writer.write(audio, &tags, &working).await?;
            tokio::fs::rename(&working, destination).await.map_err(|e| {
                ConversionError::filesystem(
                    format!("Failed to move audiobook to {}", destination.display()),
                    e,
                )
            })
        }
        .await;

        if let Err(e) = written {
            match tokio::fs::remove_file(&working).await {
                Ok(()) => {}
                Err(io) if io.kind() == std::io::ErrorKind::NotFound => {}
                Err(io) => tracing::warn!(path = %working.display(), error = %io, "Failed to remove working file"),
            }
            return Err(e);
        }

        tracing::info!(path = %destination.display(), "Audiobook written");

        Ok(FinalizedAudiobook {
            path: destination.to_path_buf(),
            duration_secs: audio.duration_secs(),
            chapters: markers.len(),
        })
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), ConversionError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "Removed stale working file");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ConversionError::filesystem(
            format!("Failed to remove stale file {}", path.display()),
            e,
        )),
    }
}
