//! Book Context - 书籍限界上下文
//!
//! 职责:
//! - 书籍元数据与指纹
//! - 章节实体与章节标记
//! - 输出文件命名

mod entities;
mod errors;
mod naming;
mod value_objects;

pub use entities::{format_duration, format_time, Chapter, ChapterMarker, RawChapter};
pub use errors::BookError;
pub use naming::{resolve_output_path, sanitize_filename, OUTPUT_EXTENSION};
pub use value_objects::{BookFingerprint, BookMetadata, CoverImage};
