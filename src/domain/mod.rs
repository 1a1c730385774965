//! Domain Layer - 领域层
//!
//! - Book Context: 书籍元数据、章节、章节标记、输出命名
//! - Audio: PCM 片段句柄与拼接前置条件

pub mod audio;
pub mod book;

// 章节清洗
mod chapter_extractor;

// 共享的文本分割器
mod text_segmenter;

pub use chapter_extractor::{extract_chapters, parse_roman};
pub use text_segmenter::{segment_text, SegmentConfig, DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS};
