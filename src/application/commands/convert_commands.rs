//! Convert Commands

use std::path::PathBuf;

/// 转换一本 EPUB 为有声书
#[derive(Debug, Clone)]
pub struct ConvertBook {
    /// EPUB 文件路径
    pub input: PathBuf,
    /// 输出路径（未指定时使用书名）
    pub output: Option<PathBuf>,
    pub voice: String,
    pub speed: f32,
    /// 是否复用并保留缓存
    pub use_cache: bool,
    /// 只处理前 K 个章节
    pub max_chapters: Option<usize>,
    /// 同时合成的章节数
    pub concurrency: usize,
}

impl ConvertBook {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: None,
            voice: "af_heart".to_string(),
            speed: 1.0,
            use_cache: true,
            max_chapters: None,
            concurrency: 1,
        }
    }
}
