//! Book Parser Port - EPUB 解析抽象

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use thiserror::Error;

use crate::domain::book::{BookMetadata, RawChapter};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Cannot open EPUB: {0}")]
    OpenError(String),

    #[error("Malformed EPUB: {0}")]
    Malformed(String),

    #[error("EPUB is missing a title")]
    MissingTitle,
}

/// 非致命警告类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseWarningKind {
    MissingMetadata,
    NonTextElement,
    FormattingIssue,
}

impl fmt::Display for ParseWarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MissingMetadata => "missing metadata",
            Self::NonTextElement => "non-text element",
            Self::FormattingIssue => "formatting issue",
        };
        f.write_str(name)
    }
}

/// 解析警告（在成功运行结束时汇总展示）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseWarning {
    pub kind: ParseWarningKind,
    pub message: String,
    /// 相关章节的源文档 id
    pub chapter: Option<String>,
}

impl ParseWarning {
    pub fn new(kind: ParseWarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            chapter: None,
        }
    }

    pub fn in_chapter(mut self, chapter: impl Into<String>) -> Self {
        self.chapter = Some(chapter.into());
        self
    }
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.chapter {
            Some(chapter) => write!(f, "[{}] {} ({})", self.kind, self.message, chapter),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// 解析结果
#[derive(Debug, Clone)]
pub struct ParsedBook {
    pub metadata: BookMetadata,
    /// 按阅读顺序排列的原始章节
    pub chapters: Vec<RawChapter>,
    pub warnings: Vec<ParseWarning>,
}

/// Book Parser Port
#[async_trait]
pub trait BookParserPort: Send + Sync {
    /// 解析 EPUB 文件
    ///
    /// 读取失败或缺少书名时返回错误
    async fn parse(&self, path: &Path) -> Result<ParsedBook, ParseError>;
}
