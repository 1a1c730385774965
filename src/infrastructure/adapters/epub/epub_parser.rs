//! EPUB Book Parser - 基于 epub crate
//!
//! 实现 BookParserPort trait

use async_trait::async_trait;
use epub::doc::EpubDoc;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use super::html_text::extract_text;
use crate::application::ports::{
    BookParserPort, ParseError, ParseWarning, ParseWarningKind, ParsedBook,
};
use crate::domain::book::{BookMetadata, CoverImage, RawChapter};

/// 目录、版权页和封面页不朗读
static SKIPPED_DOCUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(^|[/_.\-])(toc|nav|copyright|cover)([/_.\-]|$)").expect("valid skip regex")
});

fn is_skipped_document(id: &str, path: Option<&Path>) -> bool {
    let file_name = path
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    SKIPPED_DOCUMENT.is_match(id) || SKIPPED_DOCUMENT.is_match(&file_name)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

fn read_metadata<R: std::io::Read + std::io::Seek>(
    doc: &mut EpubDoc<R>,
    warnings: &mut Vec<ParseWarning>,
) -> Result<BookMetadata, ParseError> {
    let title = non_blank(doc.mdata("title")).ok_or(ParseError::MissingTitle)?;

    let mut optional = |field: &str| {
        let value = non_blank(doc.mdata(field));
        if value.is_none() {
            warnings.push(ParseWarning::new(
                ParseWarningKind::MissingMetadata,
                format!("EPUB has no '{}' metadata", field),
            ));
        }
        value
    };

    let creator = optional("creator");
    let date = optional("date");
    let identifier = optional("identifier");
    let language = optional("language");
    let publisher = optional("publisher");
    let description = optional("description");

    let cover = doc
        .get_cover()
        .filter(|(data, _)| !data.is_empty())
        .map(|(data, mime)| CoverImage::new(data, mime));

    Ok(BookMetadata {
        title,
        creator,
        date,
        identifier,
        language,
        publisher,
        description,
        cover,
    })
}

fn parse_blocking(path: &Path) -> Result<ParsedBook, ParseError> {
    let mut doc = EpubDoc::new(path)
        .map_err(|e| ParseError::OpenError(format!("{}: {}", path.display(), e)))?;

    let mut warnings = Vec::new();
    let metadata = read_metadata(&mut doc, &mut warnings)?;

    let pages = doc.get_num_pages();
    if pages == 0 {
        return Err(ParseError::Malformed("EPUB spine is empty".to_string()));
    }

    let mut chapters = Vec::new();
    for page in 0..pages {
        if !doc.set_current_page(page) {
            return Err(ParseError::Malformed(format!("Spine item {} is not addressable", page)));
        }
        let id = doc.get_current_id().unwrap_or_else(|| format!("spine-{}", page));
        let doc_path: Option<PathBuf> = doc.get_current_path();

        if is_skipped_document(&id, doc_path.as_deref()) {
            tracing::debug!(id = %id, "Skipping navigation document");
            continue;
        }

        let Some((html, _mime)) = doc.get_current_str() else {
            warnings.push(
                ParseWarning::new(ParseWarningKind::FormattingIssue, "Document could not be read as text")
                    .in_chapter(id.clone()),
            );
            continue;
        };

        let extracted = extract_text(&html);
        if extracted.skipped_elements > 0 {
            warnings.push(
                ParseWarning::new(
                    ParseWarningKind::NonTextElement,
                    format!("Skipped {} non-text element(s)", extracted.skipped_elements),
                )
                .in_chapter(id.clone()),
            );
        }

        chapters.push(RawChapter::new(extracted.title.as_deref(), extracted.text, id));
    }

    Ok(ParsedBook {
        metadata,
        chapters,
        warnings,
    })
}

/// EPUB 解析器
#[derive(Debug, Default, Clone, Copy)]
pub struct EpubBookParser;

impl EpubBookParser {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl BookParserPort for EpubBookParser {
    async fn parse(&self, path: &Path) -> Result<ParsedBook, ParseError> {
        let path = path.to_path_buf();
        let parsed = tokio::task::spawn_blocking(move || parse_blocking(&path))
            .await
            .map_err(|e| ParseError::Malformed(format!("Parser task failed: {}", e)))??;

        tracing::info!(
            title = %parsed.metadata.title,
            documents = parsed.chapters.len(),
            warnings = parsed.warnings.len(),
            "EPUB parsed"
        );
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_documents_are_skipped() {
        assert!(is_skipped_document("toc", None));
        assert!(is_skipped_document("item1", Some(Path::new("OEBPS/copyright.xhtml"))));
        assert!(is_skipped_document("cover-page", None));
        assert!(is_skipped_document("x", Some(Path::new("Text/nav.xhtml"))));
    }

    #[test]
    fn test_story_documents_are_kept() {
        assert!(!is_skipped_document("chapter01", Some(Path::new("Text/chapter01.xhtml"))));
        assert!(!is_skipped_document("discovery", Some(Path::new("Text/discovery.xhtml"))));
        assert!(!is_skipped_document("tocsin", None));
    }

    #[test]
    fn test_non_blank_collapses_whitespace() {
        assert_eq!(non_blank(Some("  A   Title ".to_string())).as_deref(), Some("A Title"));
        assert_eq!(non_blank(Some("   ".to_string())), None);
        assert_eq!(non_blank(None), None);
    }

    #[tokio::test]
    async fn test_open_error_on_non_epub() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.epub");
        std::fs::write(&path, b"definitely not a zip").unwrap();

        let err = EpubBookParser::new().parse(&path).await.unwrap_err();
        assert!(matches!(err, ParseError::OpenError(_)));
    }
}
