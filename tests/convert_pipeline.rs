//! 转换流水线集成测试
//!
//! 使用内存中的解析结果与固定磁盘空间，其余均为真实适配器

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use epubcast::application::ports::{
    BookParserPort, DiskProbeError, DiskSpacePort, ParseError, ParsedBook, SpeechEnginePort,
};
use epubcast::application::{ConversionError, ConvertBook, ConvertBookHandler, ErrorKind};
use epubcast::domain::book::{BookFingerprint, BookMetadata, RawChapter};
use epubcast::infrastructure::adapters::{
    FakeTtsClient, FakeTtsClientConfig, OggOpusWriter, WavPcmStore,
};
use epubcast::infrastructure::FileAudioCache;

struct FakeParser {
    book: ParsedBook,
}

#[async_trait]
impl BookParserPort for FakeParser {
    async fn parse(&self, _path: &Path) -> Result<ParsedBook, ParseError> {
        Ok(self.book.clone())
    }
}

struct FixedDisk(u64);

#[async_trait]
impl DiskSpacePort for FixedDisk {
    async fn available_bytes(&self, _path: &Path) -> Result<u64, DiskProbeError> {
        Ok(self.0)
    }
}

/// 缓存目录所在的卷空间不足，其余位置充足
struct TightCacheVolume {
    cache_root: PathBuf,
    available: u64,
}

#[async_trait]
impl DiskSpacePort for TightCacheVolume {
    async fn available_bytes(&self, path: &Path) -> Result<u64, DiskProbeError> {
        if path.starts_with(&self.cache_root) {
            Ok(self.available)
        } else {
            Ok(u64::MAX)
        }
    }
}

fn book(chapters: Vec<RawChapter>) -> ParsedBook {
    let mut metadata = BookMetadata::with_title("Test Book");
    metadata.creator = Some("A. Writer".to_string());
    metadata.language = Some("en".to_string());
    ParsedBook {
        metadata,
        chapters,
        warnings: Vec::new(),
    }
}

fn two_chapters() -> ParsedBook {
    book(vec![
        RawChapter::new(Some("Chapter One"), "It was a bright cold day in April.", "c1"),
        RawChapter::new(Some("Chapter Two"), "The clocks were striking thirteen.", "c2"),
    ])
}

struct Fixture {
    dir: TempDir,
    input: PathBuf,
    engine: Arc<FakeTtsClient>,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("book.epub");
        std::fs::write(&input, b"pretend epub bytes").unwrap();
        Self {
            dir,
            input,
            // 每个字符 0.1 秒
            engine: Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
                frames_per_char: 2400,
                ..Default::default()
            })),
        }
    }

    fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    fn book_dir(&self) -> PathBuf {
        let fingerprint = BookFingerprint::of_bytes(b"pretend epub bytes");
        self.cache_root().join(fingerprint.as_str())
    }

    fn output(&self) -> PathBuf {
        self.dir.path().join("out").join("book")
    }

    fn handler(&self, parsed: ParsedBook, disk: u64) -> ConvertBookHandler {
        self.handler_on(parsed, Arc::new(FixedDisk(disk)))
    }

    fn handler_on(&self, parsed: ParsedBook, disk: Arc<dyn DiskSpacePort>) -> ConvertBookHandler {
        let engine: Arc<dyn SpeechEnginePort> = self.engine.clone();
        ConvertBookHandler::new(
            Arc::new(FakeParser { book: parsed }),
            engine,
            Arc::new(FileAudioCache::new(self.cache_root())),
            Arc::new(WavPcmStore::new()),
            Arc::new(OggOpusWriter::default()),
            disk,
        )
    }

    fn command(&self) -> ConvertBook {
        let mut command = ConvertBook::new(&self.input);
        command.output = Some(self.output());
        command
    }
}

fn contains(haystack: &[u8], needle: &str) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle.as_bytes())
}

#[tokio::test]
async fn test_converts_book_to_tagged_opus() {
    let fx = Fixture::new();
    let summary = fx
        .handler(two_chapters(), u64::MAX)
        .handle(fx.command())
        .await
        .unwrap();

    let expected = fx.dir.path().join("out").join("book.opus");
    assert_eq!(summary.output, expected);
    assert_eq!(summary.chapters, 2);
    // "Chapter One" 11 字符 + 正文 34 字符 = 4.5 秒；第二章同样 4.5 秒
    assert!((summary.duration_secs - 9.0).abs() < 1e-6);
    // 两个标题 + 两段正文
    assert_eq!(summary.engine_calls, 4);
    assert_eq!(fx.engine.call_count(), 4);

    let bytes = std::fs::read(&expected).unwrap();
    assert!(bytes.starts_with(b"OggS"));
    assert!(contains(&bytes, "TITLE=Test Book"));
    assert!(contains(&bytes, "ARTIST=A. Writer"));
    assert!(contains(&bytes, "CHAPTER000=00:00"));
    assert!(contains(&bytes, "CHAPTER000NAME=Chapter One"));
    assert!(contains(&bytes, "CHAPTER001=00:04"));
    assert!(contains(&bytes, "CHAPTER001NAME=Chapter Two"));

    // 缓存目录中只有片段，没有整书中间文件
    let entries = std::fs::read_dir(fx.book_dir()).unwrap().count();
    assert_eq!(entries, 4);
}

#[tokio::test]
async fn test_second_run_is_served_from_cache() {
    let fx = Fixture::new();
    fx.handler(two_chapters(), u64::MAX)
        .handle(fx.command())
        .await
        .unwrap();
    assert_eq!(fx.engine.call_count(), 4);

    let summary = fx
        .handler(two_chapters(), u64::MAX)
        .handle(fx.command())
        .await
        .unwrap();

    assert_eq!(fx.engine.call_count(), 4);
    assert_eq!(summary.engine_calls, 0);
    assert_eq!(summary.cache_hits, 4);
}

#[tokio::test]
async fn test_no_cache_removes_book_namespace() {
    let fx = Fixture::new();
    let mut command = fx.command();
    command.use_cache = false;

    fx.handler(two_chapters(), u64::MAX)
        .handle(command)
        .await
        .unwrap();

    assert!(fx.dir.path().join("out").join("book.opus").exists());
    assert!(!fx.book_dir().exists());
}

#[tokio::test]
async fn test_max_chapters_limits_markers() {
    let fx = Fixture::new();
    let mut command = fx.command();
    command.max_chapters = Some(1);

    let summary = fx
        .handler(two_chapters(), u64::MAX)
        .handle(command)
        .await
        .unwrap();

    assert_eq!(summary.chapters, 1);
    assert_eq!(fx.engine.call_count(), 2);
    let bytes = std::fs::read(&summary.output).unwrap();
    assert!(!contains(&bytes, "CHAPTER001"));
}

#[tokio::test]
async fn test_book_without_text_is_invalid_input() {
    let fx = Fixture::new();
    let parsed = book(vec![
        RawChapter::new(Some("Cover"), "   ", "c0"),
        RawChapter::new(None, "", "c1"),
    ]);

    let err: ConversionError = fx
        .handler(parsed, u64::MAX)
        .handle(fx.command())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert_eq!(err.exit_code(), 1);
    assert_eq!(fx.engine.call_count(), 0);
    assert!(!fx.dir.path().join("out").join("book.opus").exists());
}

#[tokio::test]
async fn test_insufficient_disk_space() {
    let fx = Fixture::new();
    let err = fx
        .handler(two_chapters(), 10)
        .handle(fx.command())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DiskSpaceError);
    assert_eq!(err.exit_code(), 4);
    assert_eq!(fx.engine.call_count(), 0);
}

#[tokio::test]
async fn test_disk_estimate_follows_chapter_cap() {
    let fx = Fixture::new();
    // 一章正文 34 字符 → 3400 字节；两章需要 6800 字节
    let err = fx
        .handler(two_chapters(), 5000)
        .handle(fx.command())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DiskSpaceError);

    let mut command = fx.command();
    command.max_chapters = Some(1);
    let summary = fx
        .handler(two_chapters(), 5000)
        .handle(command)
        .await
        .unwrap();
    assert_eq!(summary.chapters, 1);
}

#[tokio::test]
async fn test_cache_volume_is_checked() {
    let fx = Fixture::new();
    let disk = Arc::new(TightCacheVolume {
        cache_root: fx.cache_root(),
        available: 100,
    });

    let err = fx
        .handler_on(two_chapters(), disk)
        .handle(fx.command())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DiskSpaceError);
    assert!(err.to_string().contains("100 bytes available"));
    assert_eq!(fx.engine.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_voice_fails_before_synthesis() {
    let fx = Fixture::new();
    let mut command = fx.command();
    command.voice = "zz_nobody".to_string();

    let err = fx
        .handler(two_chapters(), u64::MAX)
        .handle(command)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::VoiceError);
    assert!(err.to_string().contains("Available voices"));
    assert_eq!(fx.engine.call_count(), 0);
}

#[tokio::test]
async fn test_missing_input_file() {
    let fx = Fixture::new();
    let mut command = fx.command();
    command.input = fx.dir.path().join("absent.epub");

    let err = fx
        .handler(two_chapters(), u64::MAX)
        .handle(command)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}
