//! Convert Command Handler
//!
//! 一次转换的完整编排:
//! 指纹 → 解析 → 章节清洗 → 输出路径 → 磁盘预检 → 音色校验 → 组装 → 落盘 → 缓存清理

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::commands::ConvertBook;
use crate::application::error::ConversionError;
use crate::application::ports::{
    AudioCachePort, BookParserPort, ContainerWriterPort, DiskSpacePort, NoopProgress,
    ParseWarning, PcmStorePort, ProgressPort, SpeechEnginePort,
};
use crate::application::services::{
    cap_chapters, AssemblyEngine, AssemblyOptions, SynthesisAdapter, SynthesisSettings,
    TagBoilerplate, TagWriter,
};
use crate::domain::book::{format_duration, resolve_output_path, BookFingerprint, Chapter};
use crate::domain::extract_chapters;

/// 每个文本字符预估占用的输出字节数
pub const BYTES_PER_CHAR_ESTIMATE: u64 = 100;

/// 运行摘要
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub output: std::path::PathBuf,
    pub duration_secs: f64,
    pub chapters: usize,
    pub elapsed: Duration,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub engine_calls: usize,
    pub warnings: Vec<ParseWarning>,
}

impl ConversionSummary {
    /// 在 info 级别输出摘要
    pub fn log(&self) {
        tracing::info!(
            output = %self.output.display(),
            generation_time = %format_duration(self.elapsed.as_secs_f64()),
            audio_duration = %format_duration(self.duration_secs),
            chapters = self.chapters,
            cache_hits = self.cache_hits,
            cache_misses = self.cache_misses,
            warnings = self.warnings.len(),
            "Conversion complete"
        );
        for warning in &self.warnings {
            tracing::info!(warning = %warning, "Parse warning");
        }
    }
}

/// 预估输出所需字节数
pub fn estimate_required_bytes(chapters: &[Chapter]) -> u64 {
    let chars: usize = chapters.iter().map(|c| c.content().chars().count()).sum();
    chars as u64 * BYTES_PER_CHAR_ESTIMATE
}

/// ConvertBook Handler
pub struct ConvertBookHandler {
    parser: Arc<dyn BookParserPort>,
    engine: Arc<dyn SpeechEnginePort>,
    cache: Arc<dyn AudioCachePort>,
    pcm: Arc<dyn PcmStorePort>,
    writer: Arc<dyn ContainerWriterPort>,
    disk: Arc<dyn DiskSpacePort>,
    progress: Arc<dyn ProgressPort>,
    boilerplate: TagBoilerplate,
}

impl ConvertBookHandler {
    pub fn new(
        parser: Arc<dyn BookParserPort>,
        engine: Arc<dyn SpeechEnginePort>,
        cache: Arc<dyn AudioCachePort>,
        pcm: Arc<dyn PcmStorePort>,
        writer: Arc<dyn ContainerWriterPort>,
        disk: Arc<dyn DiskSpacePort>,
    ) -> Self {
        Self {
            parser,
            engine,
            cache,
            pcm,
            writer,
            disk,
            progress: Arc::new(NoopProgress),
            boilerplate: TagBoilerplate::default(),
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressPort>) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_boilerplate(mut self, boilerplate: TagBoilerplate) -> Self {
        self.boilerplate = boilerplate;
        self
    }

    pub async fn handle(&self, command: ConvertBook) -> Result<ConversionSummary, ConversionError> {
        let started = Instant::now();

        let bytes = tokio::fs::read(&command.input).await.map_err(|e| {
            ConversionError::InvalidInput {
                message: format!("Cannot read EPUB file {}: {}", command.input.display(), e),
                source: Some(Box::new(e)),
            }
        })?;
        let fingerprint = BookFingerprint::of_bytes(&bytes);
        drop(bytes);

        tracing::info!(
            input = %command.input.display(),
            fingerprint = %fingerprint,
            "Starting conversion"
        );

        let result = self.convert(&command, &fingerprint, started).await;

        // 未启用缓存时成功与失败都要清理
        if !command.use_cache {
            let report = self.cache.cleanup(&fingerprint).await;
            tracing::debug!(
                removed_files = report.removed_files,
                failures = report.failures.len(),
                "Cache cleaned up"
            );
        }

        result
    }

    async fn convert(
        &self,
        command: &ConvertBook,
        fingerprint: &BookFingerprint,
        started: Instant,
    ) -> Result<ConversionSummary, ConversionError> {
        let parsed = self.parser.parse(&command.input).await?;
        if parsed.metadata.title.trim().is_empty() {
            return Err(ConversionError::invalid_input("EPUB is missing a title"));
        }
        for warning in &parsed.warnings {
            tracing::debug!(warning = %warning, "Parse warning");
        }

        let chapters = extract_chapters(parsed.chapters)?;
        tracing::info!(
            title = %parsed.metadata.title,
            chapters = chapters.len(),
            "Book parsed"
        );

        let output = resolve_output_path(command.output.as_deref(), &parsed.metadata.title);
        let output_dir = match output.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    ConversionError::filesystem(
                        format!("Failed to create output directory {}", parent.display()),
                        e,
                    )
                })?;
                parent.to_path_buf()
            }
            None => std::path::PathBuf::from("."),
        };

        // 片段写在缓存目录，成品写在输出目录，两处可能位于不同的卷
        let selected = cap_chapters(&chapters, command.max_chapters);
        let required = estimate_required_bytes(selected);
        self.check_disk_space(required, &output_dir).await?;
        self.check_disk_space(required, &self.cache.book_dir(fingerprint)).await?;

        let synthesizer = SynthesisAdapter::connect(
            self.engine.clone(),
            self.cache.clone(),
            self.pcm.clone(),
            fingerprint.clone(),
            SynthesisSettings {
                voice: command.voice.clone(),
                speed: command.speed,
                use_cache: command.use_cache,
            },
        )
        .await?;

        self.cache.ensure_book_dir(fingerprint).await?;

        let assembler = AssemblyEngine::new(
            self.progress.clone(),
            AssemblyOptions {
                max_chapters: command.max_chapters,
                concurrency: command.concurrency,
            },
        );

        let assembled = assembler.assemble(&chapters, &synthesizer).await?;
        let finalized = TagWriter::new(self.writer.clone(), self.boilerplate.clone())
            .finalize(&assembled.audio, &assembled.markers, &parsed.metadata, &output)
            .await?;

        let stats = synthesizer.stats();
        Ok(ConversionSummary {
            output: finalized.path,
            duration_secs: finalized.duration_secs,
            chapters: finalized.chapters,
            elapsed: started.elapsed(),
            cache_hits: stats.cache_hits,
            cache_misses: stats.cache_misses,
            engine_calls: stats.engine_calls,
            warnings: parsed.warnings,
        })
    }

    async fn check_disk_space(&self, required: u64, dir: &Path) -> Result<(), ConversionError> {
        let available = self.disk.available_bytes(dir).await?;

        tracing::debug!(required, available, path = %dir.display(), "Disk space check");

        if available < required {
            return Err(ConversionError::DiskSpaceError {
                required,
                available,
            });
        }
        Ok(())
    }
}
