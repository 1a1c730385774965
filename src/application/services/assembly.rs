//! Assembly Engine - 章节循环与时间线
//!
//! 每个章节依次产出 "标题播报" 与 "正文" 两段音频，按章节顺序累积时间线、
//! 生成章节标记，最后按产出顺序把全部片段组成一条 AudioTimeline。
//!
//! 并发度大于 1 时章节合成可以重叠，但结果仍按章节顺序被消费（缓冲重排），
//! 时间线累加始终是顺序执行的。

use futures_util::{stream, StreamExt};
use std::sync::Arc;

use super::synthesis::SegmentSynthesizer;
use crate::application::error::ConversionError;
use crate::application::ports::ProgressPort;
use crate::domain::audio::{AudioSegment, AudioTimeline};
use crate::domain::book::{Chapter, ChapterMarker};

/// 组装参数
#[derive(Debug, Clone)]
pub struct AssemblyOptions {
    /// 只处理前 K 个章节
    pub max_chapters: Option<usize>,
    /// 同时合成的章节数
    pub concurrency: usize,
}

impl Default for AssemblyOptions {
    fn default() -> Self {
        Self {
            max_chapters: None,
            concurrency: 1,
        }
    }
}

/// 前 K 个章节；无上限时返回全部
pub fn cap_chapters(chapters: &[Chapter], max_chapters: Option<usize>) -> &[Chapter] {
    let limit = max_chapters.map_or(chapters.len(), |cap| cap.min(chapters.len()));
    &chapters[..limit]
}

/// 组装结果
#[derive(Debug, Clone)]
pub struct AssembledAudio {
    /// 整书时间线
    pub audio: AudioTimeline,
    pub markers: Vec<ChapterMarker>,
}

impl AssembledAudio {
    pub fn duration_secs(&self) -> f64 {
        self.audio.duration_secs()
    }
}

pub struct AssemblyEngine {
    progress: Arc<dyn ProgressPort>,
    options: AssemblyOptions,
}

impl AssemblyEngine {
    pub fn new(progress: Arc<dyn ProgressPort>, options: AssemblyOptions) -> Self {
        Self { progress, options }
    }

    /// 组装整书时间线
    ///
    /// 不写任何文件
    pub async fn assemble<S>(
        &self,
        chapters: &[Chapter],
        synthesizer: &S,
    ) -> Result<AssembledAudio, ConversionError>
    where
        S: SegmentSynthesizer + ?Sized,
    {
        let selected = cap_chapters(chapters, self.options.max_chapters);
        if selected.len() < chapters.len() {
            tracing::info!(
                processed = selected.len(),
                skipped = chapters.len() - selected.len(),
                "Chapter cap reached, skipping remaining chapters"
            );
        }

        let concurrency = self.options.concurrency.max(1);
        self.progress.start(selected.len());

        let mut results = stream::iter(selected.iter().map(|chapter| async move {
            let announcement = synthesizer.synthesize(chapter.title()).await?;
            let content = synthesizer.synthesize(chapter.content()).await?;
            Ok::<_, ConversionError>((chapter, announcement, content))
        }))
        .buffered(concurrency);

        let mut current_time = 0.0_f64;
        let mut segments: Vec<AudioSegment> = Vec::with_capacity(selected.len() * 2);
        let mut markers: Vec<ChapterMarker> = Vec::with_capacity(selected.len());

        while let Some(result) = results.next().await {
            let (chapter, announcement, content) = result?;

            let start = current_time;
            current_time += announcement.duration_secs() + content.duration_secs();

            tracing::debug!(
                chapter = chapter.order(),
                title = %chapter.title(),
                start_secs = start,
                end_secs = current_time,
                "Chapter assembled"
            );

            markers.push(ChapterMarker::new(chapter.title(), start, current_time));
            segments.push(announcement);
            segments.push(content);
            self.progress.chapter_done(chapter.order(), chapter.title());
        }
        drop(results);

        // 采样率不一致属于内部错误，必须在创建输出文件之前发现
        let audio = AudioTimeline::new(segments)?;

        tracing::info!(
            segments = audio.segments().len(),
            sample_rate = audio.sample_rate(),
            duration_secs = audio.duration_secs(),
            "Audio timeline assembled"
        );
        self.progress.finish();

        Ok(AssembledAudio { audio, markers })
    }
}
