//! Synthesis Adapter - 带缓存的语音合成
//!
//! 职责:
//! - 音色校验
//! - 缓存命中时跳过合成引擎
//! - 通过 in-progress 临时文件 + 原子重命名写入缓存
//! - 同一缓存 key 同时最多一次合成（按路径加锁）
//! - 引擎/文件错误翻译为 ConversionError

use async_trait::async_trait;
use dashmap::DashMap;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::error::ConversionError;
use crate::application::ports::{
    generate_cache_key, in_progress_path, AudioCachePort, PcmError, PcmStorePort,
    SpeechEnginePort, SynthesisRequest,
};
use crate::domain::audio::AudioSegment;
use crate::domain::book::BookFingerprint;

/// 把文本变成一段音频
///
/// Assembly Engine 只依赖这个抽象
#[async_trait]
pub trait SegmentSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<AudioSegment, ConversionError>;
}

/// 合成参数
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub voice: String,
    pub speed: f32,
    /// 是否复用已有缓存条目
    pub use_cache: bool,
}

/// 运行统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SynthesisStats {
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub engine_calls: usize,
}

pub struct SynthesisAdapter {
    engine: Arc<dyn SpeechEnginePort>,
    cache: Arc<dyn AudioCachePort>,
    pcm: Arc<dyn PcmStorePort>,
    fingerprint: BookFingerprint,
    settings: SynthesisSettings,
    /// 每个缓存路径一把锁，条目在本次运行内不回收
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
    engine_calls: AtomicUsize,
}

impl SynthesisAdapter {
    /// 校验音色并创建适配器
    pub async fn connect(
        engine: Arc<dyn SpeechEnginePort>,
        cache: Arc<dyn AudioCachePort>,
        pcm: Arc<dyn PcmStorePort>,
        fingerprint: BookFingerprint,
        settings: SynthesisSettings,
    ) -> Result<Self, ConversionError> {
        let voices = engine.voices().await?;

        if !voices.iter().any(|voice| voice == &settings.voice) {
            return Err(ConversionError::voice(format!(
                "Invalid voice '{}'. Available voices: {}",
                settings.voice,
                voices.join(", ")
            )));
        }

        tracing::debug!(
            voice = %settings.voice,
            speed = settings.speed,
            use_cache = settings.use_cache,
            sample_rate = engine.sample_rate(),
            "Synthesis adapter connected"
        );

        Ok(Self {
            engine,
            cache,
            pcm,
            fingerprint,
            settings,
            locks: DashMap::new(),
            cache_hits: AtomicUsize::new(0),
            cache_misses: AtomicUsize::new(0),
            engine_calls: AtomicUsize::new(0),
        })
    }

    pub fn stats(&self) -> SynthesisStats {
        SynthesisStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            engine_calls: self.engine_calls.load(Ordering::Relaxed),
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// 读取已完成的缓存条目，损坏的条目会被删除
    async fn read_cached(&self, path: &Path) -> Option<AudioSegment> {
        if !self.cache.exists(path).await {
            return None;
        }

        match self.pcm.open(path).await {
            Ok(segment) => Some(segment),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Corrupt cache entry, re-synthesizing"
                );
                if let Err(e) = tokio::fs::remove_file(path).await {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove corrupt cache entry");
                }
                None
            }
        }
    }

    /// 合成到 in-progress 文件，成功后原子重命名到 path
    async fn synthesize_into(&self, text: &str, path: &Path) -> Result<AudioSegment, ConversionError> {
        let working = in_progress_path(path);

        match tokio::fs::remove_file(&working).await {
            Ok(()) => tracing::debug!(path = %working.display(), "Removed stale in-progress file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ConversionError::filesystem(
                    format!("Failed to remove stale file {}", working.display()),
                    e,
                ))
            }
        }

        self.engine_calls.fetch_add(1, Ordering::Relaxed);

        let result = async {
            let frames = self.stream_to_file(text, &working).await?;
            tokio::fs::rename(&working, path).await.map_err(|e| {
                ConversionError::filesystem(
                    format!("Failed to move {} into place", working.display()),
                    e,
                )
            })?;
            Ok::<_, ConversionError>(frames)
        }
        .await;

        match result {
            Ok(frames) => {
                tracing::debug!(path = %path.display(), frames, "Cache entry written");
                Ok(self.pcm.open(path).await?)
            }
            Err(e) => {
                discard_partial(&working).await;
                Err(e)
            }
        }
    }

    /// hound 的写入是同步 IO，放到阻塞线程池执行
    async fn stream_to_file(&self, text: &str, working: &Path) -> Result<u64, ConversionError> {
        let pcm = self.pcm.clone();
        let target = working.to_path_buf();
        let sample_rate = self.engine.sample_rate();
        let mut sink = blocking(move || pcm.create(&target, sample_rate)).await?;

        let mut chunks = self.engine.synthesize(SynthesisRequest {
            text: text.to_string(),
            voice: self.settings.voice.clone(),
            speed: self.settings.speed,
        });

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk?;
            match chunk.samples {
                Some(samples) if !samples.is_empty() => {
                    sink = blocking(move || {
                        sink.write(&samples)?;
                        Ok(sink)
                    })
                    .await?;
                }
                _ => tracing::trace!(unit = %chunk.text, "Skipping chunk without audio"),
            }
        }

        blocking(move || sink.finalize()).await
    }
}

async fn blocking<T, F>(task: F) -> Result<T, ConversionError>
where
    F: FnOnce() -> Result<T, PcmError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|e| ConversionError::filesystem("Blocking audio task failed", e))?
        .map_err(ConversionError::from)
}

async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to remove partial cache entry"),
    }
}

#[async_trait]
impl SegmentSynthesizer for SynthesisAdapter {
    async fn synthesize(&self, text: &str) -> Result<AudioSegment, ConversionError> {
        let cache_key = generate_cache_key(text, &self.settings.voice, self.settings.speed);
        let path = self.cache.resolve_path(&self.fingerprint, &cache_key);

        let lock = self.lock_for(&path);
        let _guard = lock.lock().await;

        if self.settings.use_cache {
            if let Some(segment) = self.read_cached(&path).await {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(cache_key = %cache_key, "Cache hit");
                return Ok(segment);
            }
        }

        self.cache_misses.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(cache_key = %cache_key, text_len = text.len(), "Cache miss, synthesizing");

        self.synthesize_into(text, &path).await
    }
}
