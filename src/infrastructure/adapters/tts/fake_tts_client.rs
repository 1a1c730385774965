//! Fake TTS Client - 不调用 TTS 服务的合成引擎
//!
//! 为每个文本单元生成确定性的正弦音，时长与字符数成正比。
//! 用于离线试跑（`tts.engine = "fake"`）和测试。

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::application::ports::{
    AudioChunk, AudioChunkStream, SpeechEnginePort, SynthesisRequest, TtsError,
};
use crate::domain::{segment_text, SegmentConfig};

/// 正弦音频率（Hz）
const TONE_HZ: f32 = 220.0;
const TONE_AMPLITUDE: f32 = 0.2;

/// Fake TTS Client 配置
#[derive(Debug, Clone)]
pub struct FakeTtsClientConfig {
    /// 采样率
    pub sample_rate: u32,
    /// 每个字符生成的帧数
    pub frames_per_char: usize,
    /// 可用音色
    pub voices: Vec<String>,
    pub segment: SegmentConfig,
    /// 文本单元包含该子串时返回错误
    pub fail_on: Option<String>,
}

impl Default for FakeTtsClientConfig {
    fn default() -> Self {
        Self {
            sample_rate: 24000,
            frames_per_char: 240,
            voices: ["af_heart", "af_bella", "am_adam", "bf_emma"]
                .iter()
                .map(|v| v.to_string())
                .collect(),
            segment: SegmentConfig::default(),
            fail_on: None,
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    calls: AtomicUsize,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            sample_rate = config.sample_rate,
            frames_per_char = config.frames_per_char,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// synthesize 被调用的次数
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tone(&self, unit: &str) -> Vec<f32> {
        let frames = unit.chars().count() * self.config.frames_per_char;
        let step = TONE_HZ * std::f32::consts::TAU / self.config.sample_rate as f32;
        (0..frames)
            .map(|i| (i as f32 * step).sin() * TONE_AMPLITUDE)
            .collect()
    }

    fn render(&self, unit: String) -> Result<AudioChunk, TtsError> {
        if let Some(marker) = &self.config.fail_on {
            if unit.contains(marker.as_str()) {
                return Err(TtsError::ServiceError(format!("injected failure on '{}'", marker)));
            }
        }

        // 没有可发音字符的单元不产生音频
        let samples = if unit.chars().any(char::is_alphanumeric) {
            Some(self.tone(&unit))
        } else {
            None
        };
        Ok(AudioChunk { text: unit, samples })
    }
}

#[async_trait]
impl SpeechEnginePort for FakeTtsClient {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    async fn voices(&self) -> Result<Vec<String>, TtsError> {
        Ok(self.config.voices.clone())
    }

    fn synthesize(&self, request: SynthesisRequest) -> AudioChunkStream {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            text_len = request.text.len(),
            voice = %request.voice,
            "FakeTtsClient: generating tone"
        );

        if !self.config.voices.contains(&request.voice) {
            return stream::once(async move { Err(TtsError::VoiceNotFound(request.voice)) }).boxed();
        }

        let chunks: Vec<Result<AudioChunk, TtsError>> = segment_text(&request.text, &self.config.segment)
            .into_iter()
            .map(|unit| self.render(unit))
            .collect();
        stream::iter(chunks).boxed()
    }
}
