//! HTTP TTS Client - 调用外部 TTS HTTP 服务
//!
//! 实现 SpeechEnginePort trait，通过 HTTP 调用外部 TTS 服务
//!
//! 外部 TTS API:
//! POST {base_url}/api/tts/infer
//! Request: {"text": "...", "voice": "af_heart", "speed": 1.0}  (JSON)
//! Response: audio/wav binary
//!
//! GET {base_url}/api/voices
//! Response: ["af_heart", ...] 或 {"voices": [...]}

use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{
    AudioChunk, AudioChunkStream, SpeechEnginePort, SynthesisRequest, TtsError,
};
use crate::domain::{segment_text, SegmentConfig};
use crate::infrastructure::adapters::audio::decode_to_mono;

/// TTS 推理请求体 (JSON)
#[derive(Debug, Serialize)]
struct TtsHttpRequest<'a> {
    text: &'a str,
    voice: &'a str,
    speed: f32,
}

/// 音色列表响应（两种格式都接受）
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum VoicesResponse {
    List(Vec<String>),
    Wrapped { voices: Vec<String> },
}

/// 错误响应体
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP TTS 客户端配置
#[derive(Debug, Clone)]
pub struct HttpTtsClientConfig {
    /// TTS 服务基础 URL
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 网络错误/超时的重试次数
    pub max_retries: u32,
    /// 输出采样率，服务返回的音频会被重采样到这个值
    pub sample_rate: u32,
    /// 单次请求的文本切分
    pub segment: SegmentConfig,
}

impl Default for HttpTtsClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            timeout_secs: 120,
            max_retries: 2,
            sample_rate: 24000,
            segment: SegmentConfig::default(),
        }
    }
}

impl HttpTtsClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }
}

struct Inner {
    client: Client,
    config: HttpTtsClientConfig,
}

impl Inner {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// 合成一个文本单元，网络错误与超时按配置重试
    async fn infer_unit(&self, text: &str, voice: &str, speed: f32) -> Result<Option<Vec<f32>>, TtsError> {
        let mut attempt = 0;
        loop {
            match self.request_audio(text, voice, speed).await {
                Ok(bytes) if bytes.is_empty() => return Ok(None),
                Ok(bytes) => {
                    let samples = decode_to_mono(&bytes, self.config.sample_rate)
                        .map_err(TtsError::DecodingError)?;
                    return Ok(Some(samples));
                }
                Err(e) if attempt < self.config.max_retries && is_retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(attempt, error = %e, "TTS request failed, retrying");
                    tokio::time::sleep(Duration::from_millis(500 * attempt as u64)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn request_audio(&self, text: &str, voice: &str, speed: f32) -> Result<Vec<u8>, TtsError> {
        let url = self.url("/api/tts/infer");
        tracing::debug!(url = %url, text_len = text.len(), voice = %voice, "Sending TTS infer request");

        let response = self
            .client
            .post(&url)
            .json(&TtsHttpRequest { text, voice, speed })
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status, &body, voice));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Failed to read audio: {}", e)))?;

        tracing::trace!(audio_size = audio.len(), "TTS unit completed");
        Ok(audio.to_vec())
    }
}

fn map_reqwest(e: reqwest::Error) -> TtsError {
    if e.is_timeout() {
        TtsError::Timeout
    } else if e.is_connect() {
        TtsError::NetworkError(format!("Cannot connect to TTS service: {}", e))
    } else {
        TtsError::NetworkError(e.to_string())
    }
}

fn is_retryable(e: &TtsError) -> bool {
    matches!(e, TtsError::Timeout | TtsError::NetworkError(_))
}

/// 根据状态码与错误体构造错误，请求中的音色不存在时返回 VoiceNotFound
fn service_error(status: StatusCode, body: &str, voice: &str) -> TtsError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.detail.or(b.error))
        .unwrap_or_else(|| body.to_string());

    let client_error = matches!(
        status,
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
    );
    if client_error && message.to_lowercase().contains("voice") {
        return TtsError::VoiceNotFound(voice.to_string());
    }

    TtsError::ServiceError(format!("HTTP {}: {}", status, message))
}

/// HTTP TTS 客户端
///
/// 文本按 SegmentConfig 切分为多个单元，每个单元一次请求，
/// 请求在片段流被拉取时才发出
pub struct HttpTtsClient {
    inner: Arc<Inner>,
}

impl HttpTtsClient {
    /// 创建新的 HTTP TTS 客户端
    pub fn new(config: HttpTtsClientConfig) -> Result<Self, TtsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TtsError::NetworkError(e.to_string()))?;

        tracing::debug!(base_url = %config.base_url, timeout_secs = config.timeout_secs, "HttpTtsClient initialized");

        Ok(Self {
            inner: Arc::new(Inner { client, config }),
        })
    }
}

#[async_trait]
impl SpeechEnginePort for HttpTtsClient {
    fn sample_rate(&self) -> u32 {
        self.inner.config.sample_rate
    }

    async fn voices(&self) -> Result<Vec<String>, TtsError> {
        let response = self
            .inner
            .client
            .get(self.inner.url("/api/voices"))
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TtsError::ServiceError(format!("HTTP {}: {}", status, body)));
        }

        let voices = response
            .json::<VoicesResponse>()
            .await
            .map_err(|e| TtsError::InvalidResponse(format!("Invalid voice list: {}", e)))?;

        Ok(match voices {
            VoicesResponse::List(list) => list,
            VoicesResponse::Wrapped { voices } => voices,
        })
    }

    fn synthesize(&self, request: SynthesisRequest) -> AudioChunkStream {
        let units = segment_text(&request.text, &self.inner.config.segment);
        let state = (units.into_iter(), self.inner.clone(), request);

        stream::unfold(state, |(mut units, inner, request)| async move {
            let unit = units.next()?;
            let result = inner
                .infer_unit(&unit, &request.voice, request.speed)
                .await
                .map(|samples| AudioChunk { text: unit, samples });
            Some((result, (units, inner, request)))
        })
        .boxed()
    }

    async fn health_check(&self) -> bool {
        match self
            .inner
            .client
            .get(self.inner.url("/health"))
            .timeout(Duration::from_secs(5))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}
