//! Speech Engine Port - 语音合成引擎抽象
//!
//! 定义语音合成的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use thiserror::Error;

/// TTS 错误
#[derive(Debug, Error)]
pub enum TtsError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Voice not found: {0}")]
    VoiceNotFound(String),

    #[error("Audio decoding error: {0}")]
    DecodingError(String),
}

/// 合成请求
#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    /// 要合成的文本
    pub text: String,
    /// 音色 ID
    pub voice: String,
    /// 语速倍率
    pub speed: f32,
}

/// 合成结果片段
///
/// samples 为 None 表示该文本单元没有音频（例如只有标点）
#[derive(Debug, Clone)]
pub struct AudioChunk {
    pub text: String,
    /// 单声道 f32 样本，范围 [-1, 1]，采样率为引擎的固定采样率
    pub samples: Option<Vec<f32>>,
}

/// 惰性、有限、不可重启的片段序列
pub type AudioChunkStream = BoxStream<'static, Result<AudioChunk, TtsError>>;

/// Speech Engine Port
///
/// 合成引擎被视为纯函数（可能很慢），可以被调用任意次数
#[async_trait]
pub trait SpeechEnginePort: Send + Sync {
    /// 输出采样率（固定）
    fn sample_rate(&self) -> u32;

    /// 可用音色列表
    async fn voices(&self) -> Result<Vec<String>, TtsError>;

    /// 开始合成，返回惰性片段流
    ///
    /// 调用本身不做任何 I/O，请求在流被拉取时才发出
    fn synthesize(&self, request: SynthesisRequest) -> AudioChunkStream;

    /// 检查引擎是否可用
    async fn health_check(&self) -> bool {
        true // 默认实现
    }
}
