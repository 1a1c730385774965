//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::path::PathBuf;

use crate::application::services::TagBoilerplate;
use crate::domain::{SegmentConfig, DEFAULT_MAX_CHARS, DEFAULT_MIN_CHARS};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// TTS 引擎配置
    #[serde(default)]
    pub tts: TtsConfig,

    /// 音频输出配置
    #[serde(default)]
    pub audio: AudioConfig,

    /// 片段缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 转换流程配置
    #[serde(default)]
    pub conversion: ConversionConfig,

    /// 固定标签
    #[serde(default)]
    pub tags: TagsConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 语音合成引擎
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// 外部 HTTP TTS 服务
    Http,
    /// 本地正弦音，离线试跑用
    Fake,
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => f.write_str("http"),
            Self::Fake => f.write_str("fake"),
        }
    }
}

/// TTS 引擎配置
#[derive(Debug, Clone, Deserialize)]
pub struct TtsConfig {
    #[serde(default = "default_engine")]
    pub engine: EngineKind,

    /// TTS 服务 URL
    #[serde(default = "default_tts_url")]
    pub url: String,

    /// 请求超时时间（秒）
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u64,

    /// 最大重试次数
    #[serde(default = "default_tts_retries")]
    pub max_retries: u32,

    /// 默认音色
    #[serde(default = "default_voice")]
    pub voice: String,

    /// 默认语速倍率
    #[serde(default = "default_speed")]
    pub speed: f32,

    /// 单次请求的文本上限（字符）
    #[serde(default = "default_max_unit_chars")]
    pub max_unit_chars: usize,

    /// 短句合并的下限（字符）
    #[serde(default = "default_min_unit_chars")]
    pub min_unit_chars: usize,
}

fn default_engine() -> EngineKind {
    EngineKind::Http
}

fn default_tts_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_tts_timeout() -> u64 {
    120
}

fn default_tts_retries() -> u32 {
    2
}

fn default_voice() -> String {
    "af_heart".to_string()
}

fn default_speed() -> f32 {
    1.0
}

fn default_max_unit_chars() -> usize {
    DEFAULT_MAX_CHARS
}

fn default_min_unit_chars() -> usize {
    DEFAULT_MIN_CHARS
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            url: default_tts_url(),
            timeout_secs: default_tts_timeout(),
            max_retries: default_tts_retries(),
            voice: default_voice(),
            speed: default_speed(),
            max_unit_chars: default_max_unit_chars(),
            min_unit_chars: default_min_unit_chars(),
        }
    }
}

impl TtsConfig {
    pub fn segment_config(&self) -> SegmentConfig {
        SegmentConfig {
            min_chars: self.min_unit_chars,
            max_chars: self.max_unit_chars,
        }
    }
}

/// 音频输出配置
#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// 合成与输出采样率
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Opus 比特率（bit/s）
    #[serde(default = "default_bitrate")]
    pub bitrate: u32,
}

fn default_sample_rate() -> u32 {
    24000
}

fn default_bitrate() -> u32 {
    32_000
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            bitrate: default_bitrate(),
        }
    }
}

/// 片段缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// 复用已合成的片段
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// 缓存根目录
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".epubcast_cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
        }
    }
}

/// 转换流程配置
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionConfig {
    /// 只处理前 N 章
    #[serde(default)]
    pub max_chapters: Option<usize>,

    /// 同时合成的章节数
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_concurrency() -> usize {
    1
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            max_chapters: None,
            concurrency: default_concurrency(),
        }
    }
}

/// 固定标签
#[derive(Debug, Clone, Deserialize)]
pub struct TagsConfig {
    #[serde(default = "default_organization")]
    pub organization: String,

    #[serde(default = "default_performer")]
    pub performer: String,

    #[serde(default = "default_copyright")]
    pub copyright: String,
}

fn default_organization() -> String {
    TagBoilerplate::default().organization
}

fn default_performer() -> String {
    TagBoilerplate::default().performer
}

fn default_copyright() -> String {
    TagBoilerplate::default().copyright
}

impl Default for TagsConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            performer: default_performer(),
            copyright: default_copyright(),
        }
    }
}

impl From<&TagsConfig> for TagBoilerplate {
    fn from(tags: &TagsConfig) -> Self {
        Self {
            organization: tags.organization.clone(),
            performer: tags.performer.clone(),
            copyright: tags.copyright.clone(),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别 (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
