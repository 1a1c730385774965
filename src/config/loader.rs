//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（epubcast.toml）
//! 3. 默认值
//!
//! 命令行参数在加载之后再覆盖

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, EngineKind};
use crate::application::services::TagBoilerplate;

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["epubcast", "epubcast.local"];

/// Opus 支持的采样率
const OPUS_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];

/// 加载应用配置
///
/// # 环境变量示例
/// - `EPUBCAST_TTS__URL=http://tts-server:8000`
/// - `EPUBCAST_TTS__ENGINE=fake`
/// - `EPUBCAST_CACHE__DIR=/var/cache/epubcast`
/// - `EPUBCAST_CONVERSION__CONCURRENCY=4`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径（必须存在），为 None 时搜索默认文件
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let boilerplate = TagBoilerplate::default();
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级）
    builder = builder
        .set_default("tts.engine", "http")?
        .set_default("tts.url", "http://localhost:8000")?
        .set_default("tts.timeout_secs", 120)?
        .set_default("tts.max_retries", 2)?
        .set_default("tts.voice", "af_heart")?
        .set_default("tts.speed", 1.0)?
        .set_default("tts.max_unit_chars", crate::domain::DEFAULT_MAX_CHARS as u64)?
        .set_default("tts.min_unit_chars", crate::domain::DEFAULT_MIN_CHARS as u64)?
        .set_default("audio.sample_rate", 24000)?
        .set_default("audio.bitrate", 32_000)?
        .set_default("cache.enabled", true)?
        .set_default("cache.dir", ".epubcast_cache")?
        .set_default("conversion.concurrency", 1)?
        .set_default("tags.organization", boilerplate.organization)?
        .set_default("tags.performer", boilerplate.performer)?
        .set_default("tags.copyright", boilerplate.copyright)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: EPUBCAST_TTS__URL=http://tts-server:8000
    builder = builder.add_source(
        Environment::with_prefix("EPUBCAST")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// 验证配置有效性
///
/// 命令行覆盖之后需要再次调用
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if !OPUS_SAMPLE_RATES.contains(&config.audio.sample_rate) {
        return Err(ConfigError::ValidationError(format!(
            "Sample rate {} Hz is not supported by Opus (use one of {:?})",
            config.audio.sample_rate, OPUS_SAMPLE_RATES
        )));
    }

    if !(config.tts.speed > 0.0) {
        return Err(ConfigError::ValidationError(
            "Speech rate must be greater than 0".to_string(),
        ));
    }

    if config.conversion.concurrency == 0 {
        return Err(ConfigError::ValidationError(
            "Concurrency must be at least 1".to_string(),
        ));
    }

    if config.conversion.max_chapters == Some(0) {
        return Err(ConfigError::ValidationError(
            "Max chapters must be at least 1".to_string(),
        ));
    }

    if config.tts.engine == EngineKind::Http && config.tts.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "TTS URL cannot be empty".to_string(),
        ));
    }

    if config.tts.max_unit_chars == 0 || config.tts.min_unit_chars > config.tts.max_unit_chars {
        return Err(ConfigError::ValidationError(format!(
            "Invalid unit length bounds: min {} / max {}",
            config.tts.min_unit_chars, config.tts.max_unit_chars
        )));
    }

    Ok(())
}

/// 打印配置信息（debug 级别）
pub fn print_config(config: &AppConfig) {
    tracing::debug!("=== Application Configuration ===");
    tracing::debug!("TTS Engine: {}", config.tts.engine);
    if config.tts.engine == EngineKind::Http {
        tracing::debug!("TTS URL: {}", config.tts.url);
        tracing::debug!("TTS Timeout: {}s", config.tts.timeout_secs);
    }
    tracing::debug!("Voice: {} (speed {})", config.tts.voice, config.tts.speed);
    tracing::debug!("Sample Rate: {} Hz, Bitrate: {} bit/s", config.audio.sample_rate, config.audio.bitrate);
    tracing::debug!("Cache: {} ({:?})", config.cache.enabled, config.cache.dir);
    if let Some(max) = config.conversion.max_chapters {
        tracing::debug!("Max Chapters: {}", max);
    }
    tracing::debug!("Concurrency: {}", config.conversion.concurrency);
    tracing::debug!("Log Level: {}", config.log.level);
    tracing::debug!("=================================");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_validation_passes_for_default_config() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_validation_error_for_non_opus_rate() {
        let mut config = AppConfig::default();
        config.audio.sample_rate = 44100;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_speed() {
        let mut config = AppConfig::default();
        config.tts.speed = 0.0;
        assert!(validate_config(&config).is_err());
        config.tts.speed = f32::NAN;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_concurrency() {
        let mut config = AppConfig::default();
        config.conversion.concurrency = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validation_error_for_zero_max_chapters() {
        let mut config = AppConfig::default();
        config.conversion.max_chapters = Some(0);
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_empty_url_only_matters_for_http_engine() {
        let mut config = AppConfig::default();
        config.tts.url = String::new();
        assert!(validate_config(&config).is_err());

        config.tts.engine = EngineKind::Fake;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[tts]\nengine = \"fake\"\nvoice = \"am_adam\"\n\n[conversion]\nmax_chapters = 3").unwrap();

        let config = load_config_from_path(Some(&path)).unwrap();
        assert_eq!(config.tts.engine, EngineKind::Fake);
        assert_eq!(config.tts.voice, "am_adam");
        assert_eq!(config.conversion.max_chapters, Some(3));
        assert_eq!(config.audio.sample_rate, 24000);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config_from_path(Some(&dir.path().join("absent.toml")));
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }
}
