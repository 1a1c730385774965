//! 应用层错误定义
//!
//! 转换流程的统一错误类型，每个变体对应一个 ErrorKind 与一个进程退出码

use std::fmt;
use thiserror::Error;

use crate::application::ports::{
    CacheError, ContainerError, DiskProbeError, ParseError, PcmError, TtsError,
};
use crate::domain::audio::SegmentError;
use crate::domain::book::BookError;

/// 包装底层错误（保留原因链）
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidInput,
    VoiceError,
    SynthesisError,
    FilesystemError,
    DiskSpaceError,
    UnknownError,
}

impl ErrorKind {
    /// 进程退出码
    pub const fn exit_code(self) -> i32 {
        match self {
            Self::InvalidInput => 1,
            Self::VoiceError => 2,
            Self::FilesystemError => 3,
            Self::DiskSpaceError => 4,
            Self::SynthesisError => 5,
            Self::UnknownError => 99,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "InvalidInput",
            Self::VoiceError => "VoiceError",
            Self::SynthesisError => "SynthesisError",
            Self::FilesystemError => "FilesystemError",
            Self::DiskSpaceError => "DiskSpaceError",
            Self::UnknownError => "UnknownError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 转换错误
#[derive(Debug, Error)]
pub enum ConversionError {
    /// EPUB 无法读取/格式错误、缺少必填元数据、没有可用章节
    #[error("{message}")]
    InvalidInput {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 音色不存在
    #[error("{message}")]
    VoiceError { message: String },

    /// 合成失败（音色有效）
    #[error("{message}")]
    SynthesisError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 目录/文件创建、缓存写入、最终写入或重命名失败
    #[error("{message}")]
    FilesystemError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 预估所需空间超过可用空间
    #[error("Insufficient disk space: {required} bytes required, {available} bytes available")]
    DiskSpaceError { required: u64, available: u64 },

    /// 未预期的失败
    #[error("{message}")]
    UnknownError {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl ConversionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::VoiceError { .. } => ErrorKind::VoiceError,
            Self::SynthesisError { .. } => ErrorKind::SynthesisError,
            Self::FilesystemError { .. } => ErrorKind::FilesystemError,
            Self::DiskSpaceError { .. } => ErrorKind::DiskSpaceError,
            Self::UnknownError { .. } => ErrorKind::UnknownError,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.kind().exit_code()
    }

    /// 创建输入错误
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            source: None,
        }
    }

    /// 创建音色错误
    pub fn voice(message: impl Into<String>) -> Self {
        Self::VoiceError {
            message: message.into(),
        }
    }

    /// 创建合成错误
    pub fn synthesis(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::SynthesisError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建文件系统错误
    pub fn filesystem(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::FilesystemError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建内部错误
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::UnknownError {
            message: message.into(),
            source: None,
        }
    }
}

impl From<ParseError> for ConversionError {
    fn from(err: ParseError) -> Self {
        Self::InvalidInput {
            message: format!("Invalid EPUB file: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<BookError> for ConversionError {
    fn from(err: BookError) -> Self {
        Self::InvalidInput {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<TtsError> for ConversionError {
    fn from(err: TtsError) -> Self {
        match err {
            TtsError::VoiceNotFound(voice) => Self::voice(format!("Voice not found: {}", voice)),
            other => Self::synthesis(format!("Speech synthesis failed: {}", other), other),
        }
    }
}

impl From<CacheError> for ConversionError {
    fn from(err: CacheError) -> Self {
        Self::filesystem(format!("Cache error: {}", err), err)
    }
}

impl From<PcmError> for ConversionError {
    fn from(err: PcmError) -> Self {
        Self::filesystem(format!("Audio file error: {}", err), err)
    }
}

impl From<SegmentError> for ConversionError {
    fn from(err: SegmentError) -> Self {
        Self::UnknownError {
            message: format!("Audio timeline contract violated: {}", err),
            source: Some(Box::new(err)),
        }
    }
}

impl From<ContainerError> for ConversionError {
    fn from(err: ContainerError) -> Self {
        match err {
            ContainerError::Io(_) => Self::filesystem(format!("Failed to write audiobook: {}", err), err),
            other => Self::UnknownError {
                message: format!("Failed to encode audiobook: {}", other),
                source: Some(Box::new(other)),
            },
        }
    }
}

impl From<DiskProbeError> for ConversionError {
    fn from(err: DiskProbeError) -> Self {
        Self::filesystem(format!("Failed to check disk space: {}", err), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ErrorKind::InvalidInput.exit_code(), 1);
        assert_eq!(ErrorKind::VoiceError.exit_code(), 2);
        assert_eq!(ErrorKind::FilesystemError.exit_code(), 3);
        assert_eq!(ErrorKind::DiskSpaceError.exit_code(), 4);
        assert_eq!(ErrorKind::SynthesisError.exit_code(), 5);
        assert_eq!(ErrorKind::UnknownError.exit_code(), 99);
    }

    #[test]
    fn test_tts_error_translation() {
        let err: ConversionError = TtsError::VoiceNotFound("zz".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::VoiceError);

        let err: ConversionError = TtsError::Timeout.into();
        assert_eq!(err.kind(), ErrorKind::SynthesisError);
        assert!(err.source().is_some());
    }

    #[test]
    fn test_segment_mismatch_is_internal() {
        let err: ConversionError = SegmentError::SampleRateMismatch {
            expected: 24000,
            found: 16000,
            index: 1,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::UnknownError);

        let err: ConversionError = PcmError::Io("denied".to_string()).into();
        assert_eq!(err.kind(), ErrorKind::FilesystemError);
    }

    #[test]
    fn test_disk_space_message() {
        let err = ConversionError::DiskSpaceError {
            required: 1000,
            available: 10,
        };
        assert_eq!(err.exit_code(), 4);
        assert!(err.to_string().contains("1000 bytes required"));
    }
}
