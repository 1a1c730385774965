//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（BookParser、SpeechEngine、AudioCache、PcmStore、ContainerWriter 等）
//! - services: 合成适配器、组装引擎、标签写入
//! - commands: 转换命令及处理器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod ports;
pub mod services;

// Re-exports
pub use commands::{
    handlers::{ConversionSummary, ConvertBookHandler},
    ConvertBook,
};

pub use error::{BoxError, ConversionError, ErrorKind};

pub use services::{
    build_tags, AssembledAudio, AssemblyEngine, AssemblyOptions, FinalizedAudiobook,
    SegmentSynthesizer, SynthesisAdapter, SynthesisSettings, SynthesisStats, TagBoilerplate,
    TagWriter,
};
