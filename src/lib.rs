//! epubcast - EPUB 转有声书
//!
//! 架构设计: Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - book: 书籍元数据、章节、时间格式、输出命名
//! - audio: PCM 片段句柄与拼接校验
//! - 章节清洗与文本切分
//!
//! 应用层 (application/):
//! - Ports: BookParser, SpeechEngine, AudioCache, PcmStore, ContainerWriter, DiskSpace, Progress
//! - Services: 合成适配器、组装引擎、标签写入
//! - Commands: ConvertBook 命令及处理器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: EPUB 解析、HTTP/Fake TTS、WAV 存储、Ogg Opus 写入、磁盘探测
//! - Persistence: 文件系统片段缓存
//! - CLI: 参数与进度条

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
