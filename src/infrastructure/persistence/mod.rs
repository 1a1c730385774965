//! Persistence Layer - 数据持久化
//!
//! 文件系统缓存实现

mod file_cache;

pub use file_cache::FileAudioCache;
