//! 应用层 - 命令
//!
//! 命令侧：一次 EPUB → 有声书转换

mod convert_commands;

pub mod handlers;

pub use convert_commands::*;
