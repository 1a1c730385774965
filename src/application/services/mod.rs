//! 应用服务 - 转换流水线的核心组件
//!
//! - synthesis: 带缓存的合成适配器
//! - assembly: 章节循环与整书时间线
//! - tag_writer: 标签映射与原子落盘

mod assembly;
mod synthesis;
mod tag_writer;

pub use assembly::{cap_chapters, AssembledAudio, AssemblyEngine, AssemblyOptions};
pub use synthesis::{SegmentSynthesizer, SynthesisAdapter, SynthesisSettings, SynthesisStats};
pub use tag_writer::{build_tags, working_path, FinalizedAudiobook, TagBoilerplate, TagWriter};
