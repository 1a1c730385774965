//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod audio;
pub mod container;
pub mod epub;
pub mod system;
pub mod tts;

pub use audio::{WavPcmSink, WavPcmStore};
pub use container::OggOpusWriter;
pub use epub::EpubBookParser;
pub use system::SysinfoDiskSpace;
pub use tts::*;
