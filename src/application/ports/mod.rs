//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod book_parser;
mod container_writer;
mod disk_space;
mod pcm_store;
mod progress;
mod speech_engine;

pub use audio_cache::{
    generate_cache_key, in_progress_path, AudioCachePort, CacheError, CleanupReport,
    CACHE_ENTRY_EXTENSION, IN_PROGRESS_SUFFIX,
};
pub use book_parser::{BookParserPort, ParseError, ParseWarning, ParseWarningKind, ParsedBook};
pub use container_writer::{ContainerError, ContainerWriterPort, Picture, PictureType, TagSet};
pub use disk_space::{DiskProbeError, DiskSpacePort};
pub use pcm_store::{PcmError, PcmSink, PcmStorePort};
pub use progress::{NoopProgress, ProgressPort};
pub use speech_engine::{
    AudioChunk, AudioChunkStream, SpeechEnginePort, SynthesisRequest, TtsError,
};
