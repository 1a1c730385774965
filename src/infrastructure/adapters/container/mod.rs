//! Container Adapter - 带标签的有声书容器

mod opus_writer;

pub use opus_writer::OggOpusWriter;
