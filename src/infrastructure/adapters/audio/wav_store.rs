//! WAV PCM Store - 基于 hound 的 16 位单声道 WAV 读写
//!
//! 实现 PcmStorePort trait

use async_trait::async_trait;
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use crate::application::ports::{PcmError, PcmSink, PcmStorePort};
use crate::domain::audio::{to_pcm16, AudioSegment, MONO};

const BITS_PER_SAMPLE: u16 = 16;

fn mono_spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: MONO,
        sample_rate,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: SampleFormat::Int,
    }
}

fn map_hound(err: hound::Error) -> PcmError {
    match err {
        hound::Error::IoError(e) => PcmError::Io(e.to_string()),
        other => PcmError::Format(other.to_string()),
    }
}

/// 读取文件头，得到片段句柄
fn open_segment(path: &Path) -> Result<AudioSegment, PcmError> {
    let reader = WavReader::open(path).map_err(map_hound)?;
    let spec = reader.spec();

    if spec.channels != MONO || spec.bits_per_sample != BITS_PER_SAMPLE || spec.sample_format != SampleFormat::Int {
        return Err(PcmError::Format(format!(
            "{}: expected 16-bit mono PCM, found {} channel(s) {}-bit",
            path.display(),
            spec.channels,
            spec.bits_per_sample
        )));
    }

    Ok(AudioSegment::new(
        path,
        spec.sample_rate,
        spec.channels,
        reader.duration() as u64,
    ))
}

/// WAV 写入器
pub struct WavPcmSink {
    writer: WavWriter<BufWriter<File>>,
}

impl PcmSink for WavPcmSink {
    fn write(&mut self, samples: &[f32]) -> Result<(), PcmError> {
        for &sample in samples {
            self.writer.write_sample(to_pcm16(sample)).map_err(map_hound)?;
        }
        Ok(())
    }

    fn finalize(self: Box<Self>) -> Result<u64, PcmError> {
        let frames = self.writer.len() as u64;
        self.writer.finalize().map_err(map_hound)?;
        Ok(frames)
    }
}

/// WAV PCM 存储
#[derive(Debug, Clone, Copy, Default)]
pub struct WavPcmStore;

impl WavPcmStore {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PcmStorePort for WavPcmStore {
    fn create(&self, path: &Path, sample_rate: u32) -> Result<Box<dyn PcmSink>, PcmError> {
        let writer = WavWriter::create(path, mono_spec(sample_rate)).map_err(map_hound)?;
        Ok(Box::new(WavPcmSink { writer }))
    }

    async fn open(&self, path: &Path) -> Result<AudioSegment, PcmError> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || open_segment(&path))
            .await
            .map_err(|e| PcmError::Io(format!("Blocking task failed: {}", e)))?
    }
}
