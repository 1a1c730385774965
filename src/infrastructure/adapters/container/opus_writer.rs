//! Ogg Opus Writer - 把 WAV 片段编码为带标签的 Ogg Opus 文件
//!
//! 实现 ContainerWriterPort trait
//!
//! 时间线上的片段按顺序逐个打开、直接送入编码器，
//! 不产生中间的整书 WAV 文件
//!
//! 标签写在 OpusTags 包中（RFC 7845 §5.2），封面以
//! METADATA_BLOCK_PICTURE 注释保存（base64 编码的 FLAC PICTURE 块）

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hound::{WavIntoSamples, WavReader};
use ogg::writing::PacketWriter;
use ogg::PacketWriteEndInfo;
use opus::{Application, Bitrate, Channels, Encoder};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::application::ports::{ContainerError, ContainerWriterPort, Picture, TagSet};
use crate::domain::audio::{AudioSegment, AudioTimeline, MONO};

const VENDOR: &str = "epubcast";
const OPUS_SAMPLE_RATES: [u32; 5] = [8000, 12000, 16000, 24000, 48000];
const GRANULE_RATE: u64 = 48000;
/// 帧长 20ms
const FRAME_MS: usize = 20;
/// Opus 最大包大小
const MAX_PACKET: usize = 4000;
const PICTURE_COLOR_DEPTH: u32 = 8;
const STREAM_SERIAL: u32 = 1;

/// 创建 Opus Head 包 (RFC 7845)
fn create_opus_head(channels: u8, sample_rate: u32, pre_skip: u16) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // Version
    head.push(channels);
    head.extend_from_slice(&pre_skip.to_le_bytes());
    head.extend_from_slice(&sample_rate.to_le_bytes()); // Input sample rate
    head.extend_from_slice(&0i16.to_le_bytes()); // Output gain
    head.push(0); // Channel mapping family
    head
}

/// FLAC PICTURE 块（大端）
fn picture_block(picture: &Picture) -> Vec<u8> {
    let mut block = Vec::with_capacity(32 + picture.mime.len() + picture.description.len() + picture.data.len());
    block.extend_from_slice(&(picture.picture_type as u32).to_be_bytes());
    block.extend_from_slice(&(picture.mime.len() as u32).to_be_bytes());
    block.extend_from_slice(picture.mime.as_bytes());
    block.extend_from_slice(&(picture.description.len() as u32).to_be_bytes());
    block.extend_from_slice(picture.description.as_bytes());
    block.extend_from_slice(&picture.width.to_be_bytes());
    block.extend_from_slice(&picture.height.to_be_bytes());
    block.extend_from_slice(&PICTURE_COLOR_DEPTH.to_be_bytes());
    block.extend_from_slice(&0u32.to_be_bytes()); // Indexed colors
    block.extend_from_slice(&(picture.data.len() as u32).to_be_bytes());
    block.extend_from_slice(&picture.data);
    block
}

/// 创建 Opus Tags 包
fn create_opus_tags(tags: &TagSet) -> Vec<u8> {
    let comments: Vec<String> = tags
        .comments
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .chain(
            tags.pictures
                .iter()
                .map(|p| format!("METADATA_BLOCK_PICTURE={}", STANDARD.encode(picture_block(p)))),
        )
        .collect();

    let mut packet = Vec::new();
    packet.extend_from_slice(b"OpusTags");
    packet.extend_from_slice(&(VENDOR.len() as u32).to_le_bytes());
    packet.extend_from_slice(VENDOR.as_bytes());
    packet.extend_from_slice(&(comments.len() as u32).to_le_bytes());
    for comment in &comments {
        packet.extend_from_slice(&(comment.len() as u32).to_le_bytes());
        packet.extend_from_slice(comment.as_bytes());
    }
    packet
}

fn encoding(context: &str) -> impl Fn(opus::Error) -> ContainerError + '_ {
    move |e| ContainerError::EncodingError(format!("{}: {}", context, e))
}

fn io(e: std::io::Error) -> ContainerError {
    ContainerError::Io(e.to_string())
}

fn wav(e: hound::Error) -> ContainerError {
    ContainerError::Io(e.to_string())
}

/// 依次读取各片段的 i16 样本
struct TimelineSamples<'a> {
    segments: std::slice::Iter<'a, AudioSegment>,
    current: Option<WavIntoSamples<BufReader<File>, i16>>,
}

impl<'a> TimelineSamples<'a> {
    fn new(timeline: &'a AudioTimeline) -> Self {
        Self {
            segments: timeline.segments().iter(),
            current: None,
        }
    }
}

impl Iterator for TimelineSamples<'_> {
    type Item = Result<i16, ContainerError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(samples) = self.current.as_mut() {
                match samples.next() {
                    Some(sample) => return Some(sample.map_err(wav)),
                    None => self.current = None,
                }
            }
            let segment = self.segments.next()?;
            match WavReader::open(segment.path()) {
                Ok(reader) => self.current = Some(reader.into_samples()),
                Err(e) => return Some(Err(wav(e))),
            }
        }
    }
}

/// 同步编码：逐帧读取时间线样本并写入 Ogg 页
fn encode_blocking(
    timeline: &AudioTimeline,
    tags: &TagSet,
    destination: &Path,
    bitrate: u32,
) -> Result<(), ContainerError> {
    let sample_rate = timeline.sample_rate();
    let total_frames = timeline.frames();

    let mut encoder = Encoder::new(sample_rate, Channels::Mono, Application::Voip)
        .map_err(encoding("Failed to create Opus encoder"))?;
    encoder
        .set_bitrate(Bitrate::Bits(bitrate as i32))
        .map_err(encoding("Failed to set bitrate"))?;

    // lookahead 以编码器采样率计，pre-skip 与 granule 以 48kHz 计
    let lookahead = encoder.get_lookahead().map_err(encoding("Failed to read lookahead"))? as u64;
    let granule_scale = GRANULE_RATE / sample_rate as u64;
    let pre_skip = lookahead * granule_scale;
    let final_granule = pre_skip + total_frames * granule_scale;

    let frame_size = sample_rate as usize * FRAME_MS / 1000;
    let frame_granule = frame_size as u64 * granule_scale;
    let flush_frames = ((lookahead as usize + frame_size - 1) / frame_size).max(1);

    let file = File::create(destination).map_err(io)?;
    let mut out = BufWriter::new(file);
    {
        let mut packets = PacketWriter::new(&mut out);
        packets
            .write_packet(
                create_opus_head(MONO as u8, sample_rate, pre_skip as u16),
                STREAM_SERIAL,
                PacketWriteEndInfo::EndPage,
                0,
            )
            .map_err(io)?;
        packets
            .write_packet(create_opus_tags(tags), STREAM_SERIAL, PacketWriteEndInfo::EndPage, 0)
            .map_err(io)?;

        let mut output = vec![0u8; MAX_PACKET];
        let mut frame: Vec<i16> = Vec::with_capacity(frame_size);
        let mut granule: u64 = 0;
        let mut samples = TimelineSamples::new(timeline);
        let mut read: u64 = 0;
        let mut input_done = false;
        let mut flushed = 0;

        loop {
            frame.clear();
            while !input_done && frame.len() < frame_size {
                match samples.next() {
                    Some(sample) => {
                        frame.push(sample?);
                        read += 1;
                    }
                    None => input_done = true,
                }
            }
            if input_done && read != total_frames {
                return Err(ContainerError::InvalidInput(format!(
                    "Timeline promised {} frames but segments held {}",
                    total_frames, read
                )));
            }
            if input_done && frame.is_empty() {
                flushed += 1;
            }
            // 不完整的帧（含冲刷帧）补零
            frame.resize(frame_size, 0);

            let len = encoder
                .encode(&frame, &mut output)
                .map_err(encoding("Opus encode failed"))?;
            granule = (granule + frame_granule).min(final_granule);

            let last = flushed >= flush_frames;
            let end_info = if last {
                PacketWriteEndInfo::EndStream
            } else {
                PacketWriteEndInfo::NormalPacket
            };
            let granule_pos = if last { final_granule } else { granule };

            packets
                .write_packet(output[..len].to_vec(), STREAM_SERIAL, end_info, granule_pos)
                .map_err(io)?;

            if last {
                break;
            }
        }
    }
    out.flush().map_err(io)?;
    Ok(())
}

/// Ogg Opus 写入器
#[derive(Debug, Clone, Copy)]
pub struct OggOpusWriter {
    bitrate: u32,
}

impl OggOpusWriter {
    /// bitrate 单位 bit/s
    pub fn new(bitrate: u32) -> Self {
        Self { bitrate }
    }
}

impl Default for OggOpusWriter {
    fn default() -> Self {
        Self::new(32_000)
    }
}

#[async_trait]
impl ContainerWriterPort for OggOpusWriter {
    async fn write(
        &self,
        audio: &AudioTimeline,
        tags: &TagSet,
        destination: &Path,
    ) -> Result<(), ContainerError> {
        if !OPUS_SAMPLE_RATES.contains(&audio.sample_rate()) {
            return Err(ContainerError::InvalidInput(format!(
                "Opus cannot encode {} Hz audio",
                audio.sample_rate()
            )));
        }
        if audio.channels() != MONO {
            return Err(ContainerError::InvalidInput(format!(
                "Expected mono audio, found {} channels",
                audio.channels()
            )));
        }

        let timeline = audio.clone();
        let tags = tags.clone();
        let destination: PathBuf = destination.to_path_buf();
        let bitrate = self.bitrate;

        tracing::debug!(
            segments = timeline.segments().len(),
            destination = %destination.display(),
            frames = timeline.frames(),
            bitrate,
            "Encoding Ogg Opus"
        );

        tokio::task::spawn_blocking(move || {
            let result = encode_blocking(&timeline, &tags, &destination, bitrate);
            if result.is_err() {
                match std::fs::remove_file(&destination) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => tracing::warn!(path = %destination.display(), error = %e, "Failed to remove partial audiobook"),
                }
            }
            result
        })
        .await
        .map_err(|e| ContainerError::EncodingError(format!("Encoder task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{PcmStorePort, PictureType};
    use crate::domain::audio::to_pcm16;
    use crate::infrastructure::adapters::audio::WavPcmStore;
    use tempfile::tempdir;

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    async fn tone(path: &Path, sample_rate: u32, frames: usize) -> AudioSegment {
        let store = WavPcmStore::new();
        let mut sink = store.create(path, sample_rate).unwrap();
        let samples: Vec<f32> = (0..frames).map(|i| ((i as f32) * 0.05).sin() * 0.3).collect();
        sink.write(&samples).unwrap();
        sink.finalize().unwrap();
        store.open(path).await.unwrap()
    }

    #[test]
    fn test_opus_tags_layout() {
        let mut tags = TagSet::default();
        tags.push("TITLE", "Book");
        let packet = create_opus_tags(&tags);

        assert!(packet.starts_with(b"OpusTags"));
        assert!(contains(&packet, b"TITLE=Book"));
        // vendor 长度 + vendor + 注释数 1
        let count_at = 8 + 4 + VENDOR.len();
        assert_eq!(&packet[count_at..count_at + 4], &1u32.to_le_bytes());
    }

    #[test]
    fn test_picture_comment_is_flac_block() {
        let mut tags = TagSet::default();
        tags.pictures.push(Picture {
            picture_type: PictureType::FrontCover,
            mime: "image/png".to_string(),
            description: "Cover image".to_string(),
            width: 2,
            height: 3,
            data: vec![1, 2, 3],
        });
        let packet = String::from_utf8_lossy(&create_opus_tags(&tags)).to_string();
        let value = packet
            .split("METADATA_BLOCK_PICTURE=")
            .nth(1)
            .unwrap();
        let block = STANDARD.decode(value.as_bytes()).unwrap();

        assert_eq!(&block[0..4], &3u32.to_be_bytes());
        assert_eq!(&block[4..8], &9u32.to_be_bytes());
        assert_eq!(&block[8..17], b"image/png");
        assert!(block.ends_with(&[0, 0, 0, 3, 1, 2, 3]));
    }

    fn timeline(segments: Vec<AudioSegment>) -> AudioTimeline {
        AudioTimeline::new(segments).unwrap()
    }

    /// (音频包数, 最后一页的 granule, OpusHead 中的 pre-skip)
    fn inspect(bytes: &[u8]) -> (usize, u64, u64) {
        let mut reader = ogg::reading::PacketReader::new(std::io::Cursor::new(bytes));
        let head = reader.read_packet().unwrap().unwrap();
        let pre_skip = u16::from_le_bytes([head.data[10], head.data[11]]) as u64;
        let _tags = reader.read_packet().unwrap().unwrap();

        let mut packets = 0;
        let mut granule = 0;
        while let Some(packet) = reader.read_packet().unwrap() {
            packets += 1;
            granule = packet.absgp_page();
        }
        (packets, granule, pre_skip)
    }

    #[tokio::test]
    async fn test_write_ogg_opus_file() {
        let dir = tempdir().unwrap();
        let audio = timeline(vec![tone(&dir.path().join("in.wav"), 24000, 24000).await]);
        let destination = dir.path().join("out.opus");

        let mut tags = TagSet::default();
        tags.push("TITLE", "Book");
        tags.push("CHAPTER000", "00:00");

        OggOpusWriter::default()
            .write(&audio, &tags, &destination)
            .await
            .unwrap();

        let bytes = std::fs::read(&destination).unwrap();
        assert!(bytes.starts_with(b"OggS"));
        assert!(contains(&bytes, b"OpusHead"));
        assert!(contains(&bytes, b"CHAPTER000=00:00"));
    }

    async fn constant(path: &Path, sample_rate: u32, value: f32) -> AudioSegment {
        let store = WavPcmStore::new();
        let mut sink = store.create(path, sample_rate).unwrap();
        sink.write(&vec![value; sample_rate as usize]).unwrap();
        sink.finalize().unwrap();
        store.open(path).await.unwrap()
    }

    #[tokio::test]
    async fn test_timeline_samples_follow_segment_order() {
        let dir = tempdir().unwrap();
        let audio = timeline(vec![
            constant(&dir.path().join("a.wav"), 8000, 0.5).await,
            constant(&dir.path().join("b.wav"), 8000, -0.25).await,
        ]);
        assert_eq!(audio.duration_secs(), 2.0);

        let samples: Vec<i16> = TimelineSamples::new(&audio).map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 16000);
        assert!(samples[..8000].iter().all(|&s| s == to_pcm16(0.5)));
        assert!(samples[8000..].iter().all(|&s| s == to_pcm16(-0.25)));
    }

    #[tokio::test]
    async fn test_streams_segments_in_order() {
        let dir = tempdir().unwrap();
        // 片段边界不与 20ms 帧对齐
        let audio = timeline(vec![
            tone(&dir.path().join("a.wav"), 24000, 10_000).await,
            tone(&dir.path().join("b.wav"), 24000, 1_234).await,
            tone(&dir.path().join("c.wav"), 24000, 12_766).await,
        ]);
        assert_eq!(audio.frames(), 24_000);
        let destination = dir.path().join("out.opus");

        OggOpusWriter::default()
            .write(&audio, &TagSet::default(), &destination)
            .await
            .unwrap();

        let (packets, granule, pre_skip) = inspect(&std::fs::read(&destination).unwrap());
        let lookahead = pre_skip / 2;
        let flush = ((lookahead + 479) / 480).max(1) as usize;

        // 24000 帧 = 50 个 480 帧的 Opus 帧，外加冲刷帧
        assert_eq!(packets, 50 + flush);
        assert_eq!(granule, pre_skip + 24_000 * 2);
    }

    #[tokio::test]
    async fn test_missing_segment_removes_partial_file() {
        let dir = tempdir().unwrap();
        let first = tone(&dir.path().join("a.wav"), 24000, 4800).await;
        let gone = tone(&dir.path().join("b.wav"), 24000, 4800).await;
        std::fs::remove_file(gone.path()).unwrap();
        let destination = dir.path().join("out.opus");

        let err = OggOpusWriter::default()
            .write(&timeline(vec![first, gone]), &TagSet::default(), &destination)
            .await
            .unwrap_err();

        assert!(matches!(err, ContainerError::Io(_)));
        assert!(!destination.exists());
    }

    #[tokio::test]
    async fn test_rejects_non_opus_rate() {
        let dir = tempdir().unwrap();
        let audio = timeline(vec![tone(&dir.path().join("in.wav"), 44100, 100).await]);
        let destination = dir.path().join("out.opus");

        let err = OggOpusWriter::default()
            .write(&audio, &TagSet::default(), &destination)
            .await
            .unwrap_err();
        assert!(matches!(err, ContainerError::InvalidInput(_)));
        assert!(!destination.exists());
    }
}
