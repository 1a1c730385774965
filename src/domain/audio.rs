//! Audio - PCM 片段句柄
//!
//! AudioSegment 只是磁盘上一段单声道 PCM 的句柄，不持有样本数据。
//! AudioTimeline 是按播放顺序排列的片段列表，整书音频从不落成单个文件

use std::path::{Path, PathBuf};
use thiserror::Error;

/// 仅支持单声道
pub const MONO: u16 = 1;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SegmentError {
    #[error("No audio segments to concatenate")]
    Empty,

    #[error("All audio segments must share one sample rate: expected {expected} Hz, segment {index} has {found} Hz")]
    SampleRateMismatch {
        expected: u32,
        found: u32,
        index: usize,
    },
}

/// 音频片段
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSegment {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    frames: u64,
}

impl AudioSegment {
    pub fn new(path: impl Into<PathBuf>, sample_rate: u32, channels: u16, frames: u64) -> Self {
        Self {
            path: path.into(),
            sample_rate,
            channels,
            frames,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// 时长（秒）= 帧数 / (采样率 × 声道数)
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.frames as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// 校验片段可拼接，返回公共采样率
pub fn check_concatenable(segments: &[AudioSegment]) -> Result<u32, SegmentError> {
    let first = segments.first().ok_or(SegmentError::Empty)?;
    let expected = first.sample_rate();

    for (index, segment) in segments.iter().enumerate().skip(1) {
        if segment.sample_rate() != expected {
            return Err(SegmentError::SampleRateMismatch {
                expected,
                found: segment.sample_rate(),
                index,
            });
        }
    }

    Ok(expected)
}

/// 整书时间线
///
/// 片段按播放顺序排列且采样率一致，总帧数以 u64 累计
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioTimeline {
    segments: Vec<AudioSegment>,
    sample_rate: u32,
    frames: u64,
}

impl AudioTimeline {
    pub fn new(segments: Vec<AudioSegment>) -> Result<Self, SegmentError> {
        let sample_rate = check_concatenable(&segments)?;
        let frames = segments.iter().map(AudioSegment::frames).sum();
        Ok(Self {
            segments,
            sample_rate,
            frames,
        })
    }

    pub fn segments(&self) -> &[AudioSegment] {
        &self.segments
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// 时间线上最大的声道数
    pub fn channels(&self) -> u16 {
        self.segments.iter().map(AudioSegment::channels).max().unwrap_or(MONO)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames as f64 / self.sample_rate as f64
    }
}

/// f32 [-1, 1] → i16 PCM
#[inline]
pub fn to_pcm16(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * 32767.0) as i16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration() {
        let segment = AudioSegment::new("a.wav", 24000, MONO, 36000);
        assert_eq!(segment.duration_secs(), 1.5);

        let empty = AudioSegment::new("b.wav", 24000, MONO, 0);
        assert_eq!(empty.duration_secs(), 0.0);
    }

    #[test]
    fn test_check_concatenable() {
        let a = AudioSegment::new("a.wav", 24000, MONO, 100);
        let b = AudioSegment::new("b.wav", 24000, MONO, 200);
        let c = AudioSegment::new("c.wav", 16000, MONO, 200);

        assert_eq!(check_concatenable(&[a.clone(), b.clone()]), Ok(24000));
        assert_eq!(
            check_concatenable(&[a, b, c]),
            Err(SegmentError::SampleRateMismatch {
                expected: 24000,
                found: 16000,
                index: 2
            })
        );
        assert_eq!(check_concatenable(&[]), Err(SegmentError::Empty));
    }

    #[test]
    fn test_timeline_keeps_order_and_sums_frames() {
        let segments = vec![
            AudioSegment::new("title.wav", 24000, MONO, 12000),
            AudioSegment::new("body.wav", 24000, MONO, 36000),
        ];
        let timeline = AudioTimeline::new(segments).unwrap();

        assert_eq!(timeline.sample_rate(), 24000);
        assert_eq!(timeline.frames(), 48000);
        assert_eq!(timeline.duration_secs(), 2.0);
        let paths: Vec<&Path> = timeline.segments().iter().map(AudioSegment::path).collect();
        assert_eq!(paths, vec![Path::new("title.wav"), Path::new("body.wav")]);
    }

    #[test]
    fn test_timeline_frames_exceed_wav_limit() {
        // 30 小时 @ 24kHz，超过单个 16 位 WAV 文件所能表示的长度
        let hour = 24000 * 3600;
        let segments: Vec<AudioSegment> = (0..30)
            .map(|i| AudioSegment::new(format!("{}.wav", i), 24000, MONO, hour))
            .collect();
        let timeline = AudioTimeline::new(segments).unwrap();

        assert!(timeline.frames() * 2 > u32::MAX as u64);
        assert_eq!(timeline.duration_secs(), 30.0 * 3600.0);
    }

    #[test]
    fn test_timeline_rejects_mixed_rates() {
        let err = AudioTimeline::new(vec![
            AudioSegment::new("a.wav", 24000, MONO, 1),
            AudioSegment::new("b.wav", 16000, MONO, 1),
        ])
        .unwrap_err();
        assert!(matches!(err, SegmentError::SampleRateMismatch { index: 1, .. }));
        assert_eq!(AudioTimeline::new(Vec::new()), Err(SegmentError::Empty));
    }

    #[test]
    fn test_to_pcm16_clamps() {
        assert_eq!(to_pcm16(0.0), 0);
        assert_eq!(to_pcm16(1.0), 32767);
        assert_eq!(to_pcm16(2.5), 32767);
        assert_eq!(to_pcm16(-1.0), -32767);
    }
}
