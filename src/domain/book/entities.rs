//! Book Context - Entities

use serde::{Deserialize, Serialize};

/// 解析器输出的原始章节（未清洗）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChapter {
    /// 解析器提取到的标题，可能缺失
    pub title: Option<String>,
    /// 纯文本内容（已去除 HTML）
    pub content: String,
    /// 源文档 id（spine idref）
    pub source_id: String,
}

impl RawChapter {
    pub fn new(title: Option<&str>, content: impl Into<String>, source_id: impl Into<String>) -> Self {
        Self {
            title: title.map(str::to_string),
            content: content.into(),
            source_id: source_id.into(),
        }
    }
}

/// 章节 - 最小的合成/标记单位
///
/// 不变量:
/// - order 严格递增，与最终输出顺序一致
/// - content 不可为空
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    title: String,
    content: String,
    order: usize,
    source_id: String,
}

impl Chapter {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        order: usize,
        source_id: impl Into<String>,
    ) -> Result<Self, &'static str> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err("chapter content cannot be empty");
        }
        Ok(Self {
            title: title.into(),
            content,
            order,
            source_id: source_id.into(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub(crate) fn set_title(&mut self, title: String) {
        self.title = title;
    }
}

/// 章节标记
///
/// 标记区间包含该章节的标题播报（start 取在播报之前）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChapterMarker {
    pub title: String,
    /// 起始时间（秒）
    pub start_time: f64,
    /// 结束时间（秒）
    pub end_time: f64,
}

impl ChapterMarker {
    pub fn new(title: impl Into<String>, start_time: f64, end_time: f64) -> Self {
        Self {
            title: title.into(),
            start_time,
            end_time,
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    pub fn start_time_str(&self) -> String {
        format_time(self.start_time)
    }

    pub fn end_time_str(&self) -> String {
        format_time(self.end_time)
    }
}

/// 格式化时间：不足一小时为 `MM:SS`，否则 `HH:MM:SS`
pub fn format_time(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{:02}:{:02}", minutes, secs)
    }
}

/// 格式化时长（用于运行摘要）
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 {
        seconds.round() as u64
    } else {
        0
    };
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    match (hours, minutes) {
        (0, 0) => format!("{}s", secs),
        (0, _) => format!("{}m {}s", minutes, secs),
        _ => format!("{}h {}m {}s", hours, minutes, secs),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_rejects_empty_content() {
        assert!(Chapter::new("Chapter 1", "   ", 0, "c1").is_err());
        assert!(Chapter::new("Chapter 1", "text", 0, "c1").is_ok());
    }

    #[test]
    fn test_marker_duration() {
        let marker = ChapterMarker::new("Chapter 1", 10.0, 25.5);
        assert_eq!(marker.duration(), 15.5);
        assert_eq!(marker.start_time_str(), "00:10");
        assert_eq!(marker.end_time_str(), "00:25");
    }

    #[test]
    fn test_format_time_hour_boundary() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(59.9), "00:59");
        assert_eq!(format_time(3599.0), "59:59");
        assert_eq!(format_time(3600.0), "01:00:00");
        assert_eq!(format_time(3723.4), "01:02:03");
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.0), "42s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m 5s");
    }
}
