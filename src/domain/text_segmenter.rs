//! 文本分割器
//!
//! 将章节文本切分为适合单次 TTS 请求的合成单元，支持最小/最大字符数限制

/// 默认最小字符数限制
/// 当片段字符数未达到此限制时，弱分隔符不会触发分割
pub const DEFAULT_MIN_CHARS: usize = 20;

/// 默认最大字符数限制（单次 TTS 请求）
pub const DEFAULT_MAX_CHARS: usize = 400;

/// 文本分割配置
#[derive(Debug, Clone)]
pub struct SegmentConfig {
    /// 最小字符数限制（用于合并短句）
    pub min_chars: usize,
    /// 最大字符数限制，超出时在最近的空白处强制切分
    pub max_chars: usize,
}

impl Default for SegmentConfig {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHARS,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }
}

/// 检查是否为强分隔符（句末标点，总是分割）
#[inline]
fn is_strong_delimiter(ch: char) -> bool {
    matches!(ch, '。' | '？' | '！' | '.' | '?' | '!')
}

/// 检查是否为弱分隔符（逗号等，达到最小字符数时才分割）
#[inline]
fn is_weak_delimiter(ch: char) -> bool {
    matches!(ch, '，' | '；' | '：' | ',' | ';' | ':')
}

/// CJK 文字与全角标点之间合并时不插入空格
#[inline]
fn is_cjk(ch: char) -> bool {
    matches!(ch, '\u{3000}'..='\u{9FFF}' | '\u{FF00}'..='\u{FFEF}')
}

/// 检查片段是否只包含引号或空白（应该被过滤或合并）
#[inline]
fn is_trivial_segment(s: &str) -> bool {
    s.chars().all(|c| {
        matches!(
            c,
            '"' | '\u{201C}' | '\u{201D}' | '\'' | '\u{2018}' | '\u{2019}' | ' ' | '\t'
        )
    })
}

/// 拼接两个片段，非 CJK 文本之间补一个空格
fn join_into(buffer: &mut String, piece: &str) {
    let needs_space = match (buffer.chars().last(), piece.chars().next()) {
        (Some(a), Some(b)) => !(is_cjk(a) || is_cjk(b)) && !a.is_whitespace(),
        _ => false,
    };
    if needs_space {
        buffer.push(' ');
    }
    buffer.push_str(piece);
}

/// 按标点符号分割单行文本（带最小字符数限制，行内合并短句）
fn split_line(text: &str, config: &SegmentConfig) -> Vec<String> {
    let raw_segments = split_by_delimiters(text, config);
    merge_until_min_chars(raw_segments, config.min_chars)
}

/// 按分隔符分割（不做合并）
fn split_by_delimiters(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut char_count = 0;

    for ch in text.chars() {
        current.push(ch);
        char_count += 1;

        let should_split = if is_strong_delimiter(ch) {
            true
        } else {
            is_weak_delimiter(ch) && char_count >= config.min_chars
        };

        if should_split {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                segments.push(trimmed.to_string());
            }
            current.clear();
            char_count = 0;
        } else if config.max_chars > 0 && char_count >= config.max_chars {
            // 超长：在最后一个空白处切分，余下部分留在 current
            let cut = current
                .char_indices()
                .filter(|(_, c)| c.is_whitespace())
                .map(|(i, _)| i)
                .last()
                .filter(|&i| i > 0)
                .unwrap_or(current.len());

            let head = current[..cut].trim();
            if !head.is_empty() {
                segments.push(head.to_string());
            }
            current = current[cut..].trim_start().to_string();
            char_count = current.chars().count();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }

    segments
}

/// 合并短片段直到满足 min_chars
fn merge_until_min_chars(segments: Vec<String>, min_chars: usize) -> Vec<String> {
    if segments.is_empty() {
        return segments;
    }

    let mut result: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for seg in segments {
        join_into(&mut buffer, &seg);

        if buffer.chars().count() >= min_chars {
            result.push(std::mem::take(&mut buffer));
        }
    }

    if !buffer.is_empty() {
        if let Some(last) = result.last_mut() {
            join_into(last, &buffer);
        } else {
            result.push(buffer);
        }
    }

    result
}

/// 对文本进行分段
///
/// 分段策略：
/// 1. 按行分割（支持 \n 和 \r\n），跨行不合并
/// 2. 每行按标点符号分割（带最小/最大字符数限制，行内合并短句）
/// 3. 只有引号的片段合并到前一个片段
pub fn segment_text(text: &str, config: &SegmentConfig) -> Vec<String> {
    let mut segments: Vec<String> = Vec::new();

    let lines = text.lines().map(str::trim).filter(|s| !s.is_empty());

    for line in lines {
        for sentence in split_line(line, config) {
            let trimmed = sentence.trim();
            if trimmed.is_empty() {
                continue;
            }

            if is_trivial_segment(trimmed) {
                if let Some(last) = segments.last_mut() {
                    last.push_str(trimmed);
                }
            } else {
                segments.push(trimmed.to_string());
            }
        }
    }

    segments
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_chars: usize, max_chars: usize) -> SegmentConfig {
        SegmentConfig { min_chars, max_chars }
    }

    #[test]
    fn test_strong_delimiter_always_splits() {
        let text = "短。短？短！";
        let segments = split_line(text, &config(100, 400));

        // 短句会被合并
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0], "短。短？短！");
    }

    #[test]
    fn test_weak_delimiter_respects_min_chars() {
        let text = "所以，如今想要讨还回去吧，苦涩的一笑。";
        let segments = split_line(text, &config(20, 400));

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0], "所以，如今想要讨还回去吧，苦涩的一笑。");
    }

    #[test]
    fn test_english_sentences_split_and_merge_with_spaces() {
        let text = "It was late. The rain kept falling on the old roof. Yes.";
        let segments = segment_text(text, &config(20, 400));

        // 末尾不足 min_chars 的 "Yes." 并入前一个单元
        assert_eq!(
            segments,
            vec!["It was late. The rain kept falling on the old roof. Yes."]
        );
    }

    #[test]
    fn test_long_sentences_stay_separate() {
        let text = "The first sentence is long enough. The second sentence is long enough too.";
        let segments = segment_text(text, &config(20, 400));

        assert_eq!(
            segments,
            vec![
                "The first sentence is long enough.",
                "The second sentence is long enough too."
            ]
        );
    }

    #[test]
    fn test_max_chars_cuts_at_whitespace() {
        let text = "one two three four five six seven eight nine ten";
        let segments = segment_text(text, &config(1, 15));

        assert!(segments.len() > 1);
        for seg in &segments {
            assert!(seg.chars().count() <= 15, "segment too long: {seg}");
            assert!(!seg.starts_with(' ') && !seg.ends_with(' '));
        }
        assert_eq!(segments.join(" "), text);
    }

    #[test]
    fn test_segment_text_with_lines_no_cross_merge() {
        let text = "第一行。\n第二行。";
        let segments = segment_text(text, &config(50, 400));

        assert_eq!(segments, vec!["第一行。", "第二行。"]);
    }

    #[test]
    fn test_quote_only_segment_merged() {
        let text = "这是一段较长的内容测试。\n\"\n这是另一段较长的测试内容。";
        let segments = segment_text(text, &config(10, 400));

        assert_eq!(segments.len(), 2);
        assert!(segments[0].ends_with('"'));
    }

    #[test]
    fn test_trivial_segment_detection() {
        assert!(is_trivial_segment("\""));
        assert!(is_trivial_segment("\" "));
        assert!(!is_trivial_segment("内容"));
    }

    #[test]
    fn test_empty_text() {
        assert!(segment_text("", &SegmentConfig::default()).is_empty());
        assert!(segment_text(" \n \n", &SegmentConfig::default()).is_empty());
    }
}
