//! 章节抽取器
//!
//! 将解析器输出的原始章节列表清洗为有序章节列表：
//! 1. 丢弃内容为空的章节
//! 2. 标题缺失时回退为 "Chapter N"（N 为保留章节中的 1-based 位置）
//! 3. 罗马数字章节号整体改写为阿拉伯数字（全有或全无）

use regex::{Captures, Regex};
use std::sync::LazyLock;

use super::book::{BookError, Chapter, RawChapter};

/// "chapter <罗马数字>" 前缀，数字之后必须是空白
static ROMAN_CHAPTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(chapter\s+)([ivxlcdm]+)(\s)").expect("valid roman chapter regex")
});

/// 抽取章节
pub fn extract_chapters(raw: Vec<RawChapter>) -> Result<Vec<Chapter>, BookError> {
    let mut chapters = Vec::with_capacity(raw.len());

    for item in raw {
        let content = item.content.trim();
        if content.is_empty() {
            tracing::debug!(source_id = %item.source_id, "Skipping empty chapter");
            continue;
        }

        let order = chapters.len();
        let title = item
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Chapter {}", order + 1));

        let chapter = Chapter::new(title, content, order, item.source_id).map_err(|reason| {
            BookError::InvalidChapter {
                position: order,
                reason,
            }
        })?;
        chapters.push(chapter);
    }

    if chapters.is_empty() {
        return Err(BookError::NoChapters);
    }

    if uses_roman_numerals(&chapters) {
        tracing::debug!("Using roman numerals for chapter markers");
        for chapter in chapters.iter_mut() {
            if let Some(title) = roman_to_arabic_title(chapter.title()) {
                chapter.set_title(title);
            }
        }
    }

    Ok(chapters)
}

/// 除第一章外的所有标题都符合 "chapter <罗马数字>" 时才启用改写
fn uses_roman_numerals(chapters: &[Chapter]) -> bool {
    chapters
        .iter()
        .skip(1)
        .all(|chapter| roman_to_arabic_title(chapter.title()).is_some())
}

/// 改写单个标题，不符合模式或数字非法时返回 None
fn roman_to_arabic_title(title: &str) -> Option<String> {
    let captures = ROMAN_CHAPTER.captures(title)?;
    let number = parse_roman(&captures[2])?;

    let rewritten = ROMAN_CHAPTER.replace(title, |caps: &Captures| {
        format!("Chapter {}{}", number, &caps[3])
    });
    Some(rewritten.into_owned())
}

/// 解析规范形式的罗马数字（1..=3999）
///
/// 非规范写法（如 "IIII"、"VX"、"CIVIL"）返回 None
pub fn parse_roman(numeral: &str) -> Option<u32> {
    let upper = numeral.to_ascii_uppercase();
    let mut total: u32 = 0;
    let mut prev: u32 = 0;

    for ch in upper.chars().rev() {
        let value = match ch {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        };
        if value < prev {
            total = total.checked_sub(value)?;
        } else {
            total += value;
            prev = value;
        }
    }

    if total == 0 || total > 3999 {
        return None;
    }

    // 回写校验，保证只接受规范形式
    if to_roman(total) == upper {
        Some(total)
    } else {
        None
    }
}

fn to_roman(mut value: u32) -> String {
    const TABLE: [(u32, &str); 13] = [
        (1000, "M"),
        (900, "CM"),
        (500, "D"),
        (400, "CD"),
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];

    let mut out = String::new();
    for (amount, symbol) in TABLE {
        while value >= amount {
            out.push_str(symbol);
            value -= amount;
        }
    }
    out
}
