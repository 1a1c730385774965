//! Book Context - Value Objects

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 书籍指纹
///
/// EPUB 源文件字节的 SHA-256（小写 hex），用作缓存命名空间。
/// 同一本书无论章节多少，指纹在其生命周期内保持不变。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookFingerprint(String);

impl BookFingerprint {
    /// 根据源文件字节计算指纹
    pub fn of_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        Self(format!("{:x}", digest))
    }

    /// 使用已知的 hex 字符串（测试或外部传入）
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BookFingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 封面图片
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverImage {
    pub data: Vec<u8>,
    pub mime: String,
}

impl CoverImage {
    pub fn new(data: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            data,
            mime: mime.into(),
        }
    }

    /// 探测图片尺寸（宽, 高）
    ///
    /// 仅解析 PNG / JPEG / GIF 文件头，其它格式返回 None
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let data = &self.data;

        // PNG: 8 字节签名 + IHDR (宽高为大端 u32)
        if data.len() >= 24 && data.starts_with(b"\x89PNG\r\n\x1a\n") && &data[12..16] == b"IHDR" {
            let width = u32::from_be_bytes([data[16], data[17], data[18], data[19]]);
            let height = u32::from_be_bytes([data[20], data[21], data[22], data[23]]);
            return Some((width, height));
        }

        // GIF: 逻辑屏幕宽高为小端 u16
        if data.len() >= 10 && (data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a")) {
            let width = u16::from_le_bytes([data[6], data[7]]) as u32;
            let height = u16::from_le_bytes([data[8], data[9]]) as u32;
            return Some((width, height));
        }

        // JPEG: 扫描到 SOFn 段
        if data.len() >= 4 && data[0] == 0xFF && data[1] == 0xD8 {
            let mut pos = 2;
            while pos + 9 < data.len() {
                if data[pos] != 0xFF {
                    return None;
                }
                let marker = data[pos + 1];
                // 填充字节
                if marker == 0xFF {
                    pos += 1;
                    continue;
                }
                let segment_len = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                let is_sof = matches!(marker, 0xC0..=0xCF) && !matches!(marker, 0xC4 | 0xC8 | 0xCC);
                if is_sof {
                    let height = u16::from_be_bytes([data[pos + 5], data[pos + 6]]) as u32;
                    let width = u16::from_be_bytes([data[pos + 7], data[pos + 8]]) as u32;
                    return Some((width, height));
                }
                pos += 2 + segment_len;
            }
        }

        None
    }
}

/// 书籍元数据
///
/// 抽取后不可变，由 Tag Writer 只读消费
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookMetadata {
    /// 书名（必填）
    pub title: String,
    pub creator: Option<String>,
    pub date: Option<String>,
    pub identifier: Option<String>,
    pub language: Option<String>,
    pub publisher: Option<String>,
    pub description: Option<String>,
    pub cover: Option<CoverImage>,
}

impl BookMetadata {
    /// 仅包含书名的元数据
    pub fn with_title(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            creator: None,
            date: None,
            identifier: None,
            language: None,
            publisher: None,
            description: None,
            cover: None,
        }
    }
}
