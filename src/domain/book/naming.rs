//! Book Context - 输出文件命名

use std::path::{Path, PathBuf};

/// 输出容器的固定扩展名
pub const OUTPUT_EXTENSION: &str = "opus";

/// 文件名最大字节数
const MAX_FILENAME_LEN: usize = 255;

/// 替换文件名中的非法字符，并限制长度（保留扩展名）
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    if cleaned.len() <= MAX_FILENAME_LEN {
        return cleaned;
    }

    let (stem, ext) = match cleaned.rfind('.') {
        Some(idx) if idx > 0 => (&cleaned[..idx], &cleaned[idx..]),
        _ => (cleaned.as_str(), ""),
    };

    let mut budget = MAX_FILENAME_LEN.saturating_sub(ext.len());
    // 截断在 char 边界上
    while budget > 0 && !stem.is_char_boundary(budget) {
        budget -= 1;
    }
    format!("{}{}", &stem[..budget], ext)
}

/// 决定最终输出路径
///
/// - 显式给出路径时强制使用 `.opus` 扩展名
/// - 否则在当前目录下使用清洗后的书名
pub fn resolve_output_path(explicit: Option<&Path>, title: &str) -> PathBuf {
    match explicit {
        Some(path) => {
            if path.extension().and_then(|e| e.to_str()) == Some(OUTPUT_EXTENSION) {
                path.to_path_buf()
            } else {
                path.with_extension(OUTPUT_EXTENSION)
            }
        }
        None => PathBuf::from(sanitize_filename(&format!(
            "{}.{}",
            title.trim(),
            OUTPUT_EXTENSION
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_filename("a<b>c:d\"e/f\\g|h?i*j.opus"), "a_b_c_d_e_f_g_h_i_j.opus");
    }

    #[test]
    fn test_sanitize_truncates_keeping_extension() {
        let long = format!("{}.opus", "x".repeat(400));
        let cleaned = sanitize_filename(&long);
        assert_eq!(cleaned.len(), 255);
        assert!(cleaned.ends_with(".opus"));
    }

    #[test]
    fn test_output_path_from_title() {
        let path = resolve_output_path(None, "War: and Peace");
        assert_eq!(path, PathBuf::from("War_ and Peace.opus"));
    }

    #[test]
    fn test_output_path_forces_extension() {
        let path = resolve_output_path(Some(Path::new("out/book.ogg")), "ignored");
        assert_eq!(path, PathBuf::from("out/book.opus"));

        let path = resolve_output_path(Some(Path::new("out/book.opus")), "ignored");
        assert_eq!(path, PathBuf::from("out/book.opus"));
    }
}
