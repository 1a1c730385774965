//! EPUB Adapter - 书籍解析

mod epub_parser;
mod html_text;

pub use epub_parser::EpubBookParser;
pub use html_text::{extract_text, HtmlText};
