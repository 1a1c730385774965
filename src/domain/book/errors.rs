//! Book Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BookError {
    #[error("No valid chapters found in EPUB file")]
    NoChapters,

    #[error("Invalid chapter at position {position}: {reason}")]
    InvalidChapter { position: usize, reason: &'static str },
}
