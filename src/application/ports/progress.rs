//! Progress Port - 进度旁路
//!
//! 只用于展示，不影响转换结果

pub trait ProgressPort: Send + Sync {
    /// 开始处理，total 为将要处理的章节数
    fn start(&self, total: usize);

    /// 一个章节完成（index 为 0-based）
    fn chapter_done(&self, index: usize, title: &str);

    fn finish(&self);
}

/// 不输出任何内容
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressPort for NoopProgress {
    fn start(&self, _total: usize) {}

    fn chapter_done(&self, _index: usize, _title: &str) {}

    fn finish(&self) {}
}
