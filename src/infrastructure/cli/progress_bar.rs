//! 终端进度条（indicatif）

use indicatif::{ProgressBar, ProgressStyle};

use crate::application::ports::ProgressPort;

const TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

pub struct IndicatifProgress {
    bar: ProgressBar,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        let style = ProgressStyle::default_bar()
            .template(TEMPLATE)
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        Self { bar }
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPort for IndicatifProgress {
    fn start(&self, total: usize) {
        self.bar.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_message("synthesizing");
    }

    fn chapter_done(&self, _index: usize, title: &str) {
        self.bar.set_message(title.to_string());
        self.bar.inc(1);
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
