//! CLI - 命令行入口的参数与进度展示

mod args;
mod progress_bar;

pub use args::{Args, EngineArg};
pub use progress_bar::IndicatifProgress;
