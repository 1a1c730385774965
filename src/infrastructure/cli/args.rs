//! 命令行参数

use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::application::ConvertBook;
use crate::config::{AppConfig, EngineKind};

/// --engine 的取值
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EngineArg {
    Http,
    Fake,
}

impl From<EngineArg> for EngineKind {
    fn from(arg: EngineArg) -> Self {
        match arg {
            EngineArg::Http => EngineKind::Http,
            EngineArg::Fake => EngineKind::Fake,
        }
    }
}

fn parse_speed(value: &str) -> Result<f32, String> {
    let speed: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if speed > 0.0 && speed.is_finite() {
        Ok(speed)
    } else {
        Err("speech rate must be greater than 0".to_string())
    }
}

/// Convert an EPUB book into a chaptered Ogg Opus audiobook
#[derive(Debug, Parser)]
#[command(name = "epubcast", version, about)]
pub struct Args {
    /// EPUB file to convert
    #[arg(value_name = "INPUT_EPUB")]
    pub input: Option<PathBuf>,

    /// Output file (the .opus extension is enforced); defaults to the sanitized book title
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Voice id
    #[arg(long, value_name = "VOICE")]
    pub voice: Option<String>,

    /// Speed multiplier
    #[arg(short = 's', long = "speech-rate", value_name = "RATE", value_parser = parse_speed)]
    pub speech_rate: Option<f32>,

    /// Only print errors and hide the progress bar
    #[arg(short, long)]
    pub quiet: bool,

    /// -v for debug, -vv for trace
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Reuse and keep synthesized segments
    #[arg(long, overrides_with = "no_cache")]
    pub cache: bool,

    /// Always synthesize and remove the book's cache afterwards
    #[arg(long = "no-cache", overrides_with = "cache")]
    pub no_cache: bool,

    /// Process only the first N chapters
    #[arg(short, long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub max_chapters: Option<u64>,

    /// Chapters synthesized concurrently
    #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: Option<u64>,

    /// Speech engine adapter
    #[arg(long, value_enum)]
    pub engine: Option<EngineArg>,

    /// Base URL of the HTTP speech engine
    #[arg(long, value_name = "URL")]
    pub tts_url: Option<String>,

    /// Explicit configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print the engine's voices and exit
    #[arg(long)]
    pub list_voices: bool,
}

impl Args {
    /// 命令行覆盖配置文件与环境变量
    pub fn apply_to(&self, config: &mut AppConfig) {
        if let Some(voice) = &self.voice {
            config.tts.voice = voice.clone();
        }
        if let Some(speed) = self.speech_rate {
            config.tts.speed = speed;
        }
        if let Some(engine) = self.engine {
            config.tts.engine = engine.into();
        }
        if let Some(url) = &self.tts_url {
            config.tts.url = url.clone();
        }
        if self.no_cache {
            config.cache.enabled = false;
        } else if self.cache {
            config.cache.enabled = true;
        }
        if let Some(max) = self.max_chapters {
            config.conversion.max_chapters = Some(max as usize);
        }
        if let Some(concurrency) = self.concurrency {
            config.conversion.concurrency = concurrency as usize;
        }
    }

    /// 日志级别（命令行优先）
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match (self.quiet, self.verbose) {
            (true, _) => "error",
            (false, 0) => configured,
            (false, 1) => "debug",
            _ => "trace",
        }
    }

    pub fn command(&self, input: PathBuf, config: &AppConfig) -> ConvertBook {
        ConvertBook {
            input,
            output: self.output.clone(),
            voice: config.tts.voice.clone(),
            speed: config.tts.speed,
            use_cache: config.cache.enabled,
            max_chapters: config.conversion.max_chapters,
            concurrency: config.conversion.concurrency,
        }
    }
}
