//! epubcast - EPUB 转有声书命令行

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use epubcast::application::ports::{NoopProgress, ProgressPort, SpeechEnginePort};
use epubcast::application::{ConversionError, ConvertBookHandler, ErrorKind};
use epubcast::config::{load_config_from_path, print_config, validate_config, AppConfig, EngineKind};
use epubcast::infrastructure::adapters::{
    EpubBookParser, FakeTtsClient, FakeTtsClientConfig, HttpTtsClient, HttpTtsClientConfig,
    OggOpusWriter, SysinfoDiskSpace, WavPcmStore,
};
use epubcast::infrastructure::cli::{Args, IndicatifProgress};
use epubcast::infrastructure::FileAudioCache;

fn init_logging(config: &AppConfig, level: &str) {
    let log_filter = format!("warn,epubcast={}", level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.log.json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn build_engine(config: &AppConfig) -> anyhow::Result<Arc<dyn SpeechEnginePort>> {
    let segment = config.tts.segment_config();
    Ok(match config.tts.engine {
        EngineKind::Http => {
            let tts_config = HttpTtsClientConfig {
                base_url: config.tts.url.clone(),
                timeout_secs: config.tts.timeout_secs,
                max_retries: config.tts.max_retries,
                sample_rate: config.audio.sample_rate,
                segment,
            };
            let client = HttpTtsClient::new(tts_config).map_err(|e| ConversionError::synthesis(
                "Failed to create TTS client",
                e,
            ))?;
            Arc::new(client)
        }
        EngineKind::Fake => Arc::new(FakeTtsClient::new(FakeTtsClientConfig {
            sample_rate: config.audio.sample_rate,
            segment,
            ..Default::default()
        })),
    })
}

async fn list_voices(engine: &dyn SpeechEnginePort) -> anyhow::Result<()> {
    let voices = engine
        .voices()
        .await
        .map_err(|e| ConversionError::synthesis("Failed to list voices", e))?;
    for voice in voices {
        println!("{}", voice);
    }
    Ok(())
}

/// 优先级：命令行 > 环境变量 > 配置文件 > 默认值
fn load_settings(args: &Args) -> anyhow::Result<AppConfig> {
    let mut config = load_config_from_path(args.config.as_deref())
        .map_err(|e| ConversionError::invalid_input(e.to_string()))?;
    args.apply_to(&mut config);
    validate_config(&config).map_err(|e| ConversionError::invalid_input(e.to_string()))?;
    Ok(config)
}

async fn run(args: Args, config: AppConfig) -> anyhow::Result<()> {
    print_config(&config);

    let engine = build_engine(&config)?;

    if args.list_voices {
        return list_voices(engine.as_ref()).await;
    }

    let input = args
        .input
        .clone()
        .ok_or_else(|| ConversionError::invalid_input("No input EPUB given"))?;

    if config.tts.engine == EngineKind::Http && !engine.health_check().await {
        tracing::warn!(url = %config.tts.url, "TTS service health check failed");
    }

    let progress: Arc<dyn ProgressPort> = if args.quiet {
        Arc::new(NoopProgress)
    } else {
        Arc::new(IndicatifProgress::new())
    };

    let handler = ConvertBookHandler::new(
        Arc::new(EpubBookParser::new()),
        engine,
        Arc::new(FileAudioCache::new(config.cache.dir.clone())),
        Arc::new(WavPcmStore::new()),
        Arc::new(OggOpusWriter::new(config.audio.bitrate)),
        Arc::new(SysinfoDiskSpace::new()),
    )
    .with_progress(progress)
    .with_boilerplate((&config.tags).into());

    let summary = handler
        .handle(args.command(input, &config))
        .await
        .context("Conversion failed")?;
    summary.log();

    if !args.quiet {
        println!("{}", summary.output.display());
    }
    Ok(())
}

fn error_kind(error: &anyhow::Error) -> ErrorKind {
    error
        .downcast_ref::<ConversionError>()
        .map(ConversionError::kind)
        .unwrap_or(ErrorKind::UnknownError)
}

fn report(error: anyhow::Error) -> ExitCode {
    let kind = error_kind(&error);
    if kind == ErrorKind::UnknownError {
        tracing::error!(error = ?error, "Unexpected failure");
    }
    eprintln!("Error [{}]: {:#}", kind, error);
    ExitCode::from(kind.exit_code() as u8)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // 配置不可用时以默认日志设置报告错误
    let config = match load_settings(&args) {
        Ok(config) => config,
        Err(error) => {
            let fallback = AppConfig::default();
            init_logging(&fallback, args.log_level(&fallback.log.level));
            return report(error);
        }
    };
    init_logging(&config, args.log_level(&config.log.level));

    match run(args, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(error),
    }
}
