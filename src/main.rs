//! Polydub - Automated Video Dubbing Pipeline
//!
//! Main entry point for the polydub application, which produces
//! multi-language dubbed videos from a single source using external
//! transcription, translation, and speech services plus ffmpeg.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use polydub::cli::{parse_target_langs, Args, Commands};
use polydub::config::Config;
use polydub::lang;
use polydub::media::MediaProcessorFactory;
use polydub::pipeline::{Pipeline, SourceRef};
use polydub::providers::{translate_blocks, ProviderFactory};
use polydub::scope::PipelineScope;
use polydub::storage::{FsStorage, JsonlRecordSink};
use polydub::subtitle::{self, SubtitleFormat};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    // Execute command
    match args.command {
        Commands::Dub {
            input,
            target_langs,
        } => {
            let languages = parse_target_langs(&target_langs);
            let pipeline = build_pipeline(&config)?;
            let source = if input.starts_with("http://") || input.starts_with("https://") {
                SourceRef::Url(input)
            } else {
                SourceRef::File(input.into())
            };

            let report = pipeline.dub(source, &languages).await?;
            println!("Published: {}", report.output_url);
            println!("Languages included: {}", report.included_languages.join(", "));
            for failure in &report.failed_languages {
                println!("Failed {}: {}", failure.language, failure.cause);
            }
        }
        Commands::Batch {
            input_dir,
            target_langs,
        } => {
            let languages = parse_target_langs(&target_langs);
            let pipeline = build_pipeline(&config)?;
            let reports = pipeline.dub_directory(&input_dir, &languages).await?;
            println!("Processed {} videos", reports.len());
            for report in &reports {
                println!("  {}", report.output_url);
            }
        }
        Commands::Extract { input, output } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability()?;
            media.extract_audio(&input, &output).await?;
            println!("Extracted audio to {}", output.display());
        }
        Commands::Transcribe { input, output } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability()?;
            let transcriber = ProviderFactory::create_transcriber(config.transcription.clone());

            // Anything that is not already compressed audio goes through
            // extraction first
            let scope = PipelineScope::open()?;
            let audio_path = if input.extension().and_then(|e| e.to_str()) == Some("mp3") {
                input.clone()
            } else {
                let extracted = scope.allocate("transcribe_audio", "mp3");
                media.extract_audio(&input, &extracted).await?;
                extracted
            };

            let srt = transcriber.transcribe_file(&audio_path).await?;
            tokio::fs::write(&output, &srt).await?;
            scope.close();
            println!("Transcript written to {}", output.display());
        }
        Commands::Translate {
            input,
            output,
            language,
        } => {
            lang::validate_languages(std::slice::from_ref(&language))?;
            let translator = ProviderFactory::create_translator(config.translation.clone());

            let raw = tokio::fs::read_to_string(&input).await?;
            let in_format = SubtitleFormat::from_path(&input)?;
            let out_format = SubtitleFormat::from_path(&output)?;
            let blocks = subtitle::parse(&raw, in_format)?;

            let translated = translate_blocks(
                translator.as_ref(),
                &blocks,
                &language,
                config.translation.fallback_to_source,
            )
            .await?;
            tokio::fs::write(&output, subtitle::serialize(&translated, out_format)).await?;
            println!(
                "Translated {} blocks to {} at {}",
                translated.len(),
                language,
                output.display()
            );
        }
        Commands::Synthesize {
            text,
            output,
            language,
        } => {
            lang::validate_languages(std::slice::from_ref(&language))?;
            let speech = ProviderFactory::create_speech(config.speech.clone());
            let audio = speech.synthesize(&text, &language).await?;
            tokio::fs::write(&output, &audio).await?;
            println!("Wrote {} bytes to {}", audio.len(), output.display());
        }
        Commands::Convert { input, output } => {
            let media = MediaProcessorFactory::create_processor(config.media.clone());
            media.check_availability()?;
            media.convert_subtitle(&input, &output).await?;
            println!("Converted subtitle to {}", output.display());
        }
        Commands::Languages => {
            println!("{:<6} {:<12} {:<10}", "Code", "Name", "ISO 639-2");
            println!("{}", "-".repeat(30));
            for code in lang::SUPPORTED_LANGUAGES {
                println!(
                    "{:<6} {:<12} {:<10}",
                    code,
                    lang::display_name(code)?,
                    lang::iso639_2(code)?
                );
            }
        }
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}

fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let storage = Arc::new(FsStorage::new(&config.storage));
    let records = Arc::new(JsonlRecordSink::new(
        std::path::PathBuf::from(&config.storage.output_dir).join("records.jsonl"),
    ));
    Ok(Pipeline::from_config(config.clone(), storage, records)?)
}

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let polydub_dir = std::env::current_dir()?.join(".polydub");
    let log_dir = polydub_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "polydub.log");
    let (non_blocking_file, _guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(_guard);

    // Determine log level
    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Create console layer
    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true);

    // Create file layer
    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    // Setup layered subscriber
    let subscriber = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer);

    // Initialize the subscriber
    subscriber
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("polydub.log").display()
    );

    Ok(())
}
