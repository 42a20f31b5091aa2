use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dub a single video into one or more target languages
    Dub {
        /// Input video: local path or http(s) URL
        #[arg(short, long)]
        input: String,

        /// Target languages (comma-separated ISO 639-1 codes)
        #[arg(short, long, default_value = "es")]
        target_langs: String,
    },

    /// Dub every video file found under a directory
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Target languages (comma-separated ISO 639-1 codes)
        #[arg(short, long, default_value = "es")]
        target_langs: String,
    },

    /// Extract compressed audio from a video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe a video or audio file into SRT timed text
    Transcribe {
        /// Input video or audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Translate a subtitle file into a target language
    Translate {
        /// Input subtitle file (.srt or .vtt)
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,

        /// Target language (ISO 639-1 code)
        #[arg(short, long)]
        language: String,
    },

    /// Synthesize speech for a text snippet
    Synthesize {
        /// Text to speak
        #[arg(short, long)]
        text: String,

        /// Output audio file
        #[arg(short, long)]
        output: PathBuf,

        /// Language used for voice selection (ISO 639-1 code)
        #[arg(short, long, default_value = "en")]
        language: String,
    },

    /// Convert a subtitle file between dialects (by file extension)
    Convert {
        /// Input subtitle file
        #[arg(short, long)]
        input: PathBuf,

        /// Output subtitle file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List supported target languages
    Languages,

    /// Generate a default configuration file
    InitConfig {
        /// Where to write the configuration
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

/// Split a comma-separated language list into trimmed, non-empty codes.
pub fn parse_target_langs(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_target_langs_trims_and_drops_empties() {
        assert_eq!(
            parse_target_langs("es, fr ,,ja"),
            vec!["es", "fr", "ja"]
        );
        assert!(parse_target_langs("").is_empty());
    }

    #[test]
    fn test_args_parse_dub() {
        let args = Args::parse_from([
            "polydub", "dub", "--input", "movie.mp4", "--target-langs", "es,ja",
        ]);
        match args.command {
            Commands::Dub {
                input,
                target_langs,
            } => {
                assert_eq!(input, "movie.mp4");
                assert_eq!(parse_target_langs(&target_langs), vec!["es", "ja"]);
            }
            _ => panic!("expected dub subcommand"),
        }
    }
}
