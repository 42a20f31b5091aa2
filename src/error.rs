use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("malformed timecode: {0}")]
    MalformedTimecode(String),

    #[error("transcription error: {0}")]
    Transcription(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("translation failed for block {block_index}: {cause}")]
    TranslationFailed { block_index: usize, cause: String },

    #[error("speech synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("concatenation failed for language {language}: {cause}")]
    ConcatenationFailed { language: String, cause: String },

    #[error("mux verification failed: {0}")]
    MuxVerificationFailed(String),

    #[error("media processing error: {0}")]
    Media(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("operation timed out: {0}")]
    Timeout(String),
}

pub type Result<T> = std::result::Result<T, DubError>;
