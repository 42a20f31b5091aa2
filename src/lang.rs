use crate::error::{DubError, Result};

/// Delivery languages supported by the dubbing pipeline.
///
/// The mux step tags streams with ISO 639-2 codes and human-readable
/// handler names, so every language we dub into needs both.
pub const SUPPORTED_LANGUAGES: [&str; 10] =
    ["en", "es", "fr", "de", "it", "pt", "ru", "zh", "ja", "ko"];

/// Map an ISO 639-1 code to the ISO 639-2/B code used in container metadata.
pub fn iso639_2(code: &str) -> Result<&'static str> {
    match code {
        "en" => Ok("eng"),
        "es" => Ok("spa"),
        "fr" => Ok("fra"),
        "de" => Ok("deu"),
        "it" => Ok("ita"),
        "pt" => Ok("por"),
        "ru" => Ok("rus"),
        "zh" => Ok("zho"),
        "ja" => Ok("jpn"),
        "ko" => Ok("kor"),
        other => Err(DubError::UnsupportedLanguage(other.to_string())),
    }
}

/// English display name for a language code, used for stream handler names.
pub fn display_name(code: &str) -> Result<&'static str> {
    match code {
        "en" => Ok("English"),
        "es" => Ok("Spanish"),
        "fr" => Ok("French"),
        "de" => Ok("German"),
        "it" => Ok("Italian"),
        "pt" => Ok("Portuguese"),
        "ru" => Ok("Russian"),
        "zh" => Ok("Chinese"),
        "ja" => Ok("Japanese"),
        "ko" => Ok("Korean"),
        other => Err(DubError::UnsupportedLanguage(other.to_string())),
    }
}

/// Validate a list of requested target languages up front, before any
/// provider is paid for work that the mux step would later reject.
pub fn validate_languages(codes: &[String]) -> Result<()> {
    for code in codes {
        iso639_2(code)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_iso639_2_mapping() {
        assert_eq!(iso639_2("fr").unwrap(), "fra");
        assert_eq!(iso639_2("ja").unwrap(), "jpn");
        assert!(iso639_2("tlh").is_err());
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("es").unwrap(), "Spanish");
        assert!(display_name("xx").is_err());
    }

    #[test]
    fn test_all_supported_languages_have_metadata() {
        for code in SUPPORTED_LANGUAGES {
            assert!(iso639_2(code).is_ok());
            assert!(display_name(code).is_ok());
        }
    }
}
