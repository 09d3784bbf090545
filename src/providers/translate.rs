//! Google Translate speech backend.
//!
//! Uses the unofficial `translate_tts` endpoint, which serves MP3
//! directly but caps each request at a short phrase. Longer input is
//! segmented at natural break points and fetched as one download per
//! segment; the payloads concatenate into a single valid stream because
//! the endpoint emits headerless MPEG frames.

use std::collections::HashMap;
use std::path::Path;

use crate::errors::TtsError;
use crate::net::{FetchRequire, WebTarget};
use crate::options::{OptionValues, ServiceOption};
use crate::segment;
use crate::service::{Service, ServiceContext, ServiceTrait};

const TRAITS: &[ServiceTrait] = &[ServiceTrait::Internet];

const ENDPOINT: &str = "http://translate.google.com/translate_tts";

/// Maximum characters the endpoint accepts per request.
const INPUT_LIMIT: usize = 100;

/// Responses under this size are error pages, not audio.
const MIN_PAYLOAD: u64 = 1024;

/// Languages the endpoint speaks, as `(code, label)` pairs.
const VOICES: &[(&str, &str)] = &[
    ("af", "Afrikaans"),
    ("ar", "Arabic"),
    ("bs", "Bosnian"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("cy", "Welsh"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("eo", "Esperanto"),
    ("es", "Spanish"),
    ("fi", "Finnish"),
    ("fr", "French"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("ht", "Haitian Creole"),
    ("hu", "Hungarian"),
    ("hy", "Armenian"),
    ("id", "Indonesian"),
    ("is", "Icelandic"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("la", "Latin"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("th", "Thai"),
    ("tr", "Turkish"),
    ("vi", "Vietnamese"),
    ("zh", "Chinese"),
];

/// The Google Translate backend.
pub struct GoogleTranslate {
    ctx: ServiceContext,
    endpoint: String,
}

impl GoogleTranslate {
    pub fn new(ctx: ServiceContext) -> Self {
        Self {
            ctx,
            endpoint: ENDPOINT.to_string(),
        }
    }

    /// Point the backend at an alternate endpoint. Intended for tests.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Map a caller-supplied voice value onto a language code: exact code,
/// then label (case-insensitively), then a two-character chop of the
/// value against the codes.
fn lookup_voice(value: &str) -> Option<&'static str> {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }

    VOICES
        .iter()
        .find(|(code, _)| *code == value)
        .or_else(|| VOICES.iter().find(|(_, label)| label.to_lowercase() == value))
        .or_else(|| {
            let chopped: String = value.chars().take(2).collect();
            VOICES.iter().find(|(code, _)| *code == chopped)
        })
        .map(|(code, _)| *code)
}

impl Service for GoogleTranslate {
    fn name(&self) -> &str {
        "google"
    }

    fn traits(&self) -> &[ServiceTrait] {
        TRAITS
    }

    fn describe(&self) -> String {
        format!("Google Translate text-to-speech ({} languages)", VOICES.len())
    }

    fn options(&self) -> Vec<ServiceOption> {
        let choices = VOICES
            .iter()
            .map(|(code, label)| (code.to_string(), label.to_string()))
            .collect();

        vec![
            ServiceOption::new("voice", "Voice", OptionValues::Choices(choices))
                .with_transform(|raw| match lookup_voice(raw) {
                    Some(code) => code.to_string(),
                    None => raw.trim().to_lowercase(),
                }),
        ]
    }

    fn run(
        &self,
        text: &str,
        options: &HashMap<String, String>,
        path: &Path,
    ) -> Result<(), TtsError> {
        let voice = options.get("voice").ok_or_else(|| TtsError::MissingOption {
            service: "google".to_string(),
            key: "voice".to_string(),
        })?;

        let targets: Vec<WebTarget> = segment::split(text, INPUT_LIMIT)
            .into_iter()
            .map(|chunk| {
                WebTarget::new(&self.endpoint)
                    .with_param("tl", voice)
                    .with_param("q", chunk)
            })
            .collect();

        self.ctx.net_download(
            path,
            &targets,
            &FetchRequire {
                mime: Some("audio/mpeg".to_string()),
                min_size: MIN_PAYLOAD,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn context(dir: &Path) -> ServiceContext {
        ServiceContext::new(
            dir.join("scratch"),
            Arc::new(String::new),
            Arc::new(|text: &str| text.to_string()),
        )
        .unwrap()
    }

    #[test]
    fn test_voice_lookup() {
        assert_eq!(lookup_voice("de"), Some("de"));
        assert_eq!(lookup_voice("German"), Some("de"));
        assert_eq!(lookup_voice("en-US"), Some("en"));
        assert_eq!(lookup_voice("  JA "), Some("ja"));
        assert_eq!(lookup_voice("xx"), None);
        assert_eq!(lookup_voice(""), None);
    }

    #[test]
    fn test_options_resolve_aliases_to_codes() {
        let dir = tempfile::tempdir().unwrap();
        let service = GoogleTranslate::new(context(dir.path()));

        let given = HashMap::from([("voice".to_string(), "English".to_string())]);
        let resolved =
            crate::options::resolve_options(service.name(), &service.options(), &given).unwrap();
        assert_eq!(resolved["voice"], "en");
    }

    #[test]
    fn test_short_text_is_a_single_request() {
        let body = vec![b'A'; MIN_PAYLOAD as usize];

        let mut server = mockito::Server::new();
        let text = "Hello world. How are you today?";
        let m = server
            .mock("GET", "/translate_tts")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("tl".into(), "en".into()),
                mockito::Matcher::UrlEncoded("q".into(), text.into()),
            ]))
            .with_header("content-type", "audio/mpeg")
            .with_body(&body)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let service = GoogleTranslate::new(ctx.clone())
            .with_endpoint(format!("{}/translate_tts", server.url()));

        let out = dir.path().join("single.mp3");
        let options = HashMap::from([("voice".to_string(), "en".to_string())]);
        service.run(text, &options, &out).unwrap();

        m.assert();
        assert_eq!(ctx.download_count(), 1);
        assert_eq!(std::fs::metadata(&out).unwrap().len(), MIN_PAYLOAD);
    }

    #[test]
    fn test_long_text_concatenates_segments() {
        let body = vec![b'X'; MIN_PAYLOAD as usize];
        let mut server = mockito::Server::new();
        let m = server
            .mock("GET", "/translate_tts")
            .match_query(mockito::Matcher::UrlEncoded("tl".into(), "en".into()))
            .with_header("content-type", "audio/mpeg")
            .with_body(&body)
            .expect(2)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let service = GoogleTranslate::new(ctx.clone())
            .with_endpoint(format!("{}/translate_tts", server.url()));

        let text = format!("{}. {}", "a".repeat(80), "b".repeat(60));
        assert_eq!(segment::split(&text, INPUT_LIMIT).len(), 2);

        let out = dir.path().join("out.mp3");
        let options = HashMap::from([("voice".to_string(), "en".to_string())]);
        service.run(&text, &options, &out).unwrap();

        m.assert();
        assert_eq!(ctx.download_count(), 2);
        assert_eq!(
            std::fs::metadata(&out).unwrap().len(),
            MIN_PAYLOAD * 2
        );
    }
}
