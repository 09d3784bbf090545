//! eSpeak host synthesizer backend.
//!
//! eSpeak is a compact formant synthesizer available on every desktop
//! platform. It writes wave data, so this backend declares the
//! transcoding trait and routes its output through LAME. Voices are
//! probed from the local installation at construction time, including
//! any MBROLA voices the user has installed alongside.

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, warn};

use crate::cli::CliArg;
use crate::errors::TtsError;
use crate::options::{OptionValues, ServiceOption};
use crate::service::{Service, ServiceContext, ServiceTrait};
use crate::transcode::TranscodeRequire;

const TRAITS: &[ServiceTrait] = &[ServiceTrait::Transcoding];

/// Wave files under this size mean the synthesizer produced header-only
/// output, which happens when it rejects the input text.
const MIN_WAVE_SIZE: u64 = 4096;

#[cfg(windows)]
const REG_SUBKEY: &str = r"Software\Microsoft\Speech\Voices\Tokens\eSpeak";

/// One voice reported by `espeak --voices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EspeakVoice {
    /// Voice name as accepted by `-v`.
    pub name: String,
    /// Language tag, e.g. `en` or `en-uk`.
    pub language: String,
    /// `M`, `F`, or `None` when the listing does not say.
    pub gender: Option<char>,
    /// Whether this voice requires MBROLA voice data.
    pub mbrola: bool,
}

impl EspeakVoice {
    fn label(&self) -> String {
        match self.gender {
            Some(gender) => format!("{} ({}, {})", self.name, self.language, gender),
            None => format!("{} ({})", self.name, self.language),
        }
    }
}

/// The eSpeak backend.
pub struct ESpeak {
    ctx: ServiceContext,
    binary: String,
    version: String,
    voices: Vec<EspeakVoice>,
}

impl ESpeak {
    /// Probe the local eSpeak installation.
    ///
    /// Fails with [`TtsError::UnsupportedEnvironment`] when the binary
    /// cannot be located or reports no voices.
    pub fn new(ctx: ServiceContext) -> Result<Self, TtsError> {
        Self::with_binary(ctx, "espeak")
    }

    /// Probe a specific eSpeak binary. Intended for tests and for hosts
    /// that bundle their own build.
    pub fn with_binary(ctx: ServiceContext, binary: impl Into<String>) -> Result<Self, TtsError> {
        let mut binary = binary.into();

        let version = match probe_version(&ctx, &binary) {
            Ok(version) => version,
            Err(TtsError::ToolNotFound { .. }) => {
                match registry_binary(&ctx) {
                    Some(registered) => {
                        debug!(binary = %registered, "falling back to registered eSpeak path");
                        binary = registered;
                        probe_version(&ctx, &binary)?
                    }
                    None => {
                        return Err(TtsError::UnsupportedEnvironment {
                            service: "espeak".to_string(),
                            reason: format!("the `{binary}` binary could not be located"),
                        });
                    }
                }
            }
            Err(e) => return Err(e),
        };

        let mut voices = probe_voices(&ctx, &binary, None)?;
        match probe_voices(&ctx, &binary, Some("mb")) {
            Ok(mbrola) => voices.extend(mbrola),
            // MBROLA is an optional add-on; its absence is not a failure
            Err(e) => warn!(error = %e, "no MBROLA voice listing"),
        }

        if voices.is_empty() {
            return Err(TtsError::UnsupportedEnvironment {
                service: "espeak".to_string(),
                reason: "the installation reports no voices".to_string(),
            });
        }

        voices.sort_by(|a, b| a.label().cmp(&b.label()));
        debug!(version = %version, voices = voices.len(), "eSpeak probed");

        Ok(Self {
            ctx,
            binary,
            version,
            voices,
        })
    }

    /// The probed voice inventory.
    pub fn voices(&self) -> &[EspeakVoice] {
        &self.voices
    }
}

fn probe_version(ctx: &ServiceContext, binary: &str) -> Result<String, TtsError> {
    let lines = ctx.cli_output([CliArg::from(binary), CliArg::from("--version")])?;
    Ok(lines[0].trim().to_string())
}

fn probe_voices(
    ctx: &ServiceContext,
    binary: &str,
    variant: Option<&str>,
) -> Result<Vec<EspeakVoice>, TtsError> {
    let listing = match variant {
        Some(variant) => format!("--voices={variant}"),
        None => "--voices".to_string(),
    };
    let lines = ctx.cli_output([CliArg::from(binary), CliArg::from(listing)])?;
    Ok(parse_voice_listing(&lines))
}

#[cfg(windows)]
fn registry_binary(ctx: &ServiceContext) -> Option<String> {
    let root = ctx.reg_hklm(REG_SUBKEY, "Path").ok()?;
    Some(format!(r"{root}\command_line\espeak.exe"))
}

#[cfg(not(windows))]
fn registry_binary(_ctx: &ServiceContext) -> Option<String> {
    None
}

/// Parse `espeak --voices` output.
///
/// Lines look like:
///
/// ```text
/// Pty Language Age/Gender VoiceName          File          Other Languages
///  5  af             M  afrikaans            other/af
///  2  en-uk          M  english-mb-en1       mb/mb-en1      (en 2)
/// ```
///
/// The header and anything unparseable are skipped rather than raised;
/// a hostile listing just yields fewer voices.
fn parse_voice_listing(lines: &[String]) -> Vec<EspeakVoice> {
    lines
        .iter()
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 || fields[0].parse::<u8>().is_err() {
                return None;
            }
            Some(EspeakVoice {
                name: fields[3].to_string(),
                language: fields[1].to_lowercase(),
                gender: parse_gender(fields[2]),
                mbrola: fields.get(4).is_some_and(|f| f.starts_with("mb/")),
            })
        })
        .collect()
}

/// Convert a word-gap value in seconds to the 10ms units `-g` takes.
///
/// An unparseable value is an error; `run` may be handed a map that
/// never went through option resolution.
fn gap_units(value: &str) -> Result<i64, TtsError> {
    let seconds: f64 = value.parse().map_err(|_| TtsError::InvalidOption {
        service: "espeak".to_string(),
        key: "gap".to_string(),
        value: value.to_string(),
        reason: "not a number".to_string(),
    })?;
    Ok((seconds * 100.0).round() as i64)
}

/// Gender fields come as `M`, `F`, `-`, or combined forms like `--/M`.
fn parse_gender(field: &str) -> Option<char> {
    match field.rsplit('/').next()? {
        "M" => Some('M'),
        "F" => Some('F'),
        _ => None,
    }
}

/// Map a caller-supplied voice value onto a canonical voice name.
///
/// Matching precedence: exact voice name, exact language tag, top-level
/// language, then progressively shorter prefixes of the value (three
/// characters, then two) against the language tags. MBROLA voices win
/// ties because they sound considerably better than the formant set.
fn lookup_voice<'a>(voices: &'a [EspeakVoice], value: &str) -> Option<&'a EspeakVoice> {
    let value = value.trim().to_lowercase();
    if value.is_empty() {
        return None;
    }
    let top_level = |tag: &str| tag.split('-').next().unwrap_or(tag).to_string();

    let passes: [&dyn Fn(&EspeakVoice) -> bool; 4] = [
        &|v| v.name.to_lowercase() == value,
        &|v| v.language == value,
        &|v| top_level(&v.language) == top_level(&value),
        &|v| {
            let chopped: String = value.chars().take(3).collect();
            v.language.starts_with(&chopped) || {
                let chopped: String = value.chars().take(2).collect();
                v.language.starts_with(&chopped)
            }
        },
    ];

    for pass in passes {
        let hit = voices
            .iter()
            .filter(|v| pass(v))
            .max_by_key(|v| v.mbrola);
        if hit.is_some() {
            return hit;
        }
    }
    None
}

impl Service for ESpeak {
    fn name(&self) -> &str {
        "espeak"
    }

    fn traits(&self) -> &[ServiceTrait] {
        TRAITS
    }

    fn describe(&self) -> String {
        format!("eSpeak ({}, {} voices)", self.version, self.voices.len())
    }

    fn options(&self) -> Vec<ServiceOption> {
        let choices = self
            .voices
            .iter()
            .map(|v| (v.name.clone(), v.label()))
            .collect();

        let voices = self.voices.clone();
        let voice = ServiceOption::new("voice", "Voice", OptionValues::Choices(choices))
            .with_transform(move |raw| match lookup_voice(&voices, raw) {
                Some(voice) => voice.name.clone(),
                None => raw.trim().to_lowercase(),
            });

        vec![
            voice,
            ServiceOption::new(
                "speed",
                "Speed",
                OptionValues::Range {
                    min: 80.0,
                    max: 450.0,
                    unit: "wpm".to_string(),
                },
            )
            .with_default("175"),
            ServiceOption::new(
                "gap",
                "Word Gap",
                OptionValues::Range {
                    min: 0.0,
                    max: 5.0,
                    unit: "seconds".to_string(),
                },
            )
            .with_default("0"),
            ServiceOption::new(
                "pitch",
                "Pitch",
                OptionValues::Range {
                    min: 0.0,
                    max: 99.0,
                    unit: "%".to_string(),
                },
            )
            .with_default("50"),
            ServiceOption::new(
                "volume",
                "Volume",
                OptionValues::Range {
                    min: 0.0,
                    max: 200.0,
                    unit: "%".to_string(),
                },
            )
            .with_default("100"),
        ]
    }

    fn run(
        &self,
        text: &str,
        options: &HashMap<String, String>,
        path: &Path,
    ) -> Result<(), TtsError> {
        let opt = |key: &str| {
            options.get(key).ok_or_else(|| TtsError::MissingOption {
                service: "espeak".to_string(),
                key: key.to_string(),
            })
        };

        let gap = gap_units(opt("gap")?)?;

        let input_file = self.ctx.path_workaround(text)?;
        let wave = self.ctx.path_temp("wav");

        let mut args = vec![
            CliArg::from(self.binary.as_str()),
            "-v".into(),
            CliArg::from(opt("voice")?),
            "-s".into(),
            CliArg::from(opt("speed")?),
            "-g".into(),
            CliArg::from(gap),
            "-p".into(),
            CliArg::from(opt("pitch")?),
            "-a".into(),
            CliArg::from(opt("volume")?),
            "-w".into(),
            CliArg::from(&wave),
        ];
        match &input_file {
            Some(file) => {
                args.push("-f".into());
                args.push(CliArg::from(file));
            }
            None => {
                args.push("--".into());
                args.push(CliArg::from(text));
            }
        }

        let result = self.ctx.cli_call(args).and_then(|()| {
            self.ctx.cli_transcode(
                &wave,
                path,
                TranscodeRequire {
                    min_input_size: MIN_WAVE_SIZE,
                },
            )
        });

        self.ctx.path_unlink(input_file.iter().chain(Some(&wave)));
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<String> {
        [
            "Pty Language Age/Gender VoiceName          File          Other Languages",
            " 5  af             M  afrikaans            other/af",
            " 2  de             M  german               de",
            " 2  en-uk          M  english              en",
            " 5  en-us          M  us-mbrola-2          mb/us2         (en 8)",
            " 9  fr          --/F  french-f             mb/mb-fr4",
            "garbage line that should be skipped",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    #[test]
    fn test_voice_listing_parses_and_skips_junk() {
        let voices = parse_voice_listing(&listing());
        assert_eq!(voices.len(), 5);

        let german = &voices[1];
        assert_eq!(german.name, "german");
        assert_eq!(german.language, "de");
        assert_eq!(german.gender, Some('M'));
        assert!(!german.mbrola);

        let mbrola = &voices[3];
        assert_eq!(mbrola.name, "us-mbrola-2");
        assert!(mbrola.mbrola);
    }

    #[test]
    fn test_combined_gender_field() {
        assert_eq!(parse_gender("--/F"), Some('F'));
        assert_eq!(parse_gender("M"), Some('M'));
        assert_eq!(parse_gender("-"), None);
    }

    #[test]
    fn test_lookup_precedence() {
        let voices = parse_voice_listing(&listing());

        // exact name beats everything
        assert_eq!(lookup_voice(&voices, "german").unwrap().name, "german");
        // exact language tag
        assert_eq!(lookup_voice(&voices, "en-uk").unwrap().name, "english");
        // top-level language, MBROLA preferred on ties
        assert_eq!(lookup_voice(&voices, "en").unwrap().name, "us-mbrola-2");
        // prefix chop: "fra" -> "fr"
        assert_eq!(lookup_voice(&voices, "fra").unwrap().name, "french-f");
        // case and whitespace are normalized
        assert_eq!(lookup_voice(&voices, "  DE ").unwrap().name, "german");

        assert!(lookup_voice(&voices, "zz").is_none());
        assert!(lookup_voice(&voices, "").is_none());
    }

    #[test]
    fn test_gap_seconds_convert_to_centisecond_units() {
        assert_eq!(gap_units("0").unwrap(), 0);
        assert_eq!(gap_units("0.5").unwrap(), 50);
        assert_eq!(gap_units("5").unwrap(), 500);

        let err = gap_units("brief").unwrap_err();
        match err {
            TtsError::InvalidOption { key, value, .. } => {
                assert_eq!(key, "gap");
                assert_eq!(value, "brief");
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn test_voice_labels_carry_language_and_gender() {
        let voices = parse_voice_listing(&listing());
        assert_eq!(voices[1].label(), "german (de, M)");

        let nameless_gender = EspeakVoice {
            name: "x".to_string(),
            language: "xx".to_string(),
            gender: None,
            mbrola: false,
        };
        assert_eq!(nameless_gender.label(), "x (xx)");
    }
}
