//! External command invocation and output decoding.
//!
//! Every backend that shells out to a CLI tool goes through [`CliRunner`]
//! so that argument flattening, window suppression on Windows, output
//! decoding, and failure classification behave the same everywhere.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, error, info, warn};

use crate::errors::TtsError;
use crate::platform;

/// One command-line argument, or a nested group of them.
///
/// Groups let callers splice pre-split flag lists (for example LAME flags
/// from configuration) into an argument vector without flattening by hand;
/// [`CliRunner`] flattens recursively, preserving left-to-right order.
#[derive(Debug, Clone)]
pub enum CliArg {
    /// A single argument, already stringified.
    Value(String),
    /// An ordered group of arguments, possibly nested.
    Group(Vec<CliArg>),
}

impl From<&str> for CliArg {
    fn from(value: &str) -> Self {
        CliArg::Value(value.to_string())
    }
}

impl From<String> for CliArg {
    fn from(value: String) -> Self {
        CliArg::Value(value)
    }
}

impl From<&String> for CliArg {
    fn from(value: &String) -> Self {
        CliArg::Value(value.clone())
    }
}

impl From<&Path> for CliArg {
    fn from(value: &Path) -> Self {
        CliArg::Value(value.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for CliArg {
    fn from(value: PathBuf) -> Self {
        CliArg::from(value.as_path())
    }
}

impl From<&PathBuf> for CliArg {
    fn from(value: &PathBuf) -> Self {
        CliArg::from(value.as_path())
    }
}

impl From<i64> for CliArg {
    fn from(value: i64) -> Self {
        CliArg::Value(value.to_string())
    }
}

impl From<u64> for CliArg {
    fn from(value: u64) -> Self {
        CliArg::Value(value.to_string())
    }
}

impl From<f64> for CliArg {
    fn from(value: f64) -> Self {
        CliArg::Value(value.to_string())
    }
}

impl<T: Into<CliArg>> From<Vec<T>> for CliArg {
    fn from(values: Vec<T>) -> Self {
        CliArg::Group(values.into_iter().map(Into::into).collect())
    }
}

fn flatten_into(arg: CliArg, out: &mut Vec<String>) {
    match arg {
        CliArg::Value(value) => out.push(value),
        CliArg::Group(group) => {
            for nested in group {
                flatten_into(nested, out);
            }
        }
    }
}

/// Flatten a potentially nested argument sequence into plain strings.
pub fn flatten(args: impl IntoIterator<Item = CliArg>) -> Vec<String> {
    let mut out = Vec::new();
    for arg in args {
        flatten_into(arg, &mut out);
    }
    out
}

/// A candidate text decoding for captured CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoding {
    /// Strict 7-bit ASCII.
    Ascii,
    /// UTF-8.
    Utf8,
    /// ISO-8859-1; every byte maps to a character, so this never fails.
    Latin1,
    /// Windows codepage 1252, for localized tools on Windows.
    Windows1252,
}

impl Decoding {
    /// Human-readable label for diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            Decoding::Ascii => "ascii",
            Decoding::Utf8 => "utf-8",
            Decoding::Latin1 => "latin-1",
            Decoding::Windows1252 => "windows-1252",
        }
    }

    /// Attempt to decode `bytes`, returning `None` when any byte is
    /// invalid in this encoding.
    pub fn try_decode(self, bytes: &[u8]) -> Option<String> {
        match self {
            Decoding::Ascii => bytes
                .is_ascii()
                .then(|| String::from_utf8_lossy(bytes).into_owned()),
            Decoding::Utf8 => std::str::from_utf8(bytes).ok().map(str::to_string),
            Decoding::Latin1 => Some(bytes.iter().map(|&b| b as char).collect()),
            Decoding::Windows1252 => encoding_rs::WINDOWS_1252
                .decode_without_bom_handling_and_without_replacement(bytes)
                .map(|cow| cow.into_owned()),
        }
    }
}

/// Runs external programs and shapes their output.
///
/// The runner makes exactly one attempt per call; retry policy belongs to
/// the caller. Construction is cheap, and runners are freely cloneable.
#[derive(Debug, Clone)]
pub struct CliRunner {
    decodings: Vec<Decoding>,
}

impl Default for CliRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl CliRunner {
    /// Create a runner using the platform's default decoding chain.
    pub fn new() -> Self {
        Self {
            decodings: platform::cli_decodings().to_vec(),
        }
    }

    /// Create a runner with a specific decoding chain.
    pub fn with_decodings(decodings: Vec<Decoding>) -> Self {
        Self { decodings }
    }

    /// Execute a program for its side effects only.
    ///
    /// The first flattened argument names the program; the rest are passed
    /// through verbatim. Fails when the program cannot be found, cannot be
    /// spawned, or exits non-zero.
    pub fn run_for_effect(
        &self,
        args: impl IntoIterator<Item = CliArg>,
    ) -> Result<(), TtsError> {
        let (program, output) = self.exec(flatten(args), "for processing")?;

        if !output.status.success() {
            return Err(TtsError::ProcessFailed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }

    /// Execute a program and capture its standard output as lines.
    ///
    /// Fails on a non-zero exit status, and with
    /// [`TtsError::EmptyOutput`] when the decoded output is blank.
    pub fn run_for_output(
        &self,
        args: impl IntoIterator<Item = CliArg>,
    ) -> Result<Vec<String>, TtsError> {
        let (program, output) = self.exec(flatten(args), "to inspect stdout")?;

        if !output.status.success() {
            return Err(TtsError::ProcessFailed {
                program,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        self.decode_output(&program, &output.stdout)
    }

    /// Like [`run_for_output`](Self::run_for_output), but lenient: the
    /// exit status is ignored and standard error is merged into the
    /// result. Only blank output fails.
    ///
    /// Most calls that work with the strict form also work here, but this
    /// form should be reserved for tools that knowingly write the output
    /// you need to stderr.
    pub fn run_for_output_lenient(
        &self,
        args: impl IntoIterator<Item = CliArg>,
    ) -> Result<Vec<String>, TtsError> {
        let (program, output) = self.exec(flatten(args), "to inspect stdout/stderr")?;

        let mut combined = output.stdout;
        combined.extend_from_slice(&output.stderr);

        self.decode_output(&program, &combined)
    }

    fn exec(
        &self,
        args: Vec<String>,
        purpose: &str,
    ) -> Result<(String, std::process::Output), TtsError> {
        let Some((program, rest)) = args.split_first() else {
            return Err(TtsError::EmptyInvocation);
        };

        debug!(program = %program, args = ?rest, purpose, "calling external binary");

        let mut command = Command::new(program);
        command
            .args(rest)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        #[cfg(target_os = "windows")]
        {
            use std::os::windows::process::CommandExt;
            command.creation_flags(platform::PROCESS_CREATION_FLAGS);
        }

        let output = command.output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TtsError::ToolNotFound {
                    program: program.clone(),
                }
            } else {
                TtsError::io(PathBuf::from(program), e)
            }
        })?;

        Ok((program.clone(), output))
    }

    /// Decode raw captured bytes and shape them into trimmed lines.
    pub fn decode_output(&self, program: &str, bytes: &[u8]) -> Result<Vec<String>, TtsError> {
        if bytes.is_empty() {
            return Err(TtsError::EmptyOutput {
                program: program.to_string(),
                detail: "no output",
            });
        }

        let mut decoded = None;
        for decoding in &self.decodings {
            match decoding.try_decode(bytes) {
                Some(text) => {
                    info!(encoding = decoding.label(), "CLI decoding success");
                    decoded = Some(text);
                    break;
                }
                None => warn!(encoding = decoding.label(), "CLI decoding failed"),
            }
        }

        // degraded success rather than a failure, matching long-standing
        // behavior that callers rely on for junk bytes in healthy output
        let decoded = decoded.unwrap_or_else(|| {
            error!("all CLI decodings failed; forcing ASCII");
            bytes
                .iter()
                .filter(|b| b.is_ascii())
                .map(|&b| b as char)
                .collect()
        });

        let decoded = decoded.trim();
        if decoded.is_empty() {
            return Err(TtsError::EmptyOutput {
                program: program.to_string(),
                detail: "only whitespace",
            });
        }

        let lines: Vec<String> = decoded.split('\n').map(str::to_string).collect();
        debug!(program, lines = lines.len(), "received output from call");

        Ok(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner() -> CliRunner {
        CliRunner::with_decodings(vec![Decoding::Ascii, Decoding::Utf8, Decoding::Latin1])
    }

    #[test]
    fn test_flatten_preserves_order_and_nesting() {
        let flags: CliArg = vec!["-q", "--abr", "64"].into();
        let args = flatten([
            CliArg::from("lame"),
            flags,
            CliArg::from(PathBuf::from("/tmp/in.wav")),
            CliArg::from(175_i64),
        ]);
        assert_eq!(args, ["lame", "-q", "--abr", "64", "/tmp/in.wav", "175"]);
    }

    #[test]
    fn test_flatten_handles_deep_nesting() {
        let inner: CliArg = vec![CliArg::from("b"), vec!["c", "d"].into()].into();
        let args = flatten([CliArg::from("a"), inner, CliArg::from("e")]);
        assert_eq!(args, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_decode_prefers_earliest_valid_encoding() {
        let lines = runner().decode_output("x", b"plain ascii\nsecond").unwrap();
        assert_eq!(lines, ["plain ascii", "second"]);
    }

    #[test]
    fn test_decode_utf8_when_not_ascii() {
        let bytes = "gr\u{fc}n".as_bytes();
        let lines = runner().decode_output("x", bytes).unwrap();
        assert_eq!(lines, ["gr\u{fc}n"]);
    }

    #[test]
    fn test_decode_latin1_fallback() {
        // 0xE9 is 'é' in latin-1 but invalid as a lone UTF-8 byte
        let lines = runner().decode_output("x", b"caf\xe9").unwrap();
        assert_eq!(lines, ["caf\u{e9}"]);
    }

    #[test]
    fn test_decode_windows_1252_smart_quote() {
        let runner = CliRunner::with_decodings(vec![Decoding::Windows1252]);
        // 0x93/0x94 are curly quotes in cp1252 but undefined in latin-1's
        // C1 range as far as readable text goes
        let lines = runner.decode_output("x", b"\x93hi\x94").unwrap();
        assert_eq!(lines, ["\u{201c}hi\u{201d}"]);
    }

    #[test]
    fn test_decode_forces_ascii_when_all_fail() {
        // an ASCII-only chain cannot represent 0xFF, so the forced decode
        // drops it without raising
        let runner = CliRunner::with_decodings(vec![Decoding::Ascii]);
        let lines = runner.decode_output("x", b"ok\xffok").unwrap();
        assert_eq!(lines, ["okok"]);
    }

    #[test]
    fn test_decode_rejects_empty_and_whitespace() {
        assert!(matches!(
            runner().decode_output("x", b""),
            Err(TtsError::EmptyOutput { detail: "no output", .. }),
        ));
        assert!(matches!(
            runner().decode_output("x", b"  \n\t "),
            Err(TtsError::EmptyOutput { detail: "only whitespace", .. }),
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_for_output_captures_lines() {
        let lines = runner()
            .run_for_output(["sh".into(), "-c".into(), "printf 'one\\ntwo\\n'".into()])
            .unwrap();
        assert_eq!(lines, ["one", "two"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_run_for_effect_reports_nonzero_exit() {
        let err = runner()
            .run_for_effect(["sh".into(), "-c".into(), "echo oops >&2; exit 3".into()])
            .unwrap_err();
        match err {
            TtsError::ProcessFailed { program, stderr, .. } => {
                assert_eq!(program, "sh");
                assert_eq!(stderr, "oops");
            }
            other => panic!("expected ProcessFailed, got {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_lenient_run_merges_stderr_and_ignores_status() {
        let script = "echo out; echo err >&2; exit 7";
        let strict = runner().run_for_output(["sh".into(), "-c".into(), script.into()]);
        assert!(matches!(strict, Err(TtsError::ProcessFailed { .. })));

        let lines = runner()
            .run_for_output_lenient(["sh".into(), "-c".into(), script.into()])
            .unwrap();
        assert!(lines.contains(&"out".to_string()));
        assert!(lines.contains(&"err".to_string()));
    }

    #[test]
    fn test_invocation_without_a_program_is_rejected() {
        let err = runner().run_for_effect([]).unwrap_err();
        assert!(matches!(err, TtsError::EmptyInvocation));

        // a lone empty group flattens to nothing as well
        let err = runner()
            .run_for_output([CliArg::Group(Vec::new())])
            .unwrap_err();
        assert!(matches!(err, TtsError::EmptyInvocation));
    }

    #[test]
    fn test_missing_binary_is_classified() {
        let err = runner()
            .run_for_effect(["definitely-not-a-real-binary-for-tts".into()])
            .unwrap_err();
        assert!(matches!(err, TtsError::ToolNotFound { .. }));
    }
}
