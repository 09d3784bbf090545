//! Lossy-format transcoding through the LAME encoder.
//!
//! Host synthesizers mostly emit raw wave data, while callers want MP3.
//! [`Transcoder`] bridges the two: it validates the input, encodes into a
//! scratch file, and only then moves the result to the destination, so a
//! failed encode never leaves a half-written file at the target path.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::cli::{CliArg, CliRunner};
use crate::errors::TtsError;
use crate::platform;
use crate::scratch::ScratchSpace;

/// Validation requirements for a transcoding input.
#[derive(Debug, Clone, Copy, Default)]
pub struct TranscodeRequire {
    /// Minimum input size in bytes; inputs below this are rejected as
    /// likely-failed upstream synthesis.
    pub min_input_size: u64,
}

/// Wave-to-MP3 transcoder backed by the `lame` executable.
#[derive(Debug, Clone)]
pub struct Transcoder {
    binary: String,
    cli: CliRunner,
    scratch: ScratchSpace,
}

impl Transcoder {
    pub fn new(cli: CliRunner, scratch: ScratchSpace) -> Self {
        Self {
            binary: platform::TRANSCODER_BINARY.to_string(),
            cli,
            scratch,
        }
    }

    /// Override the encoder binary. Intended for tests and for hosts that
    /// ship their own `lame` build outside the search path.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Whether the encoder binary can be found on the search path.
    pub fn is_available(&self) -> bool {
        which::which(&self.binary).is_ok()
    }

    /// Encode `input` into an MP3 at `output`.
    ///
    /// `flags` is a whitespace-separated LAME flag string, passed through
    /// verbatim ahead of the file arguments. The encode goes through an
    /// intermediate scratch path and is moved into place only on success.
    pub fn transcode(
        &self,
        input: &Path,
        output: &Path,
        flags: &str,
        require: TranscodeRequire,
    ) -> Result<(), TtsError> {
        if !input.is_file() {
            return Err(TtsError::MissingInput {
                path: input.to_path_buf(),
            });
        }

        let actual = fs::metadata(input).map_err(|e| TtsError::io(input, e))?.len();
        if actual < require.min_input_size {
            return Err(TtsError::InputTooSmall {
                path: input.to_path_buf(),
                actual,
                wanted: require.min_input_size,
            });
        }

        let intermediate = self.scratch.temp_path("mp3");
        debug!(?input, ?intermediate, flags, "encoding stream with LAME");

        let flag_args: Vec<CliArg> = flags.split_whitespace().map(CliArg::from).collect();
        let result = self.cli.run_for_effect([
            CliArg::from(self.binary.as_str()),
            CliArg::Group(flag_args),
            CliArg::from(input),
            CliArg::from(&intermediate),
        ]);

        if let Err(e) = result {
            self.scratch.remove_quietly([&intermediate]);
            return Err(e);
        }

        if !intermediate.is_file() {
            return Err(TtsError::TranscodeFailed {
                flags: flags.to_string(),
            });
        }

        move_file(&intermediate, output)?;
        debug!(?output, "transcoded stream in place");

        Ok(())
    }
}

/// Move `from` to `to`, falling back to copy-and-delete when a rename is
/// not possible (the scratch directory may sit on a different filesystem
/// than the destination).
fn move_file(from: &Path, to: &Path) -> Result<(), TtsError> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }

    if let Err(e) = fs::copy(from, to) {
        // never leave a partial file at the destination
        let _ = fs::remove_file(to);
        return Err(TtsError::io(to, e));
    }
    fs::remove_file(from).map_err(|e| TtsError::io(from, e))
}
