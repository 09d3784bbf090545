//! The service contract and its shared runtime context.
//!
//! A service is one speech backend (a host synthesizer CLI, a web API).
//! Every service implements [`Service`] and receives a [`ServiceContext`]
//! carrying the shared plumbing: scratch space, CLI runner, HTTP fetcher,
//! and transcoder. The context is the only way services touch the
//! filesystem, the network, or external processes, which keeps each
//! backend down to its actual protocol.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use crate::cli::{CliArg, CliRunner};
use crate::errors::TtsError;
use crate::net::{FetchRequire, NetFetcher, WebTarget};
use crate::options::ServiceOption;
use crate::scratch::ScratchSpace;
use crate::transcode::{TranscodeRequire, Transcoder};

/// Capability traits a service can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceTrait {
    /// Synthesis happens over the network.
    Internet,
    /// The service emits a non-MP3 stream that must be transcoded.
    Transcoding,
    /// The service depends on separately installed voice data.
    DictionaryInstall,
}

/// Source of the LAME flag string, resolved at call time so configuration
/// changes apply without rebuilding the context.
pub type LameFlagsFn = Arc<dyn Fn() -> String + Send + Sync>;

/// Host-level text normalization applied before a service's own
/// [`Service::modify`] pass.
pub type NormalizeFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Shared plumbing handed to every service.
#[derive(Clone)]
pub struct ServiceContext {
    scratch: ScratchSpace,
    cli: CliRunner,
    net: Arc<NetFetcher>,
    transcoder: Transcoder,
    lame_flags: LameFlagsFn,
    normalize: NormalizeFn,
}

impl ServiceContext {
    /// Build a context rooted at `temp_dir`.
    pub fn new(
        temp_dir: impl Into<PathBuf>,
        lame_flags: LameFlagsFn,
        normalize: NormalizeFn,
    ) -> Result<Self, TtsError> {
        let scratch = ScratchSpace::new(temp_dir)?;
        let cli = CliRunner::new();
        let transcoder = Transcoder::new(cli.clone(), scratch.clone());
        Ok(Self {
            scratch,
            cli,
            net: Arc::new(NetFetcher::new()),
            transcoder,
            lame_flags,
            normalize,
        })
    }

    /// Run an external tool for its side effects.
    pub fn cli_call(&self, args: impl IntoIterator<Item = CliArg>) -> Result<(), TtsError> {
        self.cli.run_for_effect(args)
    }

    /// Run an external tool and capture its standard output as lines.
    pub fn cli_output(
        &self,
        args: impl IntoIterator<Item = CliArg>,
    ) -> Result<Vec<String>, TtsError> {
        self.cli.run_for_output(args)
    }

    /// Run an external tool leniently, merging stderr and ignoring the
    /// exit status.
    pub fn cli_output_lenient(
        &self,
        args: impl IntoIterator<Item = CliArg>,
    ) -> Result<Vec<String>, TtsError> {
        self.cli.run_for_output_lenient(args)
    }

    /// Transcode `input` into an MP3 at `output` using the configured
    /// LAME flags.
    pub fn cli_transcode(
        &self,
        input: &Path,
        output: &Path,
        require: TranscodeRequire,
    ) -> Result<(), TtsError> {
        let flags = (self.lame_flags)();
        self.transcoder.transcode(input, output, &flags, require)
    }

    /// Fetch one or more web targets and write the concatenated payloads
    /// to `path`.
    pub fn net_download(
        &self,
        path: &Path,
        targets: &[WebTarget],
        require: &FetchRequire,
    ) -> Result<(), TtsError> {
        self.net.download(path, targets, require)
    }

    /// Downloads issued since the counter was last reset.
    pub fn download_count(&self) -> usize {
        self.net.download_count()
    }

    /// Reset the download counter, typically at the start of a batch.
    pub fn reset_download_count(&self) {
        self.net.reset_download_count()
    }

    /// Reserve a fresh scratch path with the given extension.
    pub fn path_temp(&self, extension: &str) -> PathBuf {
        self.scratch.temp_path(extension)
    }

    /// Delete scratch files, logging failures instead of raising.
    pub fn path_unlink<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.scratch.remove_quietly(paths)
    }

    /// Write `text` to a fresh scratch file for tools that take a file
    /// argument.
    pub fn path_input(&self, text: &str) -> Result<PathBuf, TtsError> {
        self.scratch.write_text_input(text)
    }

    /// Write `text` to a scratch file when it cannot safely cross the
    /// process-argument boundary on this platform.
    pub fn path_workaround(&self, text: &str) -> Result<Option<PathBuf>, TtsError> {
        self.scratch.ascii_workaround(text)
    }

    /// Apply the host's text normalization pass.
    pub fn normalize(&self, text: &str) -> String {
        (self.normalize)(text)
    }

    /// Read a string value from the HKEY_LOCAL_MACHINE registry hive.
    /// Services use this to locate tools that install outside the search
    /// path.
    #[cfg(windows)]
    pub fn reg_hklm(&self, subkey: &str, name: &str) -> Result<String, TtsError> {
        use winreg::RegKey;
        use winreg::enums::HKEY_LOCAL_MACHINE;

        let key = RegKey::predef(HKEY_LOCAL_MACHINE)
            .open_subkey(subkey)
            .map_err(|e| TtsError::io(subkey, e))?;
        key.get_value(name).map_err(|e| TtsError::io(subkey, e))
    }
}

/// Contract every speech backend implements.
pub trait Service {
    /// Short machine name, unique within a registry.
    fn name(&self) -> &str;

    /// Capability traits this service declares. Must be non-empty.
    fn traits(&self) -> &[ServiceTrait];

    /// One-line description of the backend, including anything probed
    /// from the local installation.
    fn describe(&self) -> String;

    /// Descriptors for the options [`run`](Self::run) accepts.
    fn options(&self) -> Vec<ServiceOption>;

    /// Service-specific text adjustment, applied after host
    /// normalization. The default passes text through unchanged.
    fn modify(&self, text: &str) -> String {
        text.to_string()
    }

    /// Synthesize `text` into an MP3 at `path` using fully resolved
    /// `options`.
    fn run(
        &self,
        text: &str,
        options: &HashMap<String, String>,
        path: &Path,
    ) -> Result<(), TtsError>;
}
