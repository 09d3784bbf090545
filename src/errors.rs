use std::path::PathBuf;

/// Errors that can occur during TTS operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// A service was registered without a name or without any capability
    /// traits. This is a programmer error, fatal at construction.
    #[error("service declaration is incomplete: {reason}")]
    MissingDeclaration {
        /// What is missing from the declaration.
        reason: String,
    },

    /// The service cannot run on this machine.
    #[error("{service} cannot be used here: {reason}")]
    UnsupportedEnvironment {
        /// The service that refused to initialize.
        service: String,
        /// Description of what the probe found (or failed to find).
        reason: String,
    },

    /// An external tool exited with a non-zero status.
    #[error("`{program}` exited with {status}: {stderr}")]
    ProcessFailed {
        /// The program that was invoked.
        program: String,
        /// The exit status, as reported by the OS.
        status: String,
        /// Captured standard error, if any.
        stderr: String,
    },

    /// A CLI invocation was built with no program name.
    #[error("cannot invoke an external tool without a program name")]
    EmptyInvocation,

    /// The external tool's executable could not be found.
    #[error("unable to find `{program}`; it might not be installed")]
    ToolNotFound {
        /// The program that could not be located.
        program: String,
    },

    /// An external tool produced no usable output.
    #[error("`{program}` returned {detail}")]
    EmptyOutput {
        /// The program that was invoked.
        program: String,
        /// Either "no output" or "only whitespace".
        detail: &'static str,
    },

    /// The input file handed to the transcoder does not exist.
    #[error("transcoder input {path:?} could not be found")]
    MissingInput {
        /// The missing input path.
        path: PathBuf,
    },

    /// The input file handed to the transcoder is suspiciously small,
    /// usually meaning the upstream producer rejected the text.
    #[error(
        "transcoder input {path:?} was a {actual}-byte stream; wanted {wanted}+ bytes \
         (the service might not have liked your input text)"
    )]
    InputTooSmall {
        /// The undersized input path.
        path: PathBuf,
        /// Its actual size in bytes.
        actual: u64,
        /// The minimum acceptable size in bytes.
        wanted: u64,
    },

    /// The transcoder exited cleanly but produced no output file.
    #[error("transcoding the audio stream failed; are the flags you specified ({flags}) okay?")]
    TranscodeFailed {
        /// The transcoder flags in effect, for diagnosability.
        flags: String,
    },

    /// A web request produced no response at all.
    #[error("no response for {desc} to {url}: {reason}")]
    NoResponse {
        /// Which request this was ("web request", "web request (2 of 3)").
        desc: String,
        /// The address that was fetched.
        url: String,
        /// The underlying transport failure.
        reason: String,
    },

    /// A web request returned a non-200 status code.
    #[error("got {status} status for {desc} to {url}; wanted 200")]
    HttpStatus {
        /// Which request this was.
        desc: String,
        /// The address that was fetched.
        url: String,
        /// The status code that came back.
        status: u16,
    },

    /// A web request returned an unexpected Content-Type.
    #[error("{desc} to {url} got {got} Content-Type; wanted {wanted}")]
    ContentType {
        /// Which request this was.
        desc: String,
        /// The address that was fetched.
        url: String,
        /// The declared Content-Type that came back.
        got: String,
        /// The Content-Type the caller required.
        wanted: String,
    },

    /// A web request returned fewer bytes than the caller required.
    #[error("{desc} to {url} got a {actual}-byte stream; wanted {wanted}+ bytes")]
    PayloadTooSmall {
        /// Which request this was.
        desc: String,
        /// The address that was fetched.
        url: String,
        /// The payload size that came back.
        actual: u64,
        /// The minimum acceptable size in bytes.
        wanted: u64,
    },

    /// A required option was not supplied and has no default.
    #[error("{service} requires the '{key}' option")]
    MissingOption {
        /// The service whose descriptor list was being resolved.
        service: String,
        /// The descriptor key with no value and no default.
        key: String,
    },

    /// A supplied option value failed validation against its descriptor.
    #[error("'{value}' is not a valid '{key}' value for {service}: {reason}")]
    InvalidOption {
        /// The service whose descriptor list was being resolved.
        service: String,
        /// The offending descriptor key.
        key: String,
        /// The value after normalization.
        value: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A filesystem operation failed.
    #[error("I/O failure on {path:?}")]
    Io {
        /// The path being read or written.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl TtsError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TtsError::Io {
            path: path.into(),
            source,
        }
    }
}
