//! Static, process-wide platform facts.
//!
//! Everything here is detected once from `cfg` at compile time and passed
//! down; nothing in this module is mutable state.

use crate::cli::Decoding;

/// Operating-system family the process is running under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Linux,
    MacOs,
    Windows,
    Other,
}

#[cfg(target_os = "linux")]
pub const OS_FAMILY: OsFamily = OsFamily::Linux;
#[cfg(target_os = "macos")]
pub const OS_FAMILY: OsFamily = OsFamily::MacOs;
#[cfg(target_os = "windows")]
pub const OS_FAMILY: OsFamily = OsFamily::Windows;
#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
pub const OS_FAMILY: OsFamily = OsFamily::Other;

/// Name of the LAME transcoder executable on this platform.
#[cfg(target_os = "windows")]
pub const TRANSCODER_BINARY: &str = "lame.exe";
/// Name of the LAME transcoder executable on this platform.
#[cfg(not(target_os = "windows"))]
pub const TRANSCODER_BINARY: &str = "lame";

/// Process-creation flag that keeps the console window hidden on Windows
/// (`CREATE_NO_WINDOW`). External tools are invoked with this flag so that
/// a GUI host application does not flash command windows at the user.
#[cfg(target_os = "windows")]
pub const PROCESS_CREATION_FLAGS: u32 = 0x0800_0000;

/// Candidate decodings for captured CLI output, tried in order.
///
/// Windows appends the system codepage since localized tools there often
/// emit Windows-1252 rather than UTF-8.
pub fn cli_decodings() -> &'static [Decoding] {
    #[cfg(target_os = "windows")]
    {
        &[
            Decoding::Ascii,
            Decoding::Utf8,
            Decoding::Latin1,
            Decoding::Windows1252,
        ]
    }
    #[cfg(not(target_os = "windows"))]
    {
        &[Decoding::Ascii, Decoding::Utf8, Decoding::Latin1]
    }
}
