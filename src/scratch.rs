//! Scratch-file management for intermediate audio and text artifacts.
//!
//! Services produce intermediate files constantly (raw wave output,
//! pre-concatenation MP3 segments, input-text workaround files), and all
//! of them are throwaway. [`ScratchSpace`] hands out collision-resistant
//! paths inside one designated directory and cleans up quietly, so a
//! failed run never aborts on cleanup.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::{debug, warn};

use crate::errors::TtsError;
use crate::platform::{self, OsFamily};

const RANDOM_SUFFIX_LEN: usize = 30;

/// Allocator of temporary file paths under a single scratch directory.
#[derive(Debug, Clone)]
pub struct ScratchSpace {
    root: PathBuf,
}

impl ScratchSpace {
    /// Create a scratch space rooted at `root`. The directory is created
    /// if it does not already exist.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, TtsError> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| TtsError::io(&root, e))?;
        Ok(Self { root })
    }

    /// The directory this scratch space allocates under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reserve a fresh path with the given extension (without the dot).
    ///
    /// The filename combines the current time with thirty random lowercase
    /// alphanumerics, so concurrent allocations and repeated runs do not
    /// collide. No file is created; the path is just guaranteed unique
    /// for practical purposes.
    pub fn temp_path(&self, extension: &str) -> PathBuf {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let mut rng = rand::thread_rng();
        let suffix: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| {
                const POOL: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
                POOL[rng.gen_range(0..POOL.len())] as char
            })
            .collect();

        self.root.join(format!("{secs:x}-{suffix}.{extension}"))
    }

    /// Delete the given files, logging failures instead of raising.
    ///
    /// Cleanup runs on every exit path, including error paths where the
    /// file may never have been created, so a missing file is routine.
    pub fn remove_quietly<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            let path = path.as_ref();
            match fs::remove_file(path) {
                Ok(()) => debug!(?path, "removed scratch file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(?path, "scratch file already gone");
                }
                Err(e) => warn!(?path, error = %e, "could not remove scratch file"),
            }
        }
    }

    /// Write `text` to a fresh UTF-8 scratch file and return its path.
    ///
    /// Useful for tools that read their input from a file rather than
    /// from the command line.
    pub fn write_text_input(&self, text: &str) -> Result<PathBuf, TtsError> {
        let path = self.temp_path("txt");
        fs::write(&path, text).map_err(|e| TtsError::io(&path, e))?;
        debug!(?path, bytes = text.len(), "wrote input text to scratch file");
        Ok(path)
    }

    /// Work around Windows argument-passing limits for non-ASCII text.
    ///
    /// Arguments cross the Windows process boundary through the system
    /// codepage, which mangles anything outside it. When that applies,
    /// the text is written to a scratch file and `Some(path)` is
    /// returned; callers then pass the file instead of the raw text.
    /// Returns `None` when the text is safe to pass directly.
    pub fn ascii_workaround(&self, text: &str) -> Result<Option<PathBuf>, TtsError> {
        if !needs_workaround(platform::OS_FAMILY, text) {
            return Ok(None);
        }
        self.write_text_input(text).map(Some)
    }
}

fn needs_workaround(os: OsFamily, text: &str) -> bool {
    os == OsFamily::Windows && !text.is_ascii()
}
