//! Transient files that live only for the duration of a single conversion.
//!
//! Every conversion gets its own pair of files with a random token in their
//! names, so concurrent conversions sharing the same directory never collide
//! and don't need any locking.

use crate::error::ConversionFailure;
use crate::prelude::*;
use std::io;

/// Directory where scratch files are allocated
#[derive(Debug, Clone)]
pub struct ScratchDir {
    path: Utf8PathBuf,
}

impl ScratchDir {
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `tmp` directory under the current working directory
    pub fn in_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to get the current directory")?;
        let cwd = cwd.try_into_utf8()?;

        Ok(Self::new(cwd.join("tmp")))
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Creates the directory if it doesn't exist yet and reserves a pair of
    /// unique file names in it. The files themselves aren't created.
    pub async fn allocate(&self) -> io::Result<ScratchPair> {
        fs::create_dir_all(&self.path).await?;

        let token = uuid::Uuid::new_v4().simple();

        Ok(ScratchPair {
            input: self.path.join(format!("in_{token}.bin")),
            output: self.path.join(format!("out_{token}.webp")),
            released: false,
        })
    }
}

/// Input and output files of one conversion.
///
/// Both files are removed when the pair is released or dropped, whichever
/// happens first, so they are cleaned up on every exit path.
#[derive(Debug)]
pub struct ScratchPair {
    input: Utf8PathBuf,
    output: Utf8PathBuf,
    released: bool,
}

impl ScratchPair {
    pub fn input(&self) -> &Utf8Path {
        &self.input
    }

    pub fn output(&self) -> &Utf8Path {
        &self.output
    }

    pub(crate) async fn write_input(&self, bytes: &[u8]) -> Result<(), ConversionFailure> {
        fs::write(&self.input, bytes)
            .await
            .map_err(|source| ConversionFailure::PersistInput {
                path: self.input.clone(),
                source,
            })
    }

    /// Removes both files. Failures are logged and otherwise ignored
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if std::mem::replace(&mut self.released, true) {
            return;
        }

        for path in [&self.input, &self.output] {
            remove_file(path);
        }
    }
}

impl Drop for ScratchPair {
    fn drop(&mut self) {
        self.release_once();
    }
}

fn remove_file(path: &Utf8Path) {
    match fs_err::remove_file(path) {
        Ok(()) => debug!(%path, "Removed scratch file"),
        // The file was never written or someone else already removed it
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => warn!(
            err = &err as &dyn std::error::Error,
            "CleanupFailure: couldn't remove scratch file"
        ),
    }
}
