use crate::prelude::*;
use easy_ext::ext;
use std::path::PathBuf;

#[ext(PathBufExt)]
pub(crate) impl PathBuf {
    fn try_into_utf8(self) -> Result<Utf8PathBuf> {
        Utf8PathBuf::from_path_buf(self)
            .map_err(|path| anyhow::anyhow!("Path is not valid UTF-8: {path:?}"))
    }
}

/// UTF-8 path that is guaranteed to have a file stem, which is used to derive
/// the name of the output sticker
#[derive(Debug, Clone)]
pub(crate) struct Utf8StemmedPathBuf(Utf8PathBuf);

impl TryFrom<Utf8PathBuf> for Utf8StemmedPathBuf {
    type Error = anyhow::Error;

    fn try_from(value: Utf8PathBuf) -> Result<Self> {
        value
            .file_stem()
            .with_context(|| format!("Path has no file stem: {value:?}"))?;

        Ok(Self(value))
    }
}

impl Utf8StemmedPathBuf {
    pub(crate) fn file_stem(&self) -> &str {
        self.0.file_stem().unwrap_or_default()
    }

    pub(crate) fn as_path(&self) -> &Utf8Path {
        self.0.as_path()
    }
}
