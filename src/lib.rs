mod cmd;
mod display;
mod error;
mod ffmpeg;
mod fs;
mod scratch;
mod sticker;
mod util;

pub use error::{ConversionFailure, EncodeFailure};
pub use ffmpeg::{Ffmpeg, FfmpegProcess};
pub use scratch::{ScratchDir, ScratchPair};
pub use sticker::{FallbackPolicy, MediaKind, ParameterPair, TranscodeConfig, Transcoder};

use clap::Parser;
use cmd::Cmd;

mod prelude {
    pub(crate) use crate::util::path::PathBufExt as _;
    pub(crate) use anyhow::{bail, ensure, Context as _};
    pub(crate) use camino::{Utf8Path, Utf8PathBuf};
    pub(crate) use fs_err::tokio as fs;
    pub(crate) use futures::prelude::*;
    pub(crate) use itertools::Itertools as _;
    pub(crate) use tracing::{debug, info, info_span, instrument, warn, Instrument as _};

    pub(crate) type Result<T = (), E = anyhow::Error> = std::result::Result<T, E>;
}

/// Converts videos, GIFs and other animations into size-limited animated
/// webp stickers
#[derive(Parser, Debug)]
#[command(version)]
enum Args {
    Convert(cmd::Convert),
}

pub async fn run() -> anyhow::Result<()> {
    match Args::parse() {
        Args::Convert(cmd) => cmd.run().await,
    }
}
