use crate::prelude::*;
use crate::sticker::{BatchContext, FallbackPolicy, TranscodeConfig, Transcoder};
use async_trait::async_trait;
use clap::Parser;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

/// Convert videos and animations into animated webp stickers using ffmpeg
///
/// The output file will be put into the same directory where the input file
/// is located, but with name `{input_stem}-sticker.webp` by default.
///
/// The converter tries progressively shorter clips and stronger compression
/// until the output fits into the size budget. If it never fits, the most
/// compressed output is saved anyway.
#[derive(Parser, Debug)]
pub struct Convert {
    /// Paths to the input media files or directories with them
    #[clap(required = true)]
    inputs: Vec<Utf8PathBuf>,

    /// Directory where the outputs will be put
    #[clap(long, short)]
    output: Option<Utf8PathBuf>,

    /// Soft limit for the output size, e.g. `1500KiB`, `1.5MiB` or `256k`
    #[clap(long, value_parser = crate::util::byte_size::parse)]
    budget: Option<usize>,

    /// Comma-separated max clip durations to try, from the longest to
    /// the shortest, e.g. `10,8,6`
    #[clap(long, value_delimiter = ',', value_parser = crate::util::duration::parse)]
    durations: Vec<Duration>,

    /// Compression level of the first attempt for every duration (0..=100)
    #[clap(long)]
    quality_start: Option<u32>,

    /// How much the compression level grows with every next attempt
    #[clap(long)]
    quality_step: Option<u32>,

    /// Number of compression levels to try for every duration
    #[clap(long)]
    max_attempts: Option<usize>,

    #[clap(long)]
    fps: Option<u32>,

    /// Side of the square sticker canvas in pixels
    #[clap(long)]
    bounding_box: Option<u32>,

    /// Max time a single ffmpeg invocation may take
    #[clap(long, value_parser = crate::util::duration::parse)]
    timeout: Option<Duration>,

    /// Path to the ffmpeg binary. Falls back to `STICKERFIT_FFMPEG`
    /// environment variable, then to the binary next to this executable,
    /// then to `ffmpeg` from `PATH`
    #[clap(long)]
    ffmpeg: Option<Utf8PathBuf>,

    /// Directory for intermediate files, `./tmp` by default
    #[clap(long)]
    scratch_dir: Option<Utf8PathBuf>,

    /// What to save if nothing fits into the budget
    #[clap(long, value_enum)]
    fallback: Option<FallbackPolicy>,

    /// Max number of inputs converted at the same time.
    /// Defaults to the number of CPU cores.
    #[clap(long)]
    concurrency: Option<NonZeroUsize>,

    /// Replace the output files if they already exist
    #[clap(long)]
    overwrite: bool,
}

#[async_trait]
impl crate::cmd::Cmd for Convert {
    async fn run(self) -> Result {
        let config = TranscodeConfig::builder()
            .durations(self.durations)
            .and_quality_start(self.quality_start)
            .and_quality_step(self.quality_step)
            .and_max_attempts_per_duration(self.max_attempts)
            .and_budget_bytes(self.budget)
            .and_fps(self.fps)
            .and_bounding_box(self.bounding_box)
            .and_fallback(self.fallback)
            .and_codec_path(self.ffmpeg)
            .and_timeout(self.timeout)
            .and_scratch_dir(self.scratch_dir)
            .build()
            .context("Invalid conversion options")?;

        let transcoder = Transcoder::builder().config(config).build()?;

        let batch = BatchContext::builder()
            .inputs(self.inputs)
            .and_output(self.output)
            .and_concurrency(self.concurrency)
            .overwrite(self.overwrite)
            .transcoder(Arc::new(transcoder))
            .build()?;

        // Dropping the batch kills the running ffmpeg processes and removes
        // their scratch files
        tokio::select! {
            ctrlc = tokio::signal::ctrl_c() => {
                ctrlc.context("couldn't Ctrl+C")?;
                bail!("Conversion was interrupted with Ctrl+C");
            }
            outputs = batch.run() => {
                info!("✨ Generated {} sticker(s)", outputs?.len());
            }
        }

        Ok(())
    }
}
