use super::args::encode_args;
use super::{AttemptResult, ParameterPair, TranscodeConfig};
use crate::display;
use crate::error::{ConversionFailure, EncodeFailure};
use crate::ffmpeg::{Ffmpeg, FfmpegProcess};
use crate::prelude::*;
use crate::scratch::{ScratchDir, ScratchPair};
use buildstructor::buildstructor;
use std::sync::Arc;
use std::time::Instant;

/// Searches for the longest and the least compressed animated webp sticker
/// that fits into the size budget.
///
/// A single instance may serve any number of concurrent conversions. Each of
/// them gets its own scratch files and runs its attempts strictly one after
/// another.
#[derive(Debug, Clone)]
pub struct Transcoder {
    config: Arc<TranscodeConfig>,
    ffmpeg: Arc<dyn Ffmpeg>,
    scratch: ScratchDir,
}

#[buildstructor]
impl Transcoder {
    /// If `ffmpeg` or `scratch` aren't given they are derived from the config,
    /// see [`FfmpegProcess::resolve`] and [`ScratchDir::in_current_dir`].
    #[builder]
    pub fn new(
        config: TranscodeConfig,
        ffmpeg: Option<Arc<dyn Ffmpeg>>,
        scratch: Option<ScratchDir>,
    ) -> Result<Self> {
        let ffmpeg = match ffmpeg {
            Some(ffmpeg) => ffmpeg,
            None => Arc::new(FfmpegProcess::resolve(
                config.codec_path(),
                config.timeout(),
            )?),
        };

        let scratch = match (scratch, config.scratch_dir()) {
            (Some(scratch), _) => scratch,
            (None, Some(dir)) => ScratchDir::new(dir),
            (None, None) => ScratchDir::in_current_dir()?,
        };

        Ok(Self {
            config: Arc::new(config),
            ffmpeg,
            scratch,
        })
    }
}

impl Transcoder {
    pub fn config(&self) -> &TranscodeConfig {
        &self.config
    }

    /// Same as [`Self::convert_with_budget`] with the budget from the config
    pub async fn convert(&self, input: &[u8]) -> Result<Arc<[u8]>, ConversionFailure> {
        self.convert_with_budget(input, self.config.budget_bytes()).await
    }

    /// Converts the input video or animation into an animated webp sticker.
    ///
    /// The budget is soft. If none of the attempts fit into it, the output
    /// chosen by the configured [`super::FallbackPolicy`] is returned anyway.
    /// An error is returned only if the input couldn't be persisted or none
    /// of the attempts produced anything at all.
    #[instrument(
        name = "convert",
        skip_all,
        fields(input = %display::human_size(input.len()))
    )]
    pub async fn convert_with_budget(
        &self,
        input: &[u8],
        budget_bytes: usize,
    ) -> Result<Arc<[u8]>, ConversionFailure> {
        let scratch = self.scratch.allocate().await.map_err(|source| {
            ConversionFailure::PersistInput {
                path: self.scratch.path().to_owned(),
                source,
            }
        })?;

        // If anything below bails or panics the scratch files are removed on drop
        scratch.write_input(input).await?;

        let result = self.search(&scratch, budget_bytes).await;

        scratch.release();

        result.map(|attempt| attempt.output)
    }

    async fn search(
        &self,
        scratch: &ScratchPair,
        budget_bytes: usize,
    ) -> Result<AttemptResult, ConversionFailure> {
        let start = Instant::now();
        let budget_display = &display::bold_human_size(budget_bytes);

        info!("🚀 Trying to fit the sticker into {budget_display}");

        let fallback = self.config.fallback();

        let mut best: Option<AttemptResult> = None;
        let mut last_failure: Option<EncodeFailure> = None;
        let mut attempts = 0;

        for pair in self.config.parameter_grid() {
            attempts += 1;

            let output = match self.attempt(scratch, pair, budget_bytes).await {
                Ok(output) => output,
                Err(err) => {
                    // The codec is deterministic, so retrying the same
                    // parameters is pointless, but the next ones may work
                    warn!(
                        err = &err as &dyn std::error::Error,
                        %pair,
                        "❌ Encoding failed, moving on to the next parameters"
                    );
                    last_failure = Some(err);
                    continue;
                }
            };

            let attempt = AttemptResult { pair, output };

            if attempt.output.len() <= budget_bytes {
                let elapsed = display::elapsed(start);
                let size = display::bold_human_size(attempt.output.len());
                let pair = display::bold(&attempt.pair);

                info!("🎉 Found fitting parameters {pair}, which generate {size} in {elapsed}");
                return Ok(attempt);
            }

            best = Some(fallback.pick(best, attempt));
        }

        let Some(best) = best else {
            return Err(ConversionFailure::Exhausted {
                attempts,
                last: last_failure,
            });
        };

        let size = display::bold_human_size(best.output.len());
        let pair = display::bold(&best.pair);

        warn!(
            %fallback,
            "⚠️ Couldn't fit into {budget_display}, falling back to the output of \
            {pair}, which is {size}"
        );

        Ok(best)
    }

    async fn attempt(
        &self,
        scratch: &ScratchPair,
        pair: ParameterPair,
        budget_bytes: usize,
    ) -> Result<Arc<[u8]>, EncodeFailure> {
        let start = Instant::now();

        let args = encode_args(&self.config, scratch.input(), pair);

        let output = self
            .ffmpeg
            .run_with_output_file(args, scratch.output())
            .await?;

        let output = Arc::<[_]>::from(output);

        let elapsed = display::elapsed(start);

        let (checkbox, color) = if output.len() > budget_bytes {
            ('❌', nu_ansi_term::Color::Red)
        } else {
            ('✅', nu_ansi_term::Color::Green)
        };

        let size_display = color.bold().paint(display::human_size(output.len()));

        info!(
            "{checkbox} {} generated {size_display} in {elapsed}",
            display::bold(&pair)
        );

        Ok(output)
    }
}
