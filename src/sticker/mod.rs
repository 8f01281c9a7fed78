mod args;
mod batch;
mod media;
mod transcoder;

#[cfg(test)]
mod testing;

use crate::prelude::*;
use crate::util::byte_size::KIB;
use buildstructor::buildstructor;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

pub(crate) use batch::BatchContext;
pub use media::MediaKind;
pub use transcoder::Transcoder;

/// WhatsApp refuses animated stickers bigger than this
const MAX_STICKER_BYTES: usize = 1500 * KIB;

/// Animated stickers must be exactly this many pixels on each side
const STICKER_BOUNDING_BOX: u32 = 512;

const STICKER_FPS: u32 = 30;

/// Longest clips go first, every next one is shorter and thus smaller
const DURATIONS_SECS: [u64; 6] = [10, 8, 6, 5, 4, 3];

const QUALITY_START: u32 = 50;
const QUALITY_STEP: u32 = 10;
const MAX_ATTEMPTS_PER_DURATION: usize = 4;

/// Max value of the compression level. The level is mapped to webp's `-q:v`
/// as `MAX_QUALITY - level`.
pub(crate) const MAX_QUALITY: u32 = 100;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// What to return when none of the attempts fit into the budget
#[derive(strum::Display, clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[strum(serialize_all = "kebab-case")]
pub enum FallbackPolicy {
    /// The output of the last attempt, which is the shortest and the most
    /// compressed one
    #[default]
    Last,

    /// The smallest output among all attempts
    Smallest,
}

impl FallbackPolicy {
    fn pick(self, best: Option<AttemptResult>, next: AttemptResult) -> AttemptResult {
        match (self, best) {
            (Self::Smallest, Some(best)) if best.output.len() <= next.output.len() => best,
            _ => next,
        }
    }
}

/// One point of the search grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParameterPair {
    /// Max length of the clip
    pub duration: Duration,

    /// Compression level. The higher it is the smaller the output
    pub quality: u32,
}

impl fmt::Display for ParameterPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s@q{}", self.duration.as_secs_f64(), self.quality)
    }
}

/// Output of a single codec invocation
#[derive(Debug, Clone)]
struct AttemptResult {
    pair: ParameterPair,
    output: Arc<[u8]>,
}

#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    durations: Vec<Duration>,
    quality_start: u32,
    quality_step: u32,
    max_attempts_per_duration: usize,
    budget_bytes: usize,

    fps: u32,
    bounding_box: u32,
    fallback: FallbackPolicy,

    codec_path: Option<Utf8PathBuf>,
    timeout: Option<Duration>,
    scratch_dir: Option<Utf8PathBuf>,
}

impl Default for TranscodeConfig {
    fn default() -> Self {
        Self {
            durations: DURATIONS_SECS.map(Duration::from_secs).to_vec(),
            quality_start: QUALITY_START,
            quality_step: QUALITY_STEP,
            max_attempts_per_duration: MAX_ATTEMPTS_PER_DURATION,
            budget_bytes: MAX_STICKER_BYTES,
            fps: STICKER_FPS,
            bounding_box: STICKER_BOUNDING_BOX,
            fallback: FallbackPolicy::default(),
            codec_path: None,
            timeout: Some(DEFAULT_TIMEOUT),
            scratch_dir: None,
        }
    }
}

#[buildstructor]
impl TranscodeConfig {
    /// Every option that isn't specified takes its default value. An empty
    /// list of durations also means the default list.
    #[builder]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        durations: Vec<Duration>,
        quality_start: Option<u32>,
        quality_step: Option<u32>,
        max_attempts_per_duration: Option<usize>,
        budget_bytes: Option<usize>,

        fps: Option<u32>,
        bounding_box: Option<u32>,
        fallback: Option<FallbackPolicy>,

        codec_path: Option<Utf8PathBuf>,
        timeout: Option<Duration>,
        scratch_dir: Option<Utf8PathBuf>,
    ) -> Result<Self> {
        let default = Self::default();

        let config = Self {
            durations: if durations.is_empty() {
                default.durations
            } else {
                durations
            },
            quality_start: quality_start.unwrap_or(default.quality_start),
            quality_step: quality_step.unwrap_or(default.quality_step),
            max_attempts_per_duration: max_attempts_per_duration
                .unwrap_or(default.max_attempts_per_duration),
            budget_bytes: budget_bytes.unwrap_or(default.budget_bytes),
            fps: fps.unwrap_or(default.fps),
            bounding_box: bounding_box.unwrap_or(default.bounding_box),
            fallback: fallback.unwrap_or_default(),
            codec_path,
            timeout: timeout.or(default.timeout),
            scratch_dir,
        };

        config.validate()?;

        Ok(config)
    }
}

impl TranscodeConfig {
    fn validate(&self) -> Result {
        if let Some(zero) = self.durations.iter().find(|duration| duration.is_zero()) {
            bail!("Durations must be positive, but got {zero:?}");
        }

        let descending = self.durations.iter().tuple_windows().all(|(a, b)| a > b);
        ensure!(
            descending,
            "Durations must be strictly descending, but got {:?}",
            self.durations
        );

        ensure!(
            self.max_attempts_per_duration > 0,
            "There must be at least one attempt per duration"
        );
        ensure!(
            self.quality_start <= MAX_QUALITY,
            "Start quality must be in range 0..={MAX_QUALITY}, but got {}",
            self.quality_start
        );

        // Identical levels would rerun the very same codec invocation
        ensure!(
            self.max_attempts_per_duration == 1 || self.quality_step > 0,
            "Quality step must be positive when there are several attempts per duration"
        );

        let last_quality = u32::try_from(self.max_attempts_per_duration - 1)
            .ok()
            .and_then(|steps| steps.checked_mul(self.quality_step))
            .and_then(|escalation| escalation.checked_add(self.quality_start))
            .filter(|&last| last <= MAX_QUALITY);

        ensure!(
            last_quality.is_some(),
            "The last quality level must not exceed {MAX_QUALITY}, but {} attempts \
            starting at {} with the step of {} go beyond it",
            self.max_attempts_per_duration,
            self.quality_start,
            self.quality_step,
        );

        ensure!(self.budget_bytes > 0, "Size budget must be positive");
        ensure!(self.fps > 0, "FPS must be positive");
        ensure!(self.bounding_box > 0, "Bounding box must be positive");

        if let Some(timeout) = self.timeout {
            ensure!(!timeout.is_zero(), "Timeout must be positive");
        }

        Ok(())
    }

    /// All parameter pairs in the order they are tried: durations from the
    /// longest to the shortest, and for each of them the compression level
    /// escalating from the mildest one.
    pub fn parameter_grid(&self) -> impl Iterator<Item = ParameterPair> + '_ {
        self.durations.iter().flat_map(move |&duration| {
            (0..self.max_attempts_per_duration).map(move |attempt| {
                let escalation = u32::try_from(attempt)
                    .unwrap_or(u32::MAX)
                    .saturating_mul(self.quality_step);

                ParameterPair {
                    duration,
                    quality: self.quality_start.saturating_add(escalation),
                }
            })
        })
    }

    pub fn budget_bytes(&self) -> usize {
        self.budget_bytes
    }

    pub fn fallback(&self) -> FallbackPolicy {
        self.fallback
    }

    pub fn codec_path(&self) -> Option<&Utf8Path> {
        self.codec_path.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn scratch_dir(&self) -> Option<&Utf8Path> {
        self.scratch_dir.as_deref()
    }

    pub(crate) fn fps(&self) -> u32 {
        self.fps
    }

    pub(crate) fn bounding_box(&self) -> u32 {
        self.bounding_box
    }
}
