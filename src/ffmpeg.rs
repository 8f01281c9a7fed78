use crate::error::EncodeFailure;
use crate::prelude::*;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

/// Environment variable that overrides the location of the ffmpeg binary
pub(crate) const FFMPEG_ENV_VAR: &str = "STICKERFIT_FFMPEG";

const FFMPEG_BIN: &str = if cfg!(windows) { "ffmpeg.exe" } else { "ffmpeg" };

#[async_trait]
pub trait Ffmpeg: fmt::Debug + Send + Sync {
    /// Invoke ffmpeg process with the given arguments and return its `stdout`.
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, EncodeFailure>;

    /// Same as [`Self::run`], but automatically appends the output path to
    /// the arguments and returns the contents of the file at that path.
    ///
    /// This is useful for mocking to avoid reading files from disk,
    /// especially when they aren't written by the mock.
    async fn run_with_output_file(
        &self,
        args: Vec<String>,
        output_file: &Utf8Path,
    ) -> Result<Vec<u8>, EncodeFailure> {
        let mut args = args;
        args.push(output_file.to_string());

        self.run(args).await?;

        fs::read(output_file)
            .await
            .map_err(|source| EncodeFailure::Output {
                path: output_file.to_owned(),
                source,
            })
    }
}

/// The real ffmpeg binary executed as a child process
#[derive(Debug, Clone)]
pub struct FfmpegProcess {
    program: Utf8PathBuf,
    timeout: Option<Duration>,
}

impl FfmpegProcess {
    pub fn new(program: Utf8PathBuf, timeout: Option<Duration>) -> Self {
        Self { program, timeout }
    }

    /// Finds the ffmpeg binary. The candidates are checked in this order:
    ///
    /// 1. The `explicit` path if it was given
    /// 2. The path from the `STICKERFIT_FFMPEG` environment variable
    /// 3. The binary bundled in the same directory as the current executable
    /// 4. `ffmpeg` from `PATH`
    pub fn resolve(explicit: Option<&Utf8Path>, timeout: Option<Duration>) -> Result<Self> {
        let env = std::env::var(FFMPEG_ENV_VAR).ok();
        let bundled = bundled_ffmpeg();

        let program = resolve_program(explicit, env.as_deref(), bundled.as_deref())?;

        debug!(%program, "Resolved ffmpeg binary");

        Ok(Self::new(program, timeout))
    }

    pub fn program(&self) -> &Utf8Path {
        &self.program
    }
}

#[async_trait]
impl Ffmpeg for FfmpegProcess {
    async fn run(&self, args: Vec<String>) -> Result<Vec<u8>, EncodeFailure> {
        crate::util::cmd::ffmpeg(&self.program, args, self.timeout).await
    }
}

fn bundled_ffmpeg() -> Option<Utf8PathBuf> {
    let exe = std::env::current_exe().ok()?.try_into_utf8().ok()?;
    let bundled = exe.parent()?.join(FFMPEG_BIN);
    bundled.is_file().then_some(bundled)
}

fn resolve_program(
    explicit: Option<&Utf8Path>,
    env: Option<&str>,
    bundled: Option<&Utf8Path>,
) -> Result<Utf8PathBuf> {
    if let Some(explicit) = explicit {
        return Ok(explicit.to_owned());
    }

    if let Some(env) = env.filter(|env| !env.trim().is_empty()) {
        return Ok(Utf8PathBuf::from(env.trim()));
    }

    if let Some(bundled) = bundled {
        return Ok(bundled.to_owned());
    }

    let from_path = which::which(FFMPEG_BIN).with_context(|| {
        format!(
            "Couldn't find `{FFMPEG_BIN}`. Install it, put it into `PATH`, \
            or specify its location via `--ffmpeg` or `{FFMPEG_ENV_VAR}`"
        )
    })?;

    from_path.try_into_utf8()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_wins() {
        let program = resolve_program(
            Some(Utf8Path::new("/opt/ffmpeg")),
            Some("/env/ffmpeg"),
            Some(Utf8Path::new("/bundled/ffmpeg")),
        )
        .unwrap();

        assert_eq!(program, "/opt/ffmpeg");
    }

    #[test]
    fn env_var_beats_bundled() {
        let program = resolve_program(
            None,
            Some("/env/ffmpeg"),
            Some(Utf8Path::new("/bundled/ffmpeg")),
        )
        .unwrap();

        assert_eq!(program, "/env/ffmpeg");
    }

    #[test]
    fn blank_env_var_is_ignored() {
        let program =
            resolve_program(None, Some("  "), Some(Utf8Path::new("/bundled/ffmpeg"))).unwrap();

        assert_eq!(program, "/bundled/ffmpeg");
    }
}
