use super::Transcoder;
use crate::prelude::*;
use crate::util::path::Utf8StemmedPathBuf;
use buildstructor::buildstructor;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Converts many inputs at once, each one with its own independent search
pub(crate) struct BatchContext {
    inputs: Vec<Utf8PathBuf>,
    output: Option<Utf8PathBuf>,

    concurrency: NonZeroUsize,
    overwrite: bool,

    transcoder: Arc<Transcoder>,
}

struct Job {
    input: Utf8StemmedPathBuf,
    output: Utf8PathBuf,
}

#[buildstructor]
impl BatchContext {
    #[builder]
    pub(crate) fn new(
        inputs: Vec<Utf8PathBuf>,
        output: Option<Utf8PathBuf>,
        concurrency: Option<NonZeroUsize>,
        overwrite: bool,
        transcoder: Arc<Transcoder>,
    ) -> Result<Self> {
        if inputs.is_empty() {
            bail!("No inputs were specified");
        }

        Ok(Self {
            inputs,
            output,
            concurrency: concurrency.unwrap_or_else(Self::default_concurrency),
            overwrite,
            transcoder,
        })
    }

    fn default_concurrency() -> NonZeroUsize {
        std::thread::available_parallelism().unwrap_or_else(|err| {
            let default = NonZeroUsize::MIN;
            warn!(
                err = &err as &dyn std::error::Error,
                "Failed to query the system's available parallelism. \
                Falling back to the default value of {default}",
            );
            default
        })
    }
}

impl BatchContext {
    async fn input_files(&self) -> Result<Vec<Utf8StemmedPathBuf>> {
        stream::iter(self.inputs.iter().cloned())
            .map(crate::fs::files)
            .buffered(10)
            .try_collect::<Vec<_>>()
            .await?
            .into_iter()
            .flatten()
            .map(TryInto::try_into)
            .try_collect()
    }

    /// Returns the paths of the generated stickers
    pub(crate) async fn run(self) -> Result<Vec<Utf8PathBuf>> {
        let input_files = self.input_files().await?;

        crate::fs::validate_duplicate_input_names(&input_files)?;
        crate::fs::validate_animated_inputs(&input_files)?;

        let jobs: Vec<_> = input_files
            .into_iter()
            .map(|input| {
                let output = self.out_file(input.as_path())?;
                anyhow::Ok(Job { input, output })
            })
            .try_collect()?;

        crate::fs::validate_output_files_overwriting(
            self.overwrite,
            jobs.iter().map(|job| job.output.clone()),
        )?;

        stream::iter(jobs)
            .enumerate()
            .map(|(id, job)| {
                let transcoder = self.transcoder.clone();
                let span = info_span!("task", id = id + 1, input = %job.input.as_path());
                async move { generate_file(&transcoder, job).await }.instrument(span)
            })
            .buffer_unordered(self.concurrency.get())
            .try_collect()
            .await
    }

    fn out_file(&self, input: &Utf8Path) -> Result<Utf8PathBuf> {
        let out_dir = self.output.as_deref().map(Ok).unwrap_or_else(|| {
            input.parent().with_context(|| {
                format!("There is no parent directory for the input file {}", input)
            })
        })?;

        let file_name = input
            .file_stem()
            .with_context(|| format!("Input must have a file name, but got `{input:?}`"))?;

        Ok(out_dir.join(format!("{file_name}-sticker.webp")))
    }
}

async fn generate_file(transcoder: &Transcoder, job: Job) -> Result<Utf8PathBuf> {
    let input = fs::read(job.input.as_path()).await?;

    let bytes = transcoder
        .convert(&input)
        .await
        .with_context(|| format!("Failed to convert `{}`", job.input.as_path()))?;

    fs::write(&job.output, bytes).await?;

    let out_file = nu_ansi_term::Color::Magenta.bold().paint(job.output.as_str());

    info!("🔥 Saved output at {out_file}");

    Ok(job.output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sticker::testing::{self, SharedMockFfmpeg};
    use crate::sticker::TranscodeConfig;

    struct Fixture {
        _temp_dir: tempfile::TempDir,
        dir: Utf8PathBuf,
        transcoder: Arc<Transcoder>,
    }

    fn fixture() -> Fixture {
        let mock = SharedMockFfmpeg::new(|_, input| Some([&b"webp:"[..], input].concat()));
        let (temp_dir, transcoder) = testing::transcoder(TranscodeConfig::default(), mock);
        let dir = Utf8PathBuf::from_path_buf(temp_dir.path().join("videos")).unwrap();
        std::fs::create_dir_all(&dir).unwrap();

        Fixture {
            _temp_dir: temp_dir,
            dir,
            transcoder: Arc::new(transcoder),
        }
    }

    #[test_log::test(tokio::test)]
    async fn converts_every_file_in_a_directory() {
        let fixture = fixture();

        for name in ["a.mp4", "b.gif"] {
            fs::write(fixture.dir.join(name), name).await.unwrap();
        }

        let mut outputs = BatchContext::builder()
            .input(fixture.dir.clone())
            .overwrite(false)
            .concurrency(NonZeroUsize::new(2).unwrap())
            .transcoder(fixture.transcoder.clone())
            .build()
            .unwrap()
            .run()
            .await
            .unwrap();

        outputs.sort();

        assert_eq!(
            outputs,
            [
                fixture.dir.join("a-sticker.webp"),
                fixture.dir.join("b-sticker.webp")
            ]
        );

        assert_eq!(fs::read(&outputs[0]).await.unwrap(), b"webp:a.mp4");
        assert_eq!(fs::read(&outputs[1]).await.unwrap(), b"webp:b.gif");
    }

    #[test_log::test(tokio::test)]
    async fn output_dir_and_overwrite() {
        let fixture = fixture();

        let input = fixture.dir.join("clip.webm");
        fs::write(&input, "clip").await.unwrap();

        let out_dir = fixture.dir.join("out");
        fs::create_dir_all(&out_dir).await.unwrap();
        fs::write(out_dir.join("clip-sticker.webp"), "old").await.unwrap();

        let batch = |overwrite| {
            BatchContext::builder()
                .input(input.clone())
                .output(out_dir.clone())
                .overwrite(overwrite)
                .transcoder(fixture.transcoder.clone())
                .build()
                .unwrap()
        };

        let err = batch(false).run().await.unwrap_err();
        assert!(err.to_string().contains("already exist"), "{err:?}");

        batch(true).run().await.unwrap();

        let output = fs::read(out_dir.join("clip-sticker.webp")).await.unwrap();
        assert_eq!(output, b"webp:clip");
    }

    #[test_log::test(tokio::test)]
    async fn static_images_are_rejected() {
        let fixture = fixture();

        let input = fixture.dir.join("photo.png");
        fs::write(&input, "png").await.unwrap();

        let err = BatchContext::builder()
            .input(input)
            .overwrite(false)
            .transcoder(fixture.transcoder.clone())
            .build()
            .unwrap()
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("not videos or animations"), "{err:?}");
    }
}
