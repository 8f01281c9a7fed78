use super::{ParameterPair, TranscodeConfig, Transcoder, MAX_QUALITY};
use crate::error::EncodeFailure;
use crate::ffmpeg::Ffmpeg;
use crate::prelude::*;
use crate::scratch::ScratchDir;
use async_trait::async_trait;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Decides what the mock produces for the given parameters and input bytes.
/// `None` simulates a crashed ffmpeg process.
pub(crate) type Respond = fn(ParameterPair, &[u8]) -> Option<Vec<u8>>;

#[derive(Debug)]
pub(crate) struct SharedMockFfmpeg {
    respond: Respond,
    log: Mutex<MockLog>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct MockLog {
    pub(crate) pairs: Vec<ParameterPair>,
    pub(crate) inputs: Vec<Utf8PathBuf>,
    pub(crate) outputs: Vec<Utf8PathBuf>,
}

impl SharedMockFfmpeg {
    pub(crate) fn new(respond: Respond) -> Arc<Self> {
        Arc::new(Self {
            respond,
            log: Default::default(),
        })
    }

    pub(crate) fn log(&self) -> MockLog {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn pairs(&self) -> String {
        self.log().pairs.iter().join(", ")
    }
}

#[async_trait]
impl Ffmpeg for SharedMockFfmpeg {
    async fn run(&self, _args: Vec<String>) -> Result<Vec<u8>, EncodeFailure> {
        unimplemented!("Transcoder always requests an output file")
    }

    async fn run_with_output_file(
        &self,
        args: Vec<String>,
        output_file: &Utf8Path,
    ) -> Result<Vec<u8>, EncodeFailure> {
        let value_of = |flag: &str| {
            let pos = args.iter().position(|arg| arg == flag).unwrap();
            args[pos + 1].clone()
        };

        let input = Utf8PathBuf::from(value_of("-i"));
        let duration = Duration::from_secs_f64(value_of("-t").parse().unwrap());
        let webp_quality: u32 = value_of("-q:v").parse().unwrap();

        let pair = ParameterPair {
            duration,
            quality: MAX_QUALITY - webp_quality,
        };

        {
            let mut log = self.log.lock().unwrap();
            log.pairs.push(pair);
            log.inputs.push(input.clone());
            log.outputs.push(output_file.to_owned());
        }

        let input = fs::read(&input).await.unwrap();

        let Some(output) = (self.respond)(pair, &input) else {
            return Err(EncodeFailure::Output {
                path: output_file.to_owned(),
                source: io::Error::new(io::ErrorKind::Other, "mock ffmpeg crashed"),
            });
        };

        // Write the file like the real ffmpeg does, so that cleanup is observable
        fs::write(output_file, &output).await.unwrap();

        Ok(output)
    }
}

/// Transcoder with a scratch dir inside of a fresh temp dir
pub(crate) fn transcoder(
    config: TranscodeConfig,
    ffmpeg: Arc<SharedMockFfmpeg>,
) -> (tempfile::TempDir, Transcoder) {
    let temp_dir = tempfile::tempdir().unwrap();
    let scratch = Utf8PathBuf::from_path_buf(temp_dir.path().join("tmp")).unwrap();

    let ffmpeg: Arc<dyn Ffmpeg> = ffmpeg;

    let transcoder = Transcoder::builder()
        .config(config)
        .ffmpeg(ffmpeg)
        .scratch(ScratchDir::new(scratch))
        .build()
        .unwrap();

    (temp_dir, transcoder)
}
