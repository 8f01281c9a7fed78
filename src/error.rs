use camino::Utf8PathBuf;
use std::process::ExitStatus;
use std::time::Duration;

/// A single invocation of the external codec didn't produce an output.
///
/// The driver reacts to this by moving on to the next parameter pair, because
/// the codec is deterministic and would fail the same way again.
#[derive(Debug, thiserror::Error)]
pub enum EncodeFailure {
    #[error("Failed to spawn `{program}`")]
    Spawn {
        program: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Process `{program}` failed with {status}\n{diagnostics}")]
    Exit {
        program: Utf8PathBuf,
        status: ExitStatus,
        /// Whatever the process wrote to `stderr`
        diagnostics: String,
    },

    #[error("Process `{program}` didn't finish within {timeout:?} and was killed")]
    Timeout {
        program: Utf8PathBuf,
        timeout: Duration,
    },

    #[error("Failed to read the encoded output at `{path}`")]
    Output {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The conversion as a whole couldn't produce any bytes
#[derive(Debug, thiserror::Error)]
pub enum ConversionFailure {
    #[error("Failed to persist the input to the scratch storage at `{path}`")]
    PersistInput {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("All {attempts} encoding attempts failed, none of them produced an output")]
    Exhausted {
        attempts: usize,
        /// Error of the last attempt
        #[source]
        last: Option<EncodeFailure>,
    },
}
