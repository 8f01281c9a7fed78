use crate::error::EncodeFailure;
use camino::Utf8Path;
use itertools::Itertools;
use nu_ansi_term::{Color, Style};
use std::iter;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const DEFAULT_FF_OPTIONS: &[&str] = &["-hide_banner", "-loglevel", "error"];

/// If the CLI display string length exceeds this value, then the command
/// will be printed using multiline format.
const LONG_CMD_THRESHOLD: usize = 100;

pub(crate) async fn ffmpeg(
    program: &Utf8Path,
    args: impl IntoIterator<Item = impl Into<String>>,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, EncodeFailure> {
    let args = DEFAULT_FF_OPTIONS
        .iter()
        .copied()
        .map(ToOwned::to_owned)
        .chain(args.into_iter().map(Into::into));

    run_cmd(program, args, timeout).await
}

async fn run_cmd(
    program: &Utf8Path,
    args: impl IntoIterator<Item = impl Into<String>>,
    timeout: Option<Duration>,
) -> Result<Vec<u8>, EncodeFailure> {
    let args: Vec<_> = args.into_iter().map(Into::into).collect();

    let cli = render_cli(program.as_str(), args.iter().map(String::as_str));
    debug!("{cli}");

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // The child is killed if the timeout elapses or the caller's future is dropped
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| EncodeFailure::Spawn {
            program: program.to_owned(),
            source,
        })?;

    let output = child.wait_with_output();

    let output = match timeout {
        Some(timeout) => tokio::time::timeout(timeout, output)
            .await
            .map_err(|_| EncodeFailure::Timeout {
                program: program.to_owned(),
                timeout,
            })?,
        None => output.await,
    };

    let output = output.map_err(|source| EncodeFailure::Spawn {
        program: program.to_owned(),
        source,
    })?;

    if !output.status.success() {
        return Err(EncodeFailure::Exit {
            program: program.to_owned(),
            status: output.status,
            diagnostics: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
        });
    }

    Ok(output.stdout)
}

fn render_cli<'a>(
    program: &'a str,
    args: impl ExactSizeIterator<Item = &'a str> + Clone,
) -> String {
    let program = Color::Blue.paint(shlex::quote(program));

    let args = args.map(|arg| {
        let arg = shlex::quote(arg);
        if arg.starts_with('-') {
            Color::Blue.paint(arg)
        } else {
            Style::new().paint(arg)
        }
    });

    let parts = iter::once(program).chain(args);

    let compact = parts.clone().join(" ");
    if compact.len() <= LONG_CMD_THRESHOLD {
        return compact;
    }
    format!("(\n  {}\n)", { parts }.format(" \n    "))
}
