use crate::display;
use crate::prelude::*;
use crate::sticker::MediaKind;
use crate::util::path::Utf8StemmedPathBuf;

/// Returns either the files in the directory or the path itself depending
/// on whether the path is a directory or a file.
pub(crate) async fn files(path: impl AsRef<Utf8Path>) -> Result<Vec<Utf8PathBuf>> {
    let path = path.as_ref();

    if !fs::metadata(path).await?.is_dir() {
        return Ok(vec![path.to_owned()]);
    }

    let dir = fs::read_dir(path).await?;

    let mut files: Vec<Utf8PathBuf> = read_dir_stream(dir)
        .map(|entry| -> Result<Utf8PathBuf> { Ok(entry?.path().try_into()?) })
        .try_collect()
        .await?;

    // Directory listing order is platform-specific
    files.sort();

    Ok(files)
}

fn read_dir_stream(dir: fs::ReadDir) -> impl futures::Stream<Item = Result<fs::DirEntry>> {
    stream::unfold(dir, |mut dir| async move {
        dir.next_entry()
            .err_into()
            .await
            .transpose()
            .map(|entry| (entry, dir))
    })
}

/// Fails if any of the outputs already exists, unless overwriting is allowed
pub(crate) fn validate_output_files_overwriting(
    overwrite: bool,
    paths: impl IntoIterator<Item = Utf8PathBuf>,
) -> Result {
    if overwrite {
        return Ok(());
    }

    let existing_files: Vec<_> = paths
        .into_iter()
        .filter_map(|path| {
            path.try_exists()
                .with_context(|| format!("Failed to check if the output file exists: `{path}`"))
                .map(|exists| exists.then_some(path))
                .transpose()
        })
        .try_collect()?;

    if existing_files.is_empty() {
        return Ok(());
    }

    let files = existing_files.iter().format_with("\n", |path, f| {
        f(&format_args!("- {}", display::bold(&path)))
    });

    bail!("The following output files already exist. Pass `--overwrite` to replace them.\n{files}");
}

pub(crate) fn validate_duplicate_input_names<'a>(
    inputs: impl IntoIterator<Item = &'a Utf8StemmedPathBuf>,
) -> Result {
    let mut duplicates = inputs
        .into_iter()
        .into_group_map_by(|path| path.file_stem())
        .into_iter()
        .filter(|(_, paths)| paths.len() >= 2)
        // Sort to make the test snapshots stable
        .sorted_by_key(|(stem, _)| *stem)
        .peekable();

    if duplicates.peek().is_none() {
        return Ok(());
    }

    let inputs = duplicates.format_with("\n", |(stem, paths), f| {
        let len = paths.len();
        let paths = paths.iter().map(|path| path.as_path()).format(", ");
        f(&format_args!("- {stem} ({len} files): [{paths}]"))
    });

    bail!("The following input files have the same name, but they must be unique.\n{inputs}");
}

/// Only videos and animations can be converted into animated stickers
pub(crate) fn validate_animated_inputs<'a>(
    inputs: impl IntoIterator<Item = &'a Utf8StemmedPathBuf>,
) -> Result {
    let mut rejected = inputs
        .into_iter()
        .map(|path| (path, MediaKind::from_path(path.as_path())))
        .filter(|(_, kind)| *kind != MediaKind::Animated)
        .peekable();

    if rejected.peek().is_none() {
        return Ok(());
    }

    let inputs = rejected.format_with("\n", |(path, kind), f| {
        f(&format_args!("- {} ({kind})", path.as_path()))
    });

    bail!("The following inputs are not videos or animations.\n{inputs}");
}
