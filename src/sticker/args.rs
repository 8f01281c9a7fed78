use super::{ParameterPair, TranscodeConfig, MAX_QUALITY};
use crate::prelude::*;
use crate::util::duration;

/// Builds the ffmpeg arguments for a single attempt. The output path isn't
/// included, it's appended by [`crate::ffmpeg::Ffmpeg::run_with_output_file`].
pub(super) fn encode_args(
    config: &TranscodeConfig,
    input: &Utf8Path,
    pair: ParameterPair,
) -> Vec<String> {
    let side = config.bounding_box();

    // Only downscale, keeping the aspect ratio, so that the frame fits into
    // the bounding box. Then pad the frame with transparent pixels to make
    // it exactly square, because that's what the sticker format requires.
    let video_filter = [
        format!("fps={}", config.fps()),
        format!(
            "scale=\
            min(iw\\, {side}):\
            min(ih\\, {side}):\
            force_original_aspect_ratio=decrease:\
            flags=lanczos"
        ),
        "format=rgba".to_owned(),
        format!("pad={side}:{side}:-1:-1:color=0x00000000"),
    ]
    .join(",");

    strs(["-y", "-i", input.as_str(), "-t"])
        .chain([duration::to_ffmpeg_secs(pair.duration)])
        .chain(strs(["-filter:v"]))
        .chain([video_filter])
        .chain(strs([
            "-c:v",
            "libwebp",
            "-lossless",
            "0",
            // The slowest and the most efficient compression method
            "-compression_level",
            "6",
            "-q:v",
        ]))
        .chain([webp_quality(pair.quality).to_string()])
        .chain(strs([
            "-preset",
            "picture",
            // Loop forever
            "-loop",
            "0",
            // Stickers can't have sound
            "-an",
            "-fps_mode",
            "passthrough",
            "-f",
            "webp",
        ]))
        .collect()
}

fn strs<'a>(args: impl IntoIterator<Item = &'a str> + 'a) -> impl Iterator<Item = String> + 'a {
    args.into_iter().map(ToOwned::to_owned)
}

/// Webp's `-q:v` goes in the opposite direction to the compression level,
/// the bigger it is the bigger the file.
fn webp_quality(compression: u32) -> u32 {
    MAX_QUALITY - compression.min(MAX_QUALITY)
}
