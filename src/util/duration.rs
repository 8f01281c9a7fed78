use anyhow::{bail, ensure, Context, Ok, Result};
use std::time::Duration;

/// Parses `SS[.frac]`, `MM:SS[.frac]` or `HH:MM:SS[.frac]`
pub(crate) fn parse(arg: &str) -> Result<Duration> {
    let whole = |arg: &str| arg.parse::<u32>().map(f64::from);
    let fractional = |arg: &str| {
        let val: f64 = arg.parse()?;
        ensure!(val >= 0., "Negative duration is not allowed");
        Ok(val)
    };

    let segments: Vec<_> = arg.trim().split(':').collect();

    let seconds = match segments.as_slice() {
        [seconds] => fractional(seconds)?,
        [minutes, seconds] => whole(minutes)? * 60. + fractional(seconds)?,
        [hours, minutes, seconds] => {
            whole(hours)? * (60. * 60.) + whole(minutes)? * 60. + fractional(seconds)?
        }
        _ => bail!("Unknown duration format"),
    };

    Duration::try_from_secs_f64(seconds)
        .with_context(|| format!("Duration is out of range: `{arg}`"))
}

/// Renders the duration the way ffmpeg's `-t` flag expects it, in seconds.
pub(crate) fn to_ffmpeg_secs(duration: Duration) -> String {
    duration.as_secs_f64().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use expect_test::expect;

    fn assert_parse(arg: &str, expected: expect_test::Expect) {
        expected.assert_eq(&format!("{:?}", parse(arg).unwrap()));
    }

    #[test]
    fn smoke_parse() {
        assert_parse("10", expect!["10s"]);
        assert_parse("2.5", expect!["2.5s"]);
        assert_parse("0.", expect!["0ns"]);

        assert_parse("01:30", expect!["90s"]);
        assert_parse("00:00:00.5", expect!["500ms"]);
    }

    #[test]
    fn error_parse() {
        parse("-2").unwrap_err();
        parse("1:2:3:4").unwrap_err();
        parse("inf").unwrap_err();
        parse("NaN").unwrap_err();
        parse("1e30").unwrap_err();
        parse("00:01:1e30").unwrap_err();
    }

    #[test]
    fn ffmpeg_secs() {
        expect!["10"].assert_eq(&to_ffmpeg_secs(Duration::from_secs(10)));
        expect!["2.5"].assert_eq(&to_ffmpeg_secs(Duration::from_millis(2500)));
    }
}
