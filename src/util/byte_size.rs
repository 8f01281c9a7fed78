use anyhow::{bail, Context, Result};

pub(crate) const KIB: usize = 1024;
pub(crate) const MIB: usize = 1024 * KIB;

/// Parses a byte size such as `1500KiB`, `1.5MiB`, `256k` or a bare number
/// of bytes. Both the binary (`KiB`) and the short (`k`) suffixes are
/// interpreted as powers of 1024.
pub(crate) fn parse(arg: &str) -> Result<usize> {
    let arg = arg.trim();

    let split = arg
        .find(|char: char| char.is_ascii_alphabetic())
        .unwrap_or(arg.len());

    let (number, unit) = arg.split_at(split);

    let multiplier = match unit.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        _ => bail!("Unknown byte size unit `{unit}`"),
    };

    let number: f64 = number
        .trim()
        .parse()
        .with_context(|| format!("Invalid byte size `{arg}`"))?;

    if number < 0. || !number.is_finite() {
        bail!("Byte size must be a non-negative finite number, but got `{arg}`");
    }

    Ok((number * multiplier as f64).round() as usize)
}
