//! Leading and trailing white-space trimming.

use crate::tiles::PowerSource;
use rasterkit_core::{PixelCoord, Result};

/// Strip zero-power pixels from both ends of `line`.
///
/// Scans inward from both ends at once and stops as soon as both bounds are
/// known. Returns `None` when the whole line is white.
pub fn trim_line<'a, P: PowerSource + ?Sized>(
    line: &'a [PixelCoord],
    power: &P,
) -> Result<Option<&'a [PixelCoord]>> {
    let mut start = None;
    let mut end = None;

    for (i, j) in (0..line.len()).zip((0..line.len()).rev()) {
        if start.is_none() && power.raw_power(line[i])? != 0.0 {
            start = Some(i);
        }
        if end.is_none() && power.raw_power(line[j])? != 0.0 {
            end = Some(j + 1);
        }
        if let (Some(start), Some(end)) = (start, end) {
            return Ok(Some(&line[start..end]));
        }
    }

    Ok(None)
}
