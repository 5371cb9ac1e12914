//! Mapping from the 0..=100 quality slider to encoder-native knobs.

/// Highest (worst) CRF value accepted by the x264/x265/vp9 encoders.
pub const MAX_CRF: u8 = 51;

/// Upper bound of the quality slider.
pub const MAX_QUALITY: u32 = 100;

/// Map slider quality to CRF: `51 - floor(quality * 0.51)`.
///
/// Integer form of the same formula; `floor(q * 0.51) == (q * 51) / 100`
/// for every q in range. Values above 100 are treated as 100.
pub fn crf_for_quality(quality: u32) -> u8 {
    let quality = quality.min(MAX_QUALITY);
    MAX_CRF - ((quality * 51) / 100) as u8
}

/// Palette size for GIF output: 2 colors at quality 0, 256 at 100.
pub fn palette_colors_for_quality(quality: u32) -> u32 {
    let quality = quality.min(MAX_QUALITY);
    2 + (quality * 254) / 100
}
