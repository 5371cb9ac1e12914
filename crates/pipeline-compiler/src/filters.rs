//! Filter expression builders.

use recast_common::config::FilterTuning;
use recast_export_model::{PixelOffset, Resolution, Watermark, WatermarkAnchor};

/// Format a number the way the engine's option parser expects: no trailing
/// zeros, no exponent.
pub fn fmt_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    let mut text = format!("{value:.6}");
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

pub fn scale(resolution: Resolution) -> String {
    format!("scale={}:{}", resolution.width, resolution.height)
}

pub fn gif_frame_rate(fps: u32) -> String {
    format!("fps={fps}")
}

/// Width-constrained scale that keeps the aspect ratio.
pub fn gif_scale(width: u32) -> String {
    format!("scale={width}:-1:flags=lanczos")
}

pub fn stabilize(tuning: &FilterTuning) -> String {
    let t = tuning.stabilize;
    format!("deshake=rx={}:ry={}:blocksize={}", t.rx, t.ry, t.blocksize)
}

pub fn denoise(tuning: &FilterTuning) -> String {
    let t = tuning.denoise;
    format!(
        "nlmeans=s={}:p={}:r={}",
        fmt_number(t.strength),
        t.patch,
        t.research
    )
}

pub fn color_enhance(tuning: &FilterTuning) -> String {
    let t = tuning.color;
    format!(
        "eq=contrast={}:brightness={}:saturation={}",
        fmt_number(t.contrast),
        fmt_number(t.brightness),
        fmt_number(t.saturation)
    )
}

/// Chain applied to the watermark image before compositing: scale relative
/// to its native size, then bake opacity into the alpha channel.
pub fn watermark_source(watermark: &Watermark) -> String {
    format!(
        "scale=iw*{}:-1,format=rgba,colorchannelmixer=aa={}",
        fmt_number(watermark.scale),
        fmt_number(watermark.opacity)
    )
}

/// Overlay placement for the anchored watermark.
pub fn overlay(anchor: WatermarkAnchor, offset: PixelOffset) -> String {
    let (x, y) = match anchor {
        WatermarkAnchor::TopLeft => (offset.x.to_string(), offset.y.to_string()),
        WatermarkAnchor::TopRight => (from_far_edge("W-w", offset.x), offset.y.to_string()),
        WatermarkAnchor::BottomLeft => (offset.x.to_string(), from_far_edge("H-h", offset.y)),
        WatermarkAnchor::BottomRight => {
            (from_far_edge("W-w", offset.x), from_far_edge("H-h", offset.y))
        }
        WatermarkAnchor::Center => (centered("(W-w)/2", offset.x), centered("(H-h)/2", offset.y)),
    };
    format!("overlay=x={x}:y={y}")
}

/// `W-w-20` for an inward offset of 20; negative offsets push past the edge.
fn from_far_edge(edge: &str, offset: i32) -> String {
    match offset {
        0 => edge.to_string(),
        o if o > 0 => format!("{edge}-{o}"),
        o => format!("{edge}+{}", o.unsigned_abs()),
    }
}

fn centered(center: &str, offset: i32) -> String {
    match offset {
        0 => center.to_string(),
        o if o > 0 => format!("{center}+{o}"),
        o => format!("{center}-{}", o.unsigned_abs()),
    }
}

pub fn palette_gen(max_colors: u32) -> String {
    format!("palettegen=max_colors={max_colors}")
}

pub fn palette_use(dither: bool) -> String {
    if dither {
        "paletteuse=dither=floyd_steinberg".to_string()
    } else {
        "paletteuse".to_string()
    }
}
