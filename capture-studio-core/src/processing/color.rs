//! Color parsing and conversion into renderer paints.

use image::Rgba;
use vello_cpu::peniko::Color;

/// Fill used when no background preset is selected.
pub const FALLBACK_BACKGROUND: Rgba<u8> = Rgba([0x1a, 0x1a, 0x1a, 0xff]);

/// Outline color of the webcam bubble.
pub const BUBBLE_OUTLINE: Rgba<u8> = Rgba([0x64, 0x6c, 0xff, 0xff]);

/// Parse `#rgb` or `#rrggbb`.
pub fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    let channel = |s: &str| u8::from_str_radix(s, 16).ok();
    match digits.len() {
        6 => Some(Rgba([
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
            0xff,
        ])),
        3 => {
            let expand = |i: usize| channel(&digits[i..i + 1]).map(|v| v * 17);
            Some(Rgba([expand(0)?, expand(1)?, expand(2)?, 0xff]))
        }
        _ => None,
    }
}

pub fn to_paint(c: Rgba<u8>) -> Color {
    Color::from_rgba8(c[0], c[1], c[2], c[3])
}

/// Evenly spaced gradient stops from hex colors. Unparseable entries are
/// skipped; `None` if no usable color remains.
pub fn gradient_stops(colors: &[&str]) -> Option<Vec<Color>> {
    let stops: Vec<_> = colors.iter().filter_map(|c| parse_hex(c)).map(to_paint).collect();
    if stops.is_empty() {
        return None;
    }
    Some(stops)
}
