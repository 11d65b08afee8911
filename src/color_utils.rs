//! Color utility functions shared across the application.
//!
//! Line colors arrive as CSS strings from the pen picker and saved geometry;
//! the canvas needs them as RGBA.

/// Named colors the canvas understands besides hex notation.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("black", [0, 0, 0]),
    ("white", [255, 255, 255]),
    ("red", [255, 0, 0]),
    ("green", [0, 128, 0]),
    ("blue", [0, 0, 255]),
    ("yellow", [255, 255, 0]),
    ("purple", [128, 0, 128]),
    ("orange", [255, 165, 0]),
];

/// Parse a CSS color (`#rgb`, `#rrggbb` or a basic name) into opaque RGBA.
///
/// # Returns
/// `None` if the string is not a recognised color
pub fn parse_css_color(color: &str) -> Option<[u8; 4]> {
    let color = color.trim();

    if let Some(hex) = color.strip_prefix('#') {
        let rgb = match hex.len() {
            6 => [
                u8::from_str_radix(hex.get(0..2)?, 16).ok()?,
                u8::from_str_radix(hex.get(2..4)?, 16).ok()?,
                u8::from_str_radix(hex.get(4..6)?, 16).ok()?,
            ],
            3 => {
                let mut rgb = [0u8; 3];
                for (i, channel) in rgb.iter_mut().enumerate() {
                    let digit = u8::from_str_radix(hex.get(i..i + 1)?, 16).ok()?;
                    *channel = digit * 17;
                }
                rgb
            }
            _ => return None,
        };
        return Some([rgb[0], rgb[1], rgb[2], 255]);
    }

    NAMED_COLORS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(color))
        .map(|(_, [r, g, b])| [*r, *g, *b, 255])
}

/// Like [`parse_css_color`] but falls back to `fallback` (with a warning).
pub fn css_color_or(color: &str, fallback: [u8; 4]) -> [u8; 4] {
    parse_css_color(color).unwrap_or_else(|| {
        log::warn!("Unrecognised color {:?}, using fallback", color);
        fallback
    })
}
