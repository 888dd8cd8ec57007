pub const DEFAULT_HEADER_BG: &str = "#ff0000";
pub const DEFAULT_HEADER_FG: &str = "#ffffff";

const LIGHT: &str = "#ffffff";
const DARK: &str = "#000000";

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#').unwrap_or(color);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some((r, g, b))
}

fn linear(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

/// Picks black or white text for a header background, by relative luminance.
/// Unparseable colors get white text.
pub fn contrast_color(bg: &str) -> &'static str {
    match parse_hex(bg) {
        Some((r, g, b)) => {
            let l = 0.2126 * linear(r) + 0.7152 * linear(g) + 0.0722 * linear(b);
            if l > 0.179 { DARK } else { LIGHT }
        }
        None => LIGHT,
    }
}
