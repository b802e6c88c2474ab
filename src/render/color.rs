use tiny_skia::Color;

/// Parses `#rgb`, `#rrggbb` or `#rrggbbaa`. Anything else is `None`.
pub fn parse_hex(s: &str) -> Option<Color> {
    let hex = s.trim().strip_prefix('#')?;
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 => (digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, 255),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, a))
}

/// Stroke colour with `opacity` applied; unparsable colours draw black.
pub fn paint_color(s: &str, opacity: f32) -> Color {
    let mut color = parse_hex(s).unwrap_or(Color::BLACK);
    color.apply_opacity(opacity);
    color
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(parse_hex("#fff"), Some(Color::from_rgba8(255, 255, 255, 255)));
        assert_eq!(parse_hex("#1e1E1e"), Some(Color::from_rgba8(30, 30, 30, 255)));
        assert_eq!(parse_hex("#00000080"), Some(Color::from_rgba8(0, 0, 0, 128)));
        assert_eq!(parse_hex("red"), None);
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#ggg"), None);
    }

    #[test]
    fn opacity_scales_alpha() {
        let c = paint_color("#ff0000", 0.5);
        assert!((c.alpha() - 0.5).abs() < 0.01);
        assert_eq!(paint_color("nonsense", 1.0), Color::BLACK);
    }
}
