use super::length::parse_angle;
use super::StyleValue;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as f32 / 255.0,
            g: ((hex >> 8) & 0xFF) as f32 / 255.0,
            b: (hex & 0xFF) as f32 / 255.0,
            a: 1.0,
        }
    }

    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgb(1.0, 0.0, 0.0);
    pub const TRANSPARENT: Color = Color::rgba(0.0, 0.0, 0.0, 0.0);

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }

    pub fn mix(&self, other: &Color, t: f32) -> Color {
        let lerp = |a: f32, b: f32| a + (b - a) * t;
        Color::rgba(
            lerp(self.r, other.r),
            lerp(self.g, other.g),
            lerp(self.b, other.b),
            lerp(self.a, other.a),
        )
    }

    /// Parse `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb()`, `rgba()`,
    /// `hsl()`, `hsla()` or a named color.
    pub fn parse(input: &str) -> Option<Color> {
        let input = input.trim();
        if let Some(hex) = input.strip_prefix('#') {
            return parse_hex(hex);
        }
        if let Some(args) = function_args(input, "rgba").or_else(|| function_args(input, "rgb")) {
            return parse_rgb_args(&args);
        }
        if let Some(args) = function_args(input, "hsla").or_else(|| function_args(input, "hsl")) {
            return parse_hsl_args(&args);
        }
        named_color(&input.to_ascii_lowercase())
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::TRANSPARENT
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColorStop {
    pub offset: f32,
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearGradient {
    /// CSS angle: 0deg points up, 90deg points right.
    pub angle: f32,
    pub stops: Vec<ColorStop>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RadialGradient {
    pub stops: Vec<ColorStop>,
}

/// The value of `fill`, `stroke` and `shadowColor`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Paint {
    #[default]
    None,
    Color(Color),
    LinearGradient(LinearGradient),
    RadialGradient(RadialGradient),
}

impl Paint {
    pub fn is_none(&self) -> bool {
        match self {
            Paint::None => true,
            Paint::Color(c) => c.a <= 0.0,
            _ => false,
        }
    }

    pub fn as_color(&self) -> Option<Color> {
        match self {
            Paint::Color(c) => Some(*c),
            _ => None,
        }
    }

    /// Only solid colors interpolate.
    pub fn mix(&self, other: &Paint, t: f32) -> Option<Paint> {
        match (self, other) {
            (Paint::Color(a), Paint::Color(b)) => Some(Paint::Color(a.mix(b, t))),
            _ => None,
        }
    }
}

/// Parse a paint value. `none`, empty and unparsable input yield `Paint::None`.
pub fn parse_paint(input: &StyleValue) -> Paint {
    let raw = match input {
        StyleValue::Str(s) => s.trim(),
        StyleValue::Null => return Paint::None,
        other => {
            log::warn!("Unexpected paint value {:?}", other);
            return Paint::None;
        }
    };
    if raw.is_empty() || raw == "none" {
        return Paint::None;
    }
    if let Some(args) = function_args(raw, "linear-gradient") {
        return parse_linear_gradient(&args).unwrap_or_else(|| {
            log::warn!("Invalid linear gradient {:?}", raw);
            Paint::None
        });
    }
    if let Some(args) = function_args(raw, "radial-gradient") {
        return Paint::RadialGradient(RadialGradient {
            stops: parse_stops(&args),
        });
    }
    match Color::parse(raw) {
        Some(color) => Paint::Color(color),
        None => {
            log::warn!("Invalid color {:?}, using none", raw);
            Paint::None
        }
    }
}

/// Arguments of `name(...)`, split on top-level commas.
pub(crate) fn function_args(input: &str, name: &str) -> Option<Vec<String>> {
    let rest = input.strip_prefix(name)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(split_top_level(inner, ','))
}

pub(crate) fn split_top_level(input: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in input.chars() {
        match c {
            '(' => depth += 1,
            ')' => depth -= 1,
            _ => {}
        }
        if c == separator && depth == 0 {
            parts.push(current.trim().to_string());
            current.clear();
        } else {
            current.push(c);
        }
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    }
    parts
}

fn parse_hex(hex: &str) -> Option<Color> {
    let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
    let byte = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    let (r, g, b, a) = match hex.len() {
        3 | 4 => {
            let a = if hex.len() == 4 { digit(3)? * 17 } else { 255 };
            (digit(0)? * 17, digit(1)? * 17, digit(2)? * 17, a)
        }
        6 | 8 => {
            let a = if hex.len() == 8 { byte(6)? } else { 255 };
            (byte(0)?, byte(2)?, byte(4)?, a)
        }
        _ => return None,
    };
    Some(Color::rgba(
        r as f32 / 255.0,
        g as f32 / 255.0,
        b as f32 / 255.0,
        a as f32 / 255.0,
    ))
}

fn channel(part: &str, scale: f32) -> Option<f32> {
    match part.strip_suffix('%') {
        Some(p) => p.trim().parse::<f32>().ok().map(|v| v / 100.0),
        None => part.trim().parse::<f32>().ok().map(|v| v / scale),
    }
}

/// Accepts both comma and space separated arguments (`rgb(1 2 3 / 50%)`).
fn normalize_args(args: &[String]) -> Vec<String> {
    if args.len() == 1 {
        args[0]
            .split(|c: char| c.is_whitespace() || c == '/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    } else {
        args.to_vec()
    }
}

fn parse_rgb_args(args: &[String]) -> Option<Color> {
    let args = normalize_args(args);
    if args.len() < 3 {
        return None;
    }
    let alpha = match args.get(3) {
        Some(a) => channel(a, 1.0)?,
        None => 1.0,
    };
    Some(Color::rgba(
        channel(&args[0], 255.0)?.clamp(0.0, 1.0),
        channel(&args[1], 255.0)?.clamp(0.0, 1.0),
        channel(&args[2], 255.0)?.clamp(0.0, 1.0),
        alpha.clamp(0.0, 1.0),
    ))
}

fn parse_hsl_args(args: &[String]) -> Option<Color> {
    let args = normalize_args(args);
    if args.len() < 3 {
        return None;
    }
    let h = parse_angle(&args[0])?.to_degrees().rem_euclid(360.0) / 360.0;
    let s = channel(&args[1], 100.0)?.clamp(0.0, 1.0);
    let l = channel(&args[2], 100.0)?.clamp(0.0, 1.0);
    let alpha = match args.get(3) {
        Some(a) => channel(a, 1.0)?,
        None => 1.0,
    };

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;
    let hue = |mut t: f32| {
        if t < 0.0 {
            t += 1.0;
        }
        if t > 1.0 {
            t -= 1.0;
        }
        if t < 1.0 / 6.0 {
            p + (q - p) * 6.0 * t
        } else if t < 0.5 {
            q
        } else if t < 2.0 / 3.0 {
            p + (q - p) * (2.0 / 3.0 - t) * 6.0
        } else {
            p
        }
    };
    Some(Color::rgba(
        hue(h + 1.0 / 3.0),
        hue(h),
        hue(h - 1.0 / 3.0),
        alpha.clamp(0.0, 1.0),
    ))
}

fn parse_stops(args: &[String]) -> Vec<ColorStop> {
    let count = args.len();
    args.iter()
        .enumerate()
        .filter_map(|(i, stop)| {
            // The color may itself contain spaces (`rgb(0 0 0)`), so the
            // offset is whatever follows the last closing paren or space.
            let (color_part, offset_part) = match stop.rfind(|c: char| c == ')' || c == ' ') {
                Some(pos) if stop[pos..].trim_start_matches(')').trim().ends_with('%') => {
                    let split = if stop.as_bytes()[pos] == b')' { pos + 1 } else { pos };
                    (stop[..split].trim(), Some(stop[split..].trim()))
                }
                _ => (stop.trim(), None),
            };
            let color = Color::parse(color_part)?;
            let offset = offset_part
                .and_then(|o| o.strip_suffix('%'))
                .and_then(|o| o.trim().parse::<f32>().ok())
                .map(|o| o / 100.0)
                .unwrap_or(if count > 1 {
                    i as f32 / (count - 1) as f32
                } else {
                    0.0
                });
            Some(ColorStop { offset, color })
        })
        .collect()
}

fn parse_linear_gradient(args: &[String]) -> Option<Paint> {
    let first = args.first()?;
    let (angle, stops) = match parse_angle(first) {
        Some(angle) => (angle.to_degrees(), &args[1..]),
        None => match first.as_str() {
            "to top" => (0.0, &args[1..]),
            "to right" => (90.0, &args[1..]),
            "to bottom" => (180.0, &args[1..]),
            "to left" => (270.0, &args[1..]),
            _ => (180.0, args),
        },
    };
    let stops = parse_stops(stops);
    if stops.is_empty() {
        return None;
    }
    Some(Paint::LinearGradient(LinearGradient { angle, stops }))
}

fn named_color(name: &str) -> Option<Color> {
    let hex = match name {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => 0x000000,
        "white" => 0xffffff,
        "red" => 0xff0000,
        "green" => 0x008000,
        "lime" => 0x00ff00,
        "blue" => 0x0000ff,
        "yellow" => 0xffff00,
        "cyan" | "aqua" => 0x00ffff,
        "magenta" | "fuchsia" => 0xff00ff,
        "gray" | "grey" => 0x808080,
        "silver" => 0xc0c0c0,
        "maroon" => 0x800000,
        "olive" => 0x808000,
        "navy" => 0x000080,
        "teal" => 0x008080,
        "purple" => 0x800080,
        "orange" => 0xffa500,
        "pink" => 0xffc0cb,
        "brown" => 0xa52a2a,
        "gold" => 0xffd700,
        "indigo" => 0x4b0082,
        "violet" => 0xee82ee,
        "coral" => 0xff7f50,
        "salmon" => 0xfa8072,
        "steelblue" => 0x4682b4,
        "skyblue" => 0x87ceeb,
        "lightgray" | "lightgrey" => 0xd3d3d3,
        "darkgray" | "darkgrey" => 0xa9a9a9,
        _ => return None,
    };
    Some(Color::from_hex(hex))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_hex() {
        assert_eq!(Color::parse("#ff0000"), Some(Color::RED));
        assert_eq!(Color::parse("#f00"), Some(Color::RED));
        let c = Color::parse("#ff000080").unwrap();
        assert!(approx_eq(c.a, 128.0 / 255.0));
        assert_eq!(Color::parse("#ff00"), Some(Color::rgba(1.0, 1.0, 0.0, 0.0)));
        assert!(Color::parse("#12345").is_none());
    }

    #[test]
    fn test_functions() {
        assert_eq!(Color::parse("rgb(255, 0, 0)"), Some(Color::RED));
        let c = Color::parse("rgba(0, 0, 255, 0.5)").unwrap();
        assert!(approx_eq(c.b, 1.0));
        assert!(approx_eq(c.a, 0.5));
        let c = Color::parse("rgb(0 128 0 / 50%)").unwrap();
        assert!(approx_eq(c.a, 0.5));
        let c = Color::parse("hsl(120, 100%, 50%)").unwrap();
        assert!(approx_eq(c.r, 0.0));
        assert!(approx_eq(c.g, 1.0));
        assert!(approx_eq(c.b, 0.0));
    }

    #[test]
    fn test_paint() {
        assert_eq!(parse_paint(&StyleValue::from("red")), Paint::Color(Color::RED));
        assert_eq!(parse_paint(&StyleValue::from("none")), Paint::None);
        assert_eq!(parse_paint(&StyleValue::from("not-a-color")), Paint::None);
        assert!(parse_paint(&StyleValue::from("transparent")).is_none());
    }

    #[test]
    fn test_linear_gradient() {
        let paint = parse_paint(&StyleValue::from(
            "linear-gradient(90deg, red 0%, rgb(0, 0, 255) 100%)",
        ));
        match paint {
            Paint::LinearGradient(g) => {
                assert_eq!(g.angle, 90.0);
                assert_eq!(g.stops.len(), 2);
                assert_eq!(g.stops[1].offset, 1.0);
                assert_eq!(g.stops[1].color, Color::rgb(0.0, 0.0, 1.0));
            }
            other => panic!("expected gradient, got {:?}", other),
        }
    }

    #[test]
    fn test_mix() {
        let mixed = Paint::Color(Color::BLACK)
            .mix(&Paint::Color(Color::WHITE), 0.5)
            .unwrap();
        assert_eq!(mixed, Paint::Color(Color::rgb(0.5, 0.5, 0.5)));
    }
}
