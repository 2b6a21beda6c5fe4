use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use super::StyleValue;

static LENGTH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?)\s*(px|%|em|rem|deg|rad|grad|turn)?$")
        .expect("length pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Px,
    Percent,
    Em,
    Rem,
    Deg,
    Rad,
    Grad,
    Turn,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Percent => "%",
            Unit::Em => "em",
            Unit::Rem => "rem",
            Unit::Deg => "deg",
            Unit::Rad => "rad",
            Unit::Grad => "grad",
            Unit::Turn => "turn",
        }
    }

    pub fn is_angle(&self) -> bool {
        matches!(self, Unit::Deg | Unit::Rad | Unit::Grad | Unit::Turn)
    }
}

/// A number with a CSS unit. Unitless input parses as pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CssLength {
    pub value: f32,
    pub unit: Unit,
}

/// What relative units resolve against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LengthContext {
    pub font_size: f32,
    pub root_font_size: f32,
    /// Base for percentages.
    pub percent_base: f32,
}

impl Default for LengthContext {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            root_font_size: 16.0,
            percent_base: 0.0,
        }
    }
}

impl CssLength {
    pub const ZERO: Self = Self::px(0.0);

    pub const fn px(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Px,
        }
    }

    pub const fn percent(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Percent,
        }
    }

    pub const fn deg(value: f32) -> Self {
        Self {
            value,
            unit: Unit::Deg,
        }
    }

    pub fn to_px(&self, ctx: &LengthContext) -> f32 {
        match self.unit {
            Unit::Px => self.value,
            Unit::Percent => self.value / 100.0 * ctx.percent_base,
            Unit::Em => self.value * ctx.font_size,
            Unit::Rem => self.value * ctx.root_font_size,
            // Angles have no pixel meaning; treat the number as-is.
            _ => self.value,
        }
    }

    pub fn to_degrees(&self) -> f32 {
        match self.unit {
            Unit::Rad => self.value.to_degrees(),
            Unit::Grad => self.value * 0.9,
            Unit::Turn => self.value * 360.0,
            _ => self.value,
        }
    }

    /// Linear interpolation. Units must match, otherwise `None`.
    pub fn mix(&self, other: &CssLength, t: f32) -> Option<CssLength> {
        (self.unit == other.unit).then(|| CssLength {
            value: self.value + (other.value - self.value) * t,
            unit: self.unit,
        })
    }
}

impl fmt::Display for CssLength {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.as_str())
    }
}

/// Parse a single length without logging. `None` when the input is not a length.
pub fn try_parse_length(input: &str) -> Option<CssLength> {
    let caps = LENGTH_RE.captures(input.trim())?;
    let value = caps.get(1)?.as_str().parse::<f32>().ok()?;
    let unit = match caps.get(2).map(|m| m.as_str()) {
        None | Some("px") => Unit::Px,
        Some("%") => Unit::Percent,
        Some("em") => Unit::Em,
        Some("rem") => Unit::Rem,
        Some("deg") => Unit::Deg,
        Some("rad") => Unit::Rad,
        Some("grad") => Unit::Grad,
        Some("turn") => Unit::Turn,
        Some(_) => return None,
    };
    Some(CssLength { value, unit })
}

/// Parse a length-like style value.
///
/// Missing values and null are zero pixels. Numbers are pixels. Strings that
/// fail to parse log a warning and fall back to zero pixels.
pub fn parse_length(input: Option<&StyleValue>) -> CssLength {
    match input {
        None | Some(StyleValue::Null) => CssLength::ZERO,
        Some(StyleValue::Number(n)) => CssLength::px(*n),
        Some(StyleValue::Str(s)) if s.trim().is_empty() => CssLength::ZERO,
        Some(StyleValue::Str(s)) => try_parse_length(s).unwrap_or_else(|| {
            log::warn!("Invalid length value {:?}, using 0px", s);
            CssLength::ZERO
        }),
        Some(other) => {
            log::warn!("Unexpected length value {:?}, using 0px", other);
            CssLength::ZERO
        }
    }
}

/// Parse an angle. Unitless numbers are degrees.
pub fn parse_angle(input: &str) -> Option<CssLength> {
    let length = try_parse_length(input)?;
    match length.unit {
        Unit::Px => Some(CssLength::deg(length.value)),
        unit if unit.is_angle() => Some(length),
        _ => None,
    }
}

/// Parse a space- or comma-separated list of lengths, skipping bad entries.
pub fn parse_lengths(input: &StyleValue) -> Vec<CssLength> {
    match input {
        StyleValue::Number(n) => vec![CssLength::px(*n)],
        StyleValue::Points(points) => points
            .iter()
            .flat_map(|(a, b)| [CssLength::px(*a), CssLength::px(*b)])
            .collect(),
        StyleValue::Str(s) => s
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|part| !part.is_empty())
            .filter_map(|part| {
                let length = try_parse_length(part);
                if length.is_none() {
                    log::warn!("Skipping invalid length {:?} in {:?}", part, s);
                }
                length
            })
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_length_defaults() {
        assert_eq!(parse_length(None), CssLength::ZERO);
        assert_eq!(parse_length(Some(&StyleValue::Null)), CssLength::ZERO);
        assert_eq!(parse_length(None).to_string(), "0px");
    }

    #[test]
    fn test_parse_length_strings() {
        let zero = parse_length(Some(&StyleValue::from("0")));
        assert_eq!(zero.to_string(), "0px");

        let fractional = parse_length(Some(&StyleValue::from("10.5px")));
        assert_eq!(fractional.to_string(), "10.5px");

        let percent = parse_length(Some(&StyleValue::from("50%")));
        assert_eq!(percent, CssLength::percent(50.0));

        let em = parse_length(Some(&StyleValue::from("1.5em")));
        assert_eq!(em.unit, Unit::Em);
    }

    #[test]
    fn test_parse_length_invalid_falls_back() {
        assert_eq!(parse_length(Some(&StyleValue::from("wide"))), CssLength::ZERO);
    }

    #[test]
    fn test_to_px() {
        let ctx = LengthContext {
            font_size: 20.0,
            root_font_size: 10.0,
            percent_base: 200.0,
        };
        assert_eq!(CssLength::percent(50.0).to_px(&ctx), 100.0);
        assert_eq!(try_parse_length("2em").unwrap().to_px(&ctx), 40.0);
        assert_eq!(try_parse_length("2rem").unwrap().to_px(&ctx), 20.0);
    }

    #[test]
    fn test_angles() {
        assert_eq!(parse_angle("90").unwrap().to_degrees(), 90.0);
        assert_eq!(parse_angle("0.5turn").unwrap().to_degrees(), 180.0);
        assert!((parse_angle("3.14159rad").unwrap().to_degrees() - 180.0).abs() < 1e-3);
        assert!(parse_angle("10%").is_none());
    }

    #[test]
    fn test_parse_lengths() {
        let list = parse_lengths(&StyleValue::from("4, 2px bad 1em"));
        assert_eq!(list.len(), 3);
        assert_eq!(list[2].unit, Unit::Em);
    }
}
