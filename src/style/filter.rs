use std::sync::{Arc, LazyLock, Mutex};

use rustc_hash::FxHashMap;

use super::color::{split_top_level, Color};
use super::length::{parse_angle, try_parse_length, CssLength};

/// Parsed filters keyed by raw input; entries are immutable once inserted.
static FILTER_CACHE: LazyLock<Mutex<FxHashMap<String, Arc<Vec<FilterFunction>>>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

#[derive(Debug, Clone, PartialEq)]
pub enum FilterFunction {
    Blur(CssLength),
    Brightness(f32),
    Contrast(f32),
    DropShadow {
        offset_x: CssLength,
        offset_y: CssLength,
        blur: CssLength,
        color: Color,
    },
    Grayscale(f32),
    /// Degrees.
    HueRotate(f32),
    Invert(f32),
    Opacity(f32),
    Saturate(f32),
    Sepia(f32),
}

impl FilterFunction {
    /// How far this filter can paint outside the element's bounds.
    pub fn outset(&self) -> f32 {
        match self {
            FilterFunction::Blur(radius) => radius.value.max(0.0) * 2.0,
            FilterFunction::DropShadow {
                offset_x,
                offset_y,
                blur,
                ..
            } => offset_x.value.abs().max(offset_y.value.abs()) + blur.value.max(0.0) * 2.0,
            _ => 0.0,
        }
    }
}

/// Parse a CSS filter list such as `blur(4px) brightness(120%)`.
///
/// Results are memoized by raw string: the same input returns the same
/// `Arc`. Unknown or malformed functions are skipped with a warning while
/// the remaining functions still apply.
pub fn parse_filter(input: &str) -> Arc<Vec<FilterFunction>> {
    let mut cache = FILTER_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(hit) = cache.get(input) {
        return hit.clone();
    }
    let parsed = Arc::new(parse_filter_uncached(input));
    cache.insert(input.to_string(), parsed.clone());
    parsed
}

fn parse_filter_uncached(input: &str) -> Vec<FilterFunction> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "none" {
        return Vec::new();
    }

    let mut filters = Vec::new();
    let mut rest = trimmed;
    while !rest.is_empty() {
        let Some(open) = rest.find('(') else {
            log::warn!("Ignoring trailing filter text {:?} in {:?}", rest, input);
            break;
        };
        let name = rest[..open].trim();
        let mut depth = 0;
        let mut close = None;
        for (i, c) in rest[open..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(open + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let Some(close) = close else {
            log::warn!("Unbalanced parentheses in filter {:?}", input);
            break;
        };
        let args = &rest[open + 1..close];
        match parse_function(name, args) {
            Some(filter) => filters.push(filter),
            None => log::warn!("Skipping unsupported filter {}({})", name, args),
        }
        rest = rest[close + 1..].trim_start();
    }
    filters
}

fn amount(args: &str, default: f32) -> Option<f32> {
    let args = args.trim();
    if args.is_empty() {
        return Some(default);
    }
    match args.strip_suffix('%') {
        Some(p) => p.trim().parse::<f32>().ok().map(|v| v / 100.0),
        None => args.parse::<f32>().ok(),
    }
}

fn parse_function(name: &str, args: &str) -> Option<FilterFunction> {
    match name {
        "blur" => Some(FilterFunction::Blur(
            try_parse_length(args).unwrap_or(CssLength::ZERO),
        )),
        "brightness" => amount(args, 1.0).map(FilterFunction::Brightness),
        "contrast" => amount(args, 1.0).map(FilterFunction::Contrast),
        "grayscale" => amount(args, 1.0).map(FilterFunction::Grayscale),
        "invert" => amount(args, 1.0).map(FilterFunction::Invert),
        "opacity" => amount(args, 1.0).map(FilterFunction::Opacity),
        "saturate" => amount(args, 1.0).map(FilterFunction::Saturate),
        "sepia" => amount(args, 1.0).map(FilterFunction::Sepia),
        "hue-rotate" => {
            let args = args.trim();
            if args.is_empty() {
                Some(FilterFunction::HueRotate(0.0))
            } else {
                parse_angle(args).map(|a| FilterFunction::HueRotate(a.to_degrees()))
            }
        }
        "drop-shadow" => parse_drop_shadow(args),
        _ => None,
    }
}

fn parse_drop_shadow(args: &str) -> Option<FilterFunction> {
    let tokens = split_top_level(args, ' ');
    let mut lengths = Vec::new();
    let mut color = Color::BLACK;
    for token in tokens.iter().filter(|t| !t.is_empty()) {
        match try_parse_length(token) {
            Some(length) => lengths.push(length),
            None => color = Color::parse(token)?,
        }
    }
    if lengths.len() < 2 {
        return None;
    }
    Some(FilterFunction::DropShadow {
        offset_x: lengths[0],
        offset_y: lengths[1],
        blur: lengths.get(2).copied().unwrap_or(CssLength::ZERO),
        color,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memoized_identity() {
        let a = parse_filter("blur(2px) sepia(50%)");
        let b = parse_filter("blur(2px) sepia(50%)");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(
            *a,
            vec![
                FilterFunction::Blur(CssLength::px(2.0)),
                FilterFunction::Sepia(0.5)
            ]
        );
    }

    #[test]
    fn test_unknown_functions_skipped() {
        let filters = parse_filter("brightness(1.5) wobble(3) hue-rotate(90deg)");
        assert_eq!(
            *filters,
            vec![
                FilterFunction::Brightness(1.5),
                FilterFunction::HueRotate(90.0)
            ]
        );
    }

    #[test]
    fn test_drop_shadow() {
        let filters = parse_filter("drop-shadow(2px 4px 6px rgba(0, 0, 0, 0.5))");
        match &filters[0] {
            FilterFunction::DropShadow {
                offset_x,
                offset_y,
                blur,
                color,
            } => {
                assert_eq!(offset_x.value, 2.0);
                assert_eq!(offset_y.value, 4.0);
                assert_eq!(blur.value, 6.0);
                assert_eq!(color.a, 0.5);
            }
            other => panic!("expected drop shadow, got {:?}", other),
        }
        assert_eq!(filters[0].outset(), 16.0);
    }

    #[test]
    fn test_none() {
        assert!(parse_filter("none").is_empty());
        assert!(parse_filter("").is_empty());
    }
}
