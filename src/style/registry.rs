use std::sync::{Arc, LazyLock};

use bitflags::bitflags;
use rustc_hash::FxHashMap;

use crate::math::Point;
use crate::transform_origin::TransformOrigin;

use super::color::parse_paint;
use super::filter::parse_filter;
use super::length::{parse_length, parse_lengths};
use super::path::parse_path;
use super::path_morph::merge_paths;
use super::transform::parse_transform;
use super::value::{ParsedValue, StyleValue};

bitflags! {
    /// What a style change invalidates on its element.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct DirtyFlags: u8 {
        /// Shape geometry (and the derived local bounds) changed
        const GEOMETRY  = 0b0_0001;
        /// Local matrix inputs changed
        const TRANSFORM = 0b0_0010;
        /// Appearance changed without moving anything
        const PAINT     = 0b0_0100;
        /// World and render bounds must be recomputed
        const BOUNDS    = 0b0_1000;
        /// Paint order changed
        const ORDER     = 0b1_0000;
    }
}

const SHAPE: DirtyFlags = DirtyFlags::GEOMETRY
    .union(DirtyFlags::BOUNDS)
    .union(DirtyFlags::PAINT);
const PAINT: DirtyFlags = DirtyFlags::PAINT;
const PAINT_BOUNDS: DirtyFlags = DirtyFlags::PAINT.union(DirtyFlags::BOUNDS);
const TRANSFORM: DirtyFlags = DirtyFlags::TRANSFORM
    .union(DirtyFlags::BOUNDS)
    .union(DirtyFlags::PAINT);
const ORDER: DirtyFlags = DirtyFlags::ORDER.union(DirtyFlags::PAINT);
const NONE: DirtyFlags = DirtyFlags::empty();

/// How a property's raw value is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Number,
    Length,
    Lengths,
    Paint,
    Path,
    Points,
    Filter,
    Transform,
    TransformOrigin,
    Keyword,
    Text,
    Bool,
}

#[derive(Debug)]
pub struct PropertyDef {
    pub name: &'static str,
    pub syntax: Syntax,
    pub inherited: bool,
    /// Raw initial value, parsed with the property's own parser.
    pub initial: Option<&'static str>,
    pub affects: DirtyFlags,
    pub interpolable: bool,
}

const fn prop(
    name: &'static str,
    syntax: Syntax,
    inherited: bool,
    initial: Option<&'static str>,
    affects: DirtyFlags,
    interpolable: bool,
) -> PropertyDef {
    PropertyDef {
        name,
        syntax,
        inherited,
        initial,
        affects,
        interpolable,
    }
}

pub static PROPERTIES: &[PropertyDef] = &[
    // geometry
    prop("cx", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("cy", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("r", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("rx", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("ry", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("x", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("y", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("width", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("height", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("x1", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("y1", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("x2", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("y2", Syntax::Length, false, Some("0"), SHAPE, true),
    prop("radius", Syntax::Lengths, false, Some("0"), SHAPE, true),
    prop("d", Syntax::Path, false, Some(""), SHAPE, true),
    prop("points", Syntax::Points, false, Some(""), SHAPE, true),
    prop("text", Syntax::Text, false, Some(""), SHAPE, false),
    prop("src", Syntax::Text, false, Some(""), PAINT, false),
    // paint
    prop("fill", Syntax::Paint, true, Some("none"), PAINT, true),
    prop("stroke", Syntax::Paint, true, Some("none"), PAINT_BOUNDS, true),
    prop("opacity", Syntax::Number, false, Some("1"), PAINT, true),
    prop("fillOpacity", Syntax::Number, true, Some("1"), PAINT, true),
    prop("strokeOpacity", Syntax::Number, true, Some("1"), PAINT, true),
    prop("lineWidth", Syntax::Length, true, Some("1"), PAINT_BOUNDS, true),
    prop("lineDash", Syntax::Lengths, true, Some(""), PAINT, true),
    prop("lineDashOffset", Syntax::Length, true, Some("0"), PAINT, true),
    prop("lineCap", Syntax::Keyword, true, Some("butt"), PAINT, false),
    prop("lineJoin", Syntax::Keyword, true, Some("miter"), PAINT, false),
    prop("miterLimit", Syntax::Number, true, Some("10"), PAINT, true),
    prop("fillRule", Syntax::Keyword, true, Some("nonzero"), PAINT, false),
    prop("shadowColor", Syntax::Paint, false, Some("none"), PAINT, true),
    prop("shadowBlur", Syntax::Number, false, Some("0"), PAINT_BOUNDS, true),
    prop("shadowOffsetX", Syntax::Length, false, Some("0"), PAINT_BOUNDS, true),
    prop("shadowOffsetY", Syntax::Length, false, Some("0"), PAINT_BOUNDS, true),
    prop("filter", Syntax::Filter, false, Some("none"), PAINT_BOUNDS, false),
    prop("visibility", Syntax::Keyword, true, Some("visible"), PAINT, false),
    prop("zIndex", Syntax::Number, false, Some("0"), ORDER, false),
    // transform
    prop("transform", Syntax::Transform, false, Some("none"), TRANSFORM, false),
    prop("transformOrigin", Syntax::TransformOrigin, false, None, TRANSFORM, false),
    // text
    prop("fontSize", Syntax::Length, true, Some("16px"), SHAPE, true),
    prop("fontFamily", Syntax::Text, true, Some("sans-serif"), SHAPE, false),
    prop("fontWeight", Syntax::Keyword, true, Some("normal"), SHAPE, false),
    prop("fontStyle", Syntax::Keyword, true, Some("normal"), SHAPE, false),
    prop("textAlign", Syntax::Keyword, true, Some("start"), SHAPE, false),
    prop("textBaseline", Syntax::Keyword, true, Some("alphabetic"), SHAPE, false),
    prop("lineHeight", Syntax::Length, true, Some("0"), SHAPE, true),
    prop("letterSpacing", Syntax::Length, true, Some("0"), SHAPE, true),
    // interaction
    prop("increasedLineWidthForHitTesting", Syntax::Length, false, Some("0"), DirtyFlags::BOUNDS, false),
    prop("pointerEvents", Syntax::Keyword, true, Some("auto"), NONE, false),
    prop("cursor", Syntax::Keyword, true, Some("default"), NONE, false),
    prop("draggable", Syntax::Bool, false, Some("false"), NONE, false),
    prop("droppable", Syntax::Bool, false, Some("false"), NONE, false),
];

static LOOKUP: LazyLock<FxHashMap<&'static str, &'static PropertyDef>> =
    LazyLock::new(|| PROPERTIES.iter().map(|p| (p.name, p)).collect());

pub fn property(name: &str) -> Option<&'static PropertyDef> {
    LOOKUP.get(name).copied()
}

/// Invalidation caused by changing `name`. Unknown properties only repaint.
pub fn affects(name: &str) -> DirtyFlags {
    property(name).map(|p| p.affects).unwrap_or(DirtyFlags::PAINT)
}

pub fn is_inherited(name: &str) -> bool {
    property(name).is_some_and(|p| p.inherited)
}

pub fn initial_value(def: &PropertyDef) -> Option<ParsedValue> {
    def.initial
        .map(|raw| parse_raw(def.syntax, &StyleValue::Str(raw.to_string())))
}

/// Parse a raw value for `name`, applying the CSS-wide keywords.
///
/// `inherit` and `initial` become markers resolved at read time. `unset`
/// behaves like `inherit` for inherited properties; for paths it resets to an
/// empty path and for everything else to `initial`.
pub fn parse_style(name: &str, raw: &StyleValue) -> ParsedValue {
    let def = property(name);
    if let Some(keyword) = raw.keyword() {
        return match keyword {
            "inherit" => ParsedValue::Inherit,
            "unset" => match def {
                Some(d) if d.inherited => ParsedValue::Inherit,
                Some(d) if d.syntax == Syntax::Path => ParsedValue::Path(parse_path("")),
                _ => ParsedValue::Initial,
            },
            _ => ParsedValue::Initial,
        };
    }
    match def {
        Some(def) => parse_raw(def.syntax, raw),
        None => parse_unknown(raw),
    }
}

fn parse_unknown(raw: &StyleValue) -> ParsedValue {
    match raw {
        StyleValue::Null => ParsedValue::Initial,
        StyleValue::Number(n) => ParsedValue::Number(*n),
        StyleValue::Str(s) => ParsedValue::Text(s.clone()),
        StyleValue::Bool(b) => ParsedValue::Bool(*b),
        StyleValue::Points(p) => ParsedValue::Points(to_points(p)),
    }
}

fn to_points(points: &[(f32, f32)]) -> Arc<Vec<Point>> {
    Arc::new(points.iter().map(|(x, y)| Point::new(*x, *y)).collect())
}

fn parse_number(raw: &StyleValue) -> Option<f32> {
    match raw {
        StyleValue::Number(n) => Some(*n),
        StyleValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        StyleValue::Str(s) => {
            let s = s.trim();
            match s.strip_suffix('%') {
                Some(p) => p.trim().parse::<f32>().ok().map(|v| v / 100.0),
                None => s.parse::<f32>().ok(),
            }
        }
        _ => None,
    }
}

fn parse_point_list(input: &str) -> Arc<Vec<Point>> {
    let numbers: Vec<f32> = input
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            let n = s.parse::<f32>().ok();
            if n.is_none() {
                log::warn!("Skipping invalid coordinate {:?} in points {:?}", s, input);
            }
            n
        })
        .collect();
    if numbers.len() % 2 != 0 {
        log::warn!("Odd coordinate count in points {:?}, dropping the last", input);
    }
    Arc::new(
        numbers
            .chunks_exact(2)
            .map(|c| Point::new(c[0], c[1]))
            .collect(),
    )
}

fn parse_raw(syntax: Syntax, raw: &StyleValue) -> ParsedValue {
    if *raw == StyleValue::Null {
        return ParsedValue::Initial;
    }
    match syntax {
        Syntax::Number => match parse_number(raw) {
            Some(n) => ParsedValue::Number(n),
            None => {
                log::warn!("Invalid number {:?}", raw);
                ParsedValue::Initial
            }
        },
        Syntax::Length => ParsedValue::Length(parse_length(Some(raw))),
        Syntax::Lengths => ParsedValue::Lengths(parse_lengths(raw)),
        Syntax::Paint => ParsedValue::Paint(parse_paint(raw)),
        Syntax::Path => ParsedValue::Path(parse_path(raw.as_str().unwrap_or(""))),
        Syntax::Points => match raw {
            StyleValue::Points(p) => ParsedValue::Points(to_points(p)),
            StyleValue::Str(s) => ParsedValue::Points(parse_point_list(s)),
            _ => ParsedValue::Points(Arc::new(Vec::new())),
        },
        Syntax::Filter => ParsedValue::Filters(parse_filter(raw.as_str().unwrap_or(""))),
        Syntax::Transform => {
            ParsedValue::Transform(Arc::new(parse_transform(raw.as_str().unwrap_or(""))))
        }
        Syntax::TransformOrigin => match raw.as_str().and_then(TransformOrigin::parse) {
            Some(origin) => ParsedValue::Origin(origin),
            None => {
                log::warn!("Invalid transform origin {:?}", raw);
                ParsedValue::Initial
            }
        },
        Syntax::Keyword => match raw {
            StyleValue::Str(s) => ParsedValue::Keyword(s.trim().to_string()),
            StyleValue::Number(n) => ParsedValue::Keyword(n.to_string()),
            StyleValue::Bool(b) => ParsedValue::Keyword(b.to_string()),
            _ => ParsedValue::Initial,
        },
        Syntax::Text => match raw {
            StyleValue::Str(s) => ParsedValue::Text(s.clone()),
            StyleValue::Number(n) => ParsedValue::Text(n.to_string()),
            StyleValue::Bool(b) => ParsedValue::Text(b.to_string()),
            _ => ParsedValue::Initial,
        },
        Syntax::Bool => match raw {
            StyleValue::Bool(b) => ParsedValue::Bool(*b),
            StyleValue::Number(n) => ParsedValue::Bool(*n != 0.0),
            StyleValue::Str(s) => ParsedValue::Bool(s.trim() == "true"),
            _ => ParsedValue::Initial,
        },
    }
}

/// Interpolate two computed values of `name` at `t` in `[0, 1]`.
///
/// `None` when the property does not animate or the values are not
/// compatible (different units, gradient paints, mismatched list lengths).
pub fn interpolate(name: &str, from: &ParsedValue, to: &ParsedValue, t: f32) -> Option<ParsedValue> {
    if !property(name)?.interpolable {
        return None;
    }
    let lerp = |a: f32, b: f32| a + (b - a) * t;
    match (from, to) {
        (ParsedValue::Number(a), ParsedValue::Number(b)) => Some(ParsedValue::Number(lerp(*a, *b))),
        (ParsedValue::Length(a), ParsedValue::Length(b)) => a.mix(b, t).map(ParsedValue::Length),
        (ParsedValue::Lengths(a), ParsedValue::Lengths(b)) if a.len() == b.len() => a
            .iter()
            .zip(b)
            .map(|(a, b)| a.mix(b, t))
            .collect::<Option<Vec<_>>>()
            .map(ParsedValue::Lengths),
        (ParsedValue::Paint(a), ParsedValue::Paint(b)) => a.mix(b, t).map(ParsedValue::Paint),
        (ParsedValue::Points(a), ParsedValue::Points(b)) if a.len() == b.len() => {
            Some(ParsedValue::Points(Arc::new(
                a.iter()
                    .zip(b.iter())
                    .map(|(p, q)| Point::new(lerp(p.x, q.x), lerp(p.y, q.y)))
                    .collect(),
            )))
        }
        (ParsedValue::Path(a), ParsedValue::Path(b)) => {
            Some(ParsedValue::Path(Arc::new(merge_paths(a, b).path_at(t))))
        }
        _ => None,
    }
}
