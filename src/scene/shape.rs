//! Shape kinds and their dispatch table.
//!
//! Every kind has one [`ShapeSpec`] entry listing the properties that
//! describe its geometry, the built-in style defaults, and the functions
//! computing its local bounds, containment and outline length. Adding a kind
//! means adding a variant and a table row.

use std::sync::Arc;

use bitflags::bitflags;

use crate::events::hit_test;
use crate::math::{Aabb, Point, Rect};
use crate::style::{CssLength, FontSpec, LengthContext, ParsedPath, ParsedValue, TextMeasurer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Group,
    Circle,
    Ellipse,
    Rect,
    Line,
    Polyline,
    Polygon,
    Path,
    Text,
    Image,
}

impl ShapeKind {
    pub const ALL: [ShapeKind; 10] = [
        ShapeKind::Group,
        ShapeKind::Circle,
        ShapeKind::Ellipse,
        ShapeKind::Rect,
        ShapeKind::Line,
        ShapeKind::Polyline,
        ShapeKind::Polygon,
        ShapeKind::Path,
        ShapeKind::Text,
        ShapeKind::Image,
    ];

    pub fn spec(self) -> &'static ShapeSpec {
        &SHAPES[self as usize]
    }

    /// Lower-case node name, as used by tag selectors.
    pub fn tag(self) -> &'static str {
        self.spec().tag
    }

    pub fn from_tag(tag: &str) -> Option<ShapeKind> {
        ShapeKind::ALL
            .into_iter()
            .find(|k| k.tag().eq_ignore_ascii_case(tag))
    }
}

bitflags! {
    /// Which painted parts of a shape take part in hit testing.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct PointerTargets: u8 {
        const FILL   = 0b01;
        const STROKE = 0b10;
    }
}

/// Computed style lookups available to geometry and hit-test functions.
pub trait StyleSource {
    fn computed(&self, name: &str) -> Option<ParsedValue>;

    fn length_context(&self) -> LengthContext;

    fn px(&self, name: &str) -> f32 {
        self.computed(name)
            .and_then(|v| v.as_length())
            .map(|l| l.to_px(&self.length_context()))
            .unwrap_or(0.0)
    }

    fn number(&self, name: &str) -> Option<f32> {
        self.computed(name).and_then(|v| v.as_number())
    }

    fn keyword(&self, name: &str) -> Option<String> {
        self.computed(name)
            .and_then(|v| v.as_str().map(str::to_string))
    }
}

pub struct GeometryInput<'a> {
    pub style: &'a dyn StyleSource,
    pub measurer: &'a dyn TextMeasurer,
}

pub struct HitInput<'a> {
    pub style: &'a dyn StyleSource,
    /// Local geometry bounds, without stroke
    pub geometry: Option<Aabb>,
    pub targets: PointerTargets,
    /// Half of the stroke hit band, including hit slop
    pub half_width: f32,
}

pub struct ShapeSpec {
    pub kind: ShapeKind,
    pub tag: &'static str,
    /// Properties whose change reshapes the geometry.
    pub properties: &'static [&'static str],
    /// Style values the kind uses when nothing is set or inherited.
    pub defaults: &'static [(&'static str, &'static str)],
    /// Hit testing uses the bounding box regardless of fill and stroke.
    pub box_pickable: bool,
    pub geometry: fn(&GeometryInput) -> Option<Aabb>,
    pub contains: fn(&HitInput, f32, f32) -> bool,
    pub outline: fn(&dyn StyleSource) -> Option<Outline>,
}

/// A shape's outline for length queries.
pub enum Outline {
    Polyline { points: Vec<Point>, closed: bool },
    Path(Arc<ParsedPath>),
    Circle { center: Point, r: f32 },
}

impl Outline {
    pub fn total_length(&self) -> f32 {
        match self {
            Outline::Polyline { points, closed } => polyline_points(points, *closed)
                .windows(2)
                .map(|w| w[0].distance(w[1]))
                .sum(),
            Outline::Path(path) => path.total_length(),
            Outline::Circle { r, .. } => std::f32::consts::TAU * r,
        }
    }

    /// Point `length` along the outline, clamped to its ends.
    pub fn point_at_length(&self, length: f32) -> Option<Point> {
        match self {
            Outline::Path(path) => path.point_at_length(length),
            Outline::Circle { center, r } => {
                if *r <= 0.0 {
                    return Some(*center);
                }
                let angle = length.clamp(0.0, std::f32::consts::TAU * r) / r;
                Some(Point::new(center.x + r * angle.cos(), center.y + r * angle.sin()))
            }
            Outline::Polyline { points, closed } => {
                let points = polyline_points(points, *closed);
                let mut remaining = length.max(0.0);
                for w in points.windows(2) {
                    let d = w[0].distance(w[1]);
                    if remaining <= d && d > 0.0 {
                        let t = remaining / d;
                        return Some(Point::new(
                            w[0].x + (w[1].x - w[0].x) * t,
                            w[0].y + (w[1].y - w[0].y) * t,
                        ));
                    }
                    remaining -= d;
                }
                points.last().copied()
            }
        }
    }
}

fn polyline_points(points: &[Point], closed: bool) -> Vec<Point> {
    let mut out = points.to_vec();
    if closed {
        if let Some(first) = points.first() {
            out.push(*first);
        }
    }
    out
}

static SHAPES: [ShapeSpec; 10] = [
    ShapeSpec {
        kind: ShapeKind::Group,
        tag: "g",
        properties: &[],
        defaults: &[],
        box_pickable: false,
        geometry: no_geometry,
        contains: never_contains,
        outline: no_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Circle,
        tag: "circle",
        properties: &["cx", "cy", "r"],
        defaults: &[],
        box_pickable: false,
        geometry: circle_geometry,
        contains: circle_contains,
        outline: circle_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Ellipse,
        tag: "ellipse",
        properties: &["cx", "cy", "rx", "ry"],
        defaults: &[],
        box_pickable: false,
        geometry: ellipse_geometry,
        contains: ellipse_contains,
        outline: no_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Rect,
        tag: "rect",
        properties: &["x", "y", "width", "height", "radius"],
        defaults: &[],
        box_pickable: false,
        geometry: rect_geometry,
        contains: rect_contains,
        outline: rect_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Line,
        tag: "line",
        properties: &["x1", "y1", "x2", "y2"],
        defaults: &[],
        box_pickable: false,
        geometry: line_geometry,
        contains: line_contains,
        outline: line_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Polyline,
        tag: "polyline",
        properties: &["points"],
        defaults: &[],
        box_pickable: false,
        geometry: points_geometry,
        contains: polyline_contains,
        outline: polyline_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Polygon,
        tag: "polygon",
        properties: &["points"],
        defaults: &[],
        box_pickable: false,
        geometry: points_geometry,
        contains: polygon_contains,
        outline: polygon_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Path,
        tag: "path",
        properties: &["d"],
        defaults: &[],
        box_pickable: false,
        geometry: path_geometry,
        contains: path_contains,
        outline: path_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Text,
        tag: "text",
        properties: &[
            "x",
            "y",
            "text",
            "fontSize",
            "fontFamily",
            "fontWeight",
            "lineHeight",
            "letterSpacing",
            "textAlign",
            "textBaseline",
        ],
        defaults: &[("fill", "black")],
        box_pickable: true,
        geometry: text_geometry,
        contains: box_contains,
        outline: no_outline,
    },
    ShapeSpec {
        kind: ShapeKind::Image,
        tag: "image",
        properties: &["x", "y", "width", "height", "src"],
        defaults: &[],
        box_pickable: true,
        geometry: box_geometry,
        contains: box_contains,
        outline: no_outline,
    },
];

fn no_geometry(_: &GeometryInput) -> Option<Aabb> {
    None
}

fn never_contains(_: &HitInput, _: f32, _: f32) -> bool {
    false
}

fn no_outline(_: &dyn StyleSource) -> Option<Outline> {
    None
}

fn circle_geometry(input: &GeometryInput) -> Option<Aabb> {
    let s = input.style;
    let (cx, cy, r) = (s.px("cx"), s.px("cy"), s.px("r").abs());
    Some(Aabb::from_min_max((cx - r, cy - r), (cx + r, cy + r)))
}

fn circle_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let s = input.style;
    let (cx, cy, r) = (s.px("cx"), s.px("cy"), s.px("r").abs());
    let hw = input.half_width;
    let (fill, stroke) = fill_stroke(input.targets);
    match (fill, stroke) {
        (true, true) => hit_test::in_circle(cx, cy, r + hw, x, y),
        (true, false) => hit_test::in_circle(cx, cy, r, x, y),
        (false, true) => hit_test::in_circle_stroke(cx, cy, r, hw, x, y),
        (false, false) => false,
    }
}

fn circle_outline(style: &dyn StyleSource) -> Option<Outline> {
    Some(Outline::Circle {
        center: Point::new(style.px("cx"), style.px("cy")),
        r: style.px("r").abs(),
    })
}

fn ellipse_geometry(input: &GeometryInput) -> Option<Aabb> {
    let s = input.style;
    let (cx, cy, rx, ry) = (s.px("cx"), s.px("cy"), s.px("rx").abs(), s.px("ry").abs());
    Some(Aabb::from_min_max((cx - rx, cy - ry), (cx + rx, cy + ry)))
}

fn ellipse_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let s = input.style;
    let (cx, cy, rx, ry) = (s.px("cx"), s.px("cy"), s.px("rx").abs(), s.px("ry").abs());
    let hw = input.half_width;
    let (fill, stroke) = fill_stroke(input.targets);
    (fill && stroke && hit_test::in_ellipse(cx, cy, rx + hw, ry + hw, x, y))
        || (fill && hit_test::in_ellipse(cx, cy, rx, ry, x, y))
        || (stroke && hit_test::in_ellipse_stroke(cx, cy, rx, ry, hw, x, y))
}

/// The rectangle described by `x`, `y`, `width`, `height`, with negative
/// sizes flipped.
pub fn style_rect(style: &dyn StyleSource) -> Rect {
    let (x, y, w, h) = (style.px("x"), style.px("y"), style.px("width"), style.px("height"));
    Rect::new(x.min(x + w), y.min(y + h), w.abs(), h.abs())
}

/// Corner radii from the `radius` list, expanded like CSS `border-radius`.
pub fn corner_radii(style: &dyn StyleSource) -> [f32; 4] {
    let ctx = style.length_context();
    let values: Vec<f32> = match style.computed("radius") {
        Some(ParsedValue::Lengths(list)) => list.iter().map(|l| l.to_px(&ctx)).collect(),
        Some(other) => other
            .as_length()
            .map(|l: CssLength| vec![l.to_px(&ctx)])
            .unwrap_or_default(),
        None => Vec::new(),
    };
    match values.as_slice() {
        [] => [0.0; 4],
        [a] => [*a; 4],
        [a, b] => [*a, *b, *a, *b],
        [a, b, c] => [*a, *b, *c, *b],
        [a, b, c, d, ..] => [*a, *b, *c, *d],
    }
}

fn rect_geometry(input: &GeometryInput) -> Option<Aabb> {
    Some(style_rect(input.style).to_aabb())
}

fn rect_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let rect = style_rect(input.style);
    let radii = corner_radii(input.style);
    let hw = input.half_width;
    let (fill, stroke) = fill_stroke(input.targets);

    if radii.iter().all(|r| *r <= 0.0) {
        return match (fill, stroke) {
            (true, true) => hit_test::in_box(&rect.outset(hw), x, y),
            (true, false) => hit_test::in_box(&rect, x, y),
            (false, true) => hit_test::in_rect_stroke(&rect, hw, x, y),
            (false, false) => false,
        };
    }

    (stroke && hit_test::in_rounded_rect_stroke(&rect, radii, hw, x, y))
        || (fill && {
            let outline = hit_test::rounded_rect_outline(&rect, radii, 8);
            hit_test::in_polygon(&outline, false, x, y)
        })
}

fn rect_outline(style: &dyn StyleSource) -> Option<Outline> {
    let r = style_rect(style);
    Some(Outline::Polyline {
        points: vec![
            Point::new(r.left(), r.top()),
            Point::new(r.right(), r.top()),
            Point::new(r.right(), r.bottom()),
            Point::new(r.left(), r.bottom()),
        ],
        closed: true,
    })
}

fn line_points(style: &dyn StyleSource) -> (Point, Point) {
    (
        Point::new(style.px("x1"), style.px("y1")),
        Point::new(style.px("x2"), style.px("y2")),
    )
}

fn line_geometry(input: &GeometryInput) -> Option<Aabb> {
    let (a, b) = line_points(input.style);
    Aabb::from_points([(a.x, a.y), (b.x, b.y)])
}

fn line_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let (a, b) = line_points(input.style);
    input.targets.contains(PointerTargets::STROKE) && hit_test::in_line(a, b, input.half_width, x, y)
}

fn line_outline(style: &dyn StyleSource) -> Option<Outline> {
    let (a, b) = line_points(style);
    Some(Outline::Polyline {
        points: vec![a, b],
        closed: false,
    })
}

fn style_points(style: &dyn StyleSource) -> Arc<Vec<Point>> {
    match style.computed("points") {
        Some(ParsedValue::Points(points)) => points,
        _ => Arc::new(Vec::new()),
    }
}

fn points_geometry(input: &GeometryInput) -> Option<Aabb> {
    Aabb::from_points(style_points(input.style).iter().map(|p| (p.x, p.y)))
}

fn polyline_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let points = style_points(input.style);
    input.targets.contains(PointerTargets::STROKE)
        && hit_test::in_polyline(&points, false, input.half_width, x, y)
}

fn polygon_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let points = style_points(input.style);
    let (fill, stroke) = fill_stroke(input.targets);
    (fill && hit_test::in_polygon(&points, is_even_odd(input.style), x, y))
        || (stroke && hit_test::in_polyline(&points, true, input.half_width, x, y))
}

fn polyline_outline(style: &dyn StyleSource) -> Option<Outline> {
    Some(Outline::Polyline {
        points: style_points(style).to_vec(),
        closed: false,
    })
}

fn polygon_outline(style: &dyn StyleSource) -> Option<Outline> {
    Some(Outline::Polyline {
        points: style_points(style).to_vec(),
        closed: true,
    })
}

fn style_path(style: &dyn StyleSource) -> Option<Arc<ParsedPath>> {
    match style.computed("d") {
        Some(ParsedValue::Path(path)) => Some(path),
        _ => None,
    }
}

fn path_geometry(input: &GeometryInput) -> Option<Aabb> {
    let path = style_path(input.style)?;
    if path.is_empty() {
        return None;
    }
    Some(path.bounding_rect.to_aabb())
}

fn path_contains(input: &HitInput, x: f32, y: f32) -> bool {
    let Some(path) = style_path(input.style) else {
        return false;
    };
    let (fill, stroke) = fill_stroke(input.targets);
    let subpaths = path.flattened();
    if stroke
        && subpaths
            .iter()
            .any(|s| hit_test::in_polyline(&s.points, s.closed, input.half_width, x, y))
    {
        return true;
    }
    if fill {
        let rings: Vec<Vec<Point>> = subpaths.iter().map(|s| s.points.clone()).collect();
        return hit_test::in_rings(&rings, is_even_odd(input.style), x, y);
    }
    false
}

fn path_outline(style: &dyn StyleSource) -> Option<Outline> {
    style_path(style).map(Outline::Path)
}

/// Font parameters from computed text styles.
pub fn font_spec(style: &dyn StyleSource) -> FontSpec {
    let font_size = style.px("fontSize");
    let font_weight = match style.keyword("fontWeight").as_deref() {
        Some("bold") | Some("bolder") => 700,
        Some("lighter") => 300,
        Some(other) => other.parse().unwrap_or(400),
        None => 400,
    };
    let line_height = style.px("lineHeight");
    FontSpec {
        font_size: if font_size > 0.0 { font_size } else { 16.0 },
        font_family: style
            .keyword("fontFamily")
            .unwrap_or_else(|| "sans-serif".to_string()),
        font_weight,
        line_height: (line_height > 0.0).then_some(line_height),
        letter_spacing: style.px("letterSpacing"),
    }
}

fn text_geometry(input: &GeometryInput) -> Option<Aabb> {
    let s = input.style;
    let text = s.keyword("text").unwrap_or_default();
    if text.is_empty() {
        return None;
    }
    let font = font_spec(s);
    let metrics = input.measurer.measure(&text, &font);
    let (x, y) = (s.px("x"), s.px("y"));

    let left = match s.keyword("textAlign").as_deref() {
        Some("center") => x - metrics.width / 2.0,
        Some("end") | Some("right") => x - metrics.width,
        _ => x,
    };
    let top = match s.keyword("textBaseline").as_deref() {
        Some("top") | Some("hanging") => y,
        Some("middle") => y - metrics.height / 2.0,
        Some("bottom") => y - metrics.height,
        // Alphabetic baseline sits at roughly 0.8em below the line top.
        _ => y - font.font_size * 0.8,
    };
    Some(Rect::new(left, top, metrics.width, metrics.height).to_aabb())
}

fn box_geometry(input: &GeometryInput) -> Option<Aabb> {
    Some(style_rect(input.style).to_aabb())
}

fn box_contains(input: &HitInput, x: f32, y: f32) -> bool {
    !input.targets.is_empty()
        && input
            .geometry
            .is_some_and(|g| hit_test::in_box(&g.to_rect(), x, y))
}

fn fill_stroke(targets: PointerTargets) -> (bool, bool) {
    (
        targets.contains(PointerTargets::FILL),
        targets.contains(PointerTargets::STROKE),
    )
}

fn is_even_odd(style: &dyn StyleSource) -> bool {
    style.keyword("fillRule").as_deref() == Some("evenodd")
}
