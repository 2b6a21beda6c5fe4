use std::f32::consts::{PI, TAU};
use std::fmt;
use std::sync::{Arc, LazyLock, Mutex, OnceLock};

use rustc_hash::FxHashMap;

use crate::math::{Point, Rect};

/// Parsed paths keyed by raw input; entries are immutable once inserted.
static PATH_CACHE: LazyLock<Mutex<FxHashMap<String, Arc<ParsedPath>>>> =
    LazyLock::new(|| Mutex::new(FxHashMap::default()));

/// An absolute SVG path command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    HorizontalTo(f32),
    VerticalTo(f32),
    CubicTo(f32, f32, f32, f32, f32, f32),
    SmoothCubicTo(f32, f32, f32, f32),
    QuadTo(f32, f32, f32, f32),
    SmoothQuadTo(f32, f32),
    ArcTo {
        rx: f32,
        ry: f32,
        rotation: f32,
        large_arc: bool,
        sweep: bool,
        x: f32,
        y: f32,
    },
    Close,
}

impl fmt::Display for PathCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            PathCommand::MoveTo(x, y) => write!(f, "M {} {}", x, y),
            PathCommand::LineTo(x, y) => write!(f, "L {} {}", x, y),
            PathCommand::HorizontalTo(x) => write!(f, "H {}", x),
            PathCommand::VerticalTo(y) => write!(f, "V {}", y),
            PathCommand::CubicTo(x1, y1, x2, y2, x, y) => {
                write!(f, "C {} {} {} {} {} {}", x1, y1, x2, y2, x, y)
            }
            PathCommand::SmoothCubicTo(x2, y2, x, y) => write!(f, "S {} {} {} {}", x2, y2, x, y),
            PathCommand::QuadTo(x1, y1, x, y) => write!(f, "Q {} {} {} {}", x1, y1, x, y),
            PathCommand::SmoothQuadTo(x, y) => write!(f, "T {} {}", x, y),
            PathCommand::ArcTo {
                rx,
                ry,
                rotation,
                large_arc,
                sweep,
                x,
                y,
            } => write!(
                f,
                "A {} {} {} {} {} {} {}",
                rx, ry, rotation, large_arc as u8, sweep as u8, x, y
            ),
            PathCommand::Close => write!(f, "Z"),
        }
    }
}

/// Serialize commands back into path data.
pub fn format_path(commands: &[PathCommand]) -> String {
    commands
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// An elliptical arc in center parameterization.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSegment {
    pub center: Point,
    pub rx: f32,
    pub ry: f32,
    /// X-axis rotation in radians.
    pub phi: f32,
    pub start_angle: f32,
    /// Signed; positive sweeps clockwise in a y-down space.
    pub sweep_angle: f32,
}

impl ArcSegment {
    pub fn point_at_angle(&self, theta: f32) -> Point {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let (sin_t, cos_t) = theta.sin_cos();
        Point::new(
            self.center.x + self.rx * cos_phi * cos_t - self.ry * sin_phi * sin_t,
            self.center.y + self.rx * sin_phi * cos_t + self.ry * cos_phi * sin_t,
        )
    }

    pub fn point_at(&self, t: f32) -> Point {
        self.point_at_angle(self.start_angle + self.sweep_angle * t)
    }

    fn covers(&self, theta: f32) -> bool {
        let delta = if self.sweep_angle >= 0.0 {
            (theta - self.start_angle).rem_euclid(TAU)
        } else {
            (self.start_angle - theta).rem_euclid(TAU)
        };
        delta <= self.sweep_angle.abs()
    }

    /// Points where the arc reaches an extreme on X or Y.
    fn extrema(&self) -> Vec<Point> {
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let theta_x = (-self.ry * sin_phi).atan2(self.rx * cos_phi);
        let theta_y = (self.ry * cos_phi).atan2(self.rx * sin_phi);
        [theta_x, theta_x + PI, theta_y, theta_y + PI]
            .into_iter()
            .filter(|theta| self.covers(*theta))
            .map(|theta| self.point_at_angle(theta))
            .collect()
    }
}

/// Convert SVG endpoint arc parameters to center form. `None` when the arc
/// degenerates (coincident endpoints).
pub fn arc_to_center(
    from: Point,
    rx: f32,
    ry: f32,
    rotation_degrees: f32,
    large_arc: bool,
    sweep: bool,
    to: Point,
) -> Option<ArcSegment> {
    if from == to {
        return None;
    }
    let phi = rotation_degrees.to_radians();
    let (sin_phi, cos_phi) = phi.sin_cos();
    let dx2 = (from.x - to.x) / 2.0;
    let dy2 = (from.y - to.y) / 2.0;
    let x1p = cos_phi * dx2 + sin_phi * dy2;
    let y1p = -sin_phi * dx2 + cos_phi * dy2;

    let mut rx = rx.abs();
    let mut ry = ry.abs();
    let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
    if lambda > 1.0 {
        let s = lambda.sqrt();
        rx *= s;
        ry *= s;
    }

    let rx2 = rx * rx;
    let ry2 = ry * ry;
    let num = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
    let den = rx2 * y1p * y1p + ry2 * x1p * x1p;
    let sign = if large_arc == sweep { -1.0 } else { 1.0 };
    let coef = sign * (num / den).max(0.0).sqrt();
    let cxp = coef * rx * y1p / ry;
    let cyp = -coef * ry * x1p / rx;

    let center = Point::new(
        cos_phi * cxp - sin_phi * cyp + (from.x + to.x) / 2.0,
        sin_phi * cxp + cos_phi * cyp + (from.y + to.y) / 2.0,
    );

    let angle = |ux: f32, uy: f32, vx: f32, vy: f32| (ux * vy - uy * vx).atan2(ux * vx + uy * vy);
    let ux = (x1p - cxp) / rx;
    let uy = (y1p - cyp) / ry;
    let vx = (-x1p - cxp) / rx;
    let vy = (-y1p - cyp) / ry;
    let start_angle = angle(1.0, 0.0, ux, uy);
    let mut sweep_angle = angle(ux, uy, vx, vy);
    if !sweep && sweep_angle > 0.0 {
        sweep_angle -= TAU;
    } else if sweep && sweep_angle < 0.0 {
        sweep_angle += TAU;
    }

    Some(ArcSegment {
        center,
        rx,
        ry,
        phi,
        start_angle,
        sweep_angle,
    })
}

/// A path segment with shorthand commands expanded and its start point known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentKind {
    Move,
    Line,
    Quad { control: Point },
    Cubic { control1: Point, control2: Point },
    Arc(ArcSegment),
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn point_at(&self, t: f32) -> Point {
        let (p0, p3) = (self.start, self.end);
        match self.kind {
            SegmentKind::Move => p3,
            SegmentKind::Line | SegmentKind::Close => lerp(p0, p3, t),
            SegmentKind::Quad { control } => {
                let mt = 1.0 - t;
                Point::new(
                    mt * mt * p0.x + 2.0 * mt * t * control.x + t * t * p3.x,
                    mt * mt * p0.y + 2.0 * mt * t * control.y + t * t * p3.y,
                )
            }
            SegmentKind::Cubic { control1, control2 } => cubic_point(p0, control1, control2, p3, t),
            SegmentKind::Arc(arc) => arc.point_at(t),
        }
    }

    fn extrema(&self) -> Vec<Point> {
        match self.kind {
            SegmentKind::Quad { control } => {
                let mut points = Vec::new();
                for axis in 0..2 {
                    let (a, b, c) = pick(axis, self.start, control, self.end);
                    let den = a - 2.0 * b + c;
                    if den.abs() > f32::EPSILON {
                        let t = (a - b) / den;
                        if t > 0.0 && t < 1.0 {
                            points.push(self.point_at(t));
                        }
                    }
                }
                points
            }
            SegmentKind::Cubic { control1, control2 } => {
                let mut points = Vec::new();
                for axis in 0..2 {
                    let p0 = axis_of(axis, self.start);
                    let p1 = axis_of(axis, control1);
                    let p2 = axis_of(axis, control2);
                    let p3 = axis_of(axis, self.end);
                    let a = p3 - 3.0 * p2 + 3.0 * p1 - p0;
                    let b = 2.0 * (p2 - 2.0 * p1 + p0);
                    let c = p1 - p0;
                    for t in quadratic_roots(a, b, c) {
                        if t > 0.0 && t < 1.0 {
                            points.push(self.point_at(t));
                        }
                    }
                }
                points
            }
            SegmentKind::Arc(arc) => arc.extrema(),
            _ => Vec::new(),
        }
    }

    fn flatten_steps(&self) -> usize {
        match self.kind {
            SegmentKind::Quad { .. } | SegmentKind::Cubic { .. } => 16,
            SegmentKind::Arc(arc) => ((arc.sweep_angle.abs() / (PI / 16.0)).ceil() as usize).max(4),
            _ => 1,
        }
    }
}

fn lerp(a: Point, b: Point, t: f32) -> Point {
    Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t)
}

pub(crate) fn cubic_point(p0: Point, p1: Point, p2: Point, p3: Point, t: f32) -> Point {
    let mt = 1.0 - t;
    let a = mt * mt * mt;
    let b = 3.0 * mt * mt * t;
    let c = 3.0 * mt * t * t;
    let d = t * t * t;
    Point::new(
        a * p0.x + b * p1.x + c * p2.x + d * p3.x,
        a * p0.y + b * p1.y + c * p2.y + d * p3.y,
    )
}

fn axis_of(axis: usize, p: Point) -> f32 {
    if axis == 0 {
        p.x
    } else {
        p.y
    }
}

fn pick(axis: usize, a: Point, b: Point, c: Point) -> (f32, f32, f32) {
    (axis_of(axis, a), axis_of(axis, b), axis_of(axis, c))
}

fn quadratic_roots(a: f32, b: f32, c: f32) -> Vec<f32> {
    if a.abs() < 1e-9 {
        if b.abs() < 1e-9 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return Vec::new();
    }
    let sqrt = disc.sqrt();
    vec![(-b + sqrt) / (2.0 * a), (-b - sqrt) / (2.0 * a)]
}

/// A polyline approximation of one subpath.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatSubpath {
    pub points: Vec<Point>,
    pub closed: bool,
}

impl FlatSubpath {
    fn length(&self) -> f32 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }
}

/// A parsed SVG path with its derived geometry.
///
/// Instances returned by [`parse_path`] are shared, so nothing here mutates
/// after construction except the lazily filled length and flattening.
#[derive(Debug)]
pub struct ParsedPath {
    pub absolute_path: Vec<PathCommand>,
    pub segments: Vec<Segment>,
    pub has_arc: bool,
    /// Subpaths ending in a close command, as their endpoint lists.
    pub polygons: Vec<Vec<Point>>,
    /// Open subpaths, as their endpoint lists.
    pub polylines: Vec<Vec<Point>>,
    pub bounding_rect: Rect,
    total_length: OnceLock<f32>,
    flattened: OnceLock<Vec<FlatSubpath>>,
}

impl PartialEq for ParsedPath {
    fn eq(&self, other: &Self) -> bool {
        self.absolute_path == other.absolute_path
    }
}

impl ParsedPath {
    pub fn empty() -> Self {
        Self::from_commands(Vec::new())
    }

    /// Build derived geometry from already absolute commands.
    pub fn from_commands(absolute_path: Vec<PathCommand>) -> Self {
        let segments = build_segments(&absolute_path);
        let has_arc = absolute_path
            .iter()
            .any(|c| matches!(c, PathCommand::ArcTo { .. }));
        let (polygons, polylines) = extract_polygons(&segments);
        let bounding_rect = segment_bounds(&segments);

        Self {
            absolute_path,
            segments,
            has_arc,
            polygons,
            polylines,
            bounding_rect,
            total_length: OnceLock::new(),
            flattened: OnceLock::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.absolute_path.is_empty()
    }

    pub fn start_point(&self) -> Option<Point> {
        self.segments.first().map(|s| s.end)
    }

    pub fn end_point(&self) -> Option<Point> {
        self.segments.last().map(|s| s.end)
    }

    /// Flattened subpaths, computed on first use.
    pub fn flattened(&self) -> &[FlatSubpath] {
        self.flattened.get_or_init(|| flatten(&self.segments))
    }

    /// Total arc length, computed on first use.
    pub fn total_length(&self) -> f32 {
        *self
            .total_length
            .get_or_init(|| self.flattened().iter().map(FlatSubpath::length).sum())
    }

    pub fn is_length_computed(&self) -> bool {
        self.total_length.get().is_some()
    }

    /// Point at `length` along the path, clamped to its ends.
    pub fn point_at_length(&self, length: f32) -> Option<Point> {
        let mut remaining = length.max(0.0);
        let mut last = None;
        for sub in self.flattened() {
            for w in sub.points.windows(2) {
                let d = w[0].distance(w[1]);
                if remaining <= d && d > 0.0 {
                    return Some(lerp(w[0], w[1], remaining / d));
                }
                remaining -= d;
                last = Some(w[1]);
            }
            if last.is_none() {
                last = sub.points.last().copied();
            }
        }
        last
    }
}

/// Parse SVG path data, memoized by the raw string.
///
/// The same input always returns the same `Arc`. Malformed input logs a
/// warning and yields an empty path rather than failing.
pub fn parse_path(input: &str) -> Arc<ParsedPath> {
    let mut cache = PATH_CACHE.lock().unwrap_or_else(|e| e.into_inner());
    if let Some(hit) = cache.get(input) {
        return hit.clone();
    }
    let commands = match parse_path_commands(input) {
        Ok(commands) => commands,
        Err(err) => {
            log::warn!("Failed to parse path {:?}: {}", input, err);
            Vec::new()
        }
    };
    let parsed = Arc::new(ParsedPath::from_commands(commands));
    cache.insert(input.to_string(), parsed.clone());
    parsed
}

/// Parse path data into normalized absolute commands without caching.
pub fn parse_path_commands(input: &str) -> Result<Vec<PathCommand>, String> {
    let raw = tokenize(input)?;
    Ok(collapse_moves(absolutize(&raw)))
}

/// Drop move commands that draw nothing.
///
/// Consecutive moves collapse to the last one, and a move followed only by a
/// close is removed together with that close when another move follows.
fn collapse_moves(commands: Vec<PathCommand>) -> Vec<PathCommand> {
    let mut out: Vec<PathCommand> = Vec::with_capacity(commands.len());
    for command in commands {
        if let PathCommand::MoveTo(..) = command {
            let len = out.len();
            if matches!(out.last(), Some(PathCommand::MoveTo(..))) {
                out.pop();
            } else if len >= 2
                && matches!(out[len - 1], PathCommand::Close)
                && matches!(out[len - 2], PathCommand::MoveTo(..))
            {
                out.truncate(len - 2);
            }
        }
        out.push(command);
    }
    out
}

struct RawCommand {
    letter: u8,
    args: Vec<f32>,
}

fn arity(letter: u8) -> Option<usize> {
    match letter.to_ascii_lowercase() {
        b'm' | b'l' | b't' => Some(2),
        b'h' | b'v' => Some(1),
        b'c' => Some(6),
        b's' | b'q' => Some(4),
        b'a' => Some(7),
        b'z' => Some(0),
        _ => None,
    }
}

struct Lexer<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn skip_separators(&mut self) {
        while self.pos < self.bytes.len()
            && (self.bytes[self.pos].is_ascii_whitespace() || self.bytes[self.pos] == b',')
        {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn number(&mut self) -> Result<f32, String> {
        self.skip_separators();
        let start = self.pos;
        if matches!(self.peek(), Some(b'+') | Some(b'-')) {
            self.pos += 1;
        }
        let mut digits = 0;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            digits += 1;
        }
        if self.peek() == Some(b'.') {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
                digits += 1;
            }
        }
        if digits == 0 {
            return Err(format!("expected number at offset {}", start));
        }
        if matches!(self.peek(), Some(b'e') | Some(b'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some(b'+') | Some(b'-')) {
                self.pos += 1;
            }
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }
        std::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|s| s.parse::<f32>().ok())
            .ok_or_else(|| format!("invalid number at offset {}", start))
    }

    /// Arc flags may be written without separators (`a1 1 0 0110 10`).
    fn flag(&mut self) -> Result<bool, String> {
        self.skip_separators();
        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                Ok(false)
            }
            Some(b'1') => {
                self.pos += 1;
                Ok(true)
            }
            _ => Err(format!("expected arc flag at offset {}", self.pos)),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<RawCommand>, String> {
    let mut lexer = Lexer {
        bytes: input.as_bytes(),
        pos: 0,
    };
    let mut commands = Vec::new();
    let mut previous: Option<u8> = None;

    loop {
        lexer.skip_separators();
        let Some(c) = lexer.peek() else { break };

        let letter = if c.is_ascii_alphabetic() {
            lexer.pos += 1;
            c
        } else {
            // Implicit repetition of the previous command.
            match previous {
                Some(b'z') | Some(b'Z') | None => {
                    return Err(format!("unexpected {:?} at offset {}", c as char, lexer.pos))
                }
                Some(b'M') => b'L',
                Some(b'm') => b'l',
                Some(p) => p,
            }
        };
        let count = arity(letter).ok_or_else(|| format!("unknown command {:?}", letter as char))?;
        if previous.is_none() && !matches!(letter, b'M' | b'm') {
            return Err("path must start with a move command".to_string());
        }

        let mut args = Vec::with_capacity(count);
        for i in 0..count {
            let value = if letter.eq_ignore_ascii_case(&b'a') && (i == 3 || i == 4) {
                if lexer.flag()? {
                    1.0
                } else {
                    0.0
                }
            } else {
                lexer.number()?
            };
            args.push(value);
        }
        commands.push(RawCommand { letter, args });
        previous = Some(letter);
    }
    Ok(commands)
}

fn absolutize(raw: &[RawCommand]) -> Vec<PathCommand> {
    let mut out = Vec::with_capacity(raw.len());
    let (mut cx, mut cy) = (0.0f32, 0.0f32);
    let (mut sx, mut sy) = (0.0f32, 0.0f32);

    for (index, cmd) in raw.iter().enumerate() {
        let a = &cmd.args;
        // The very first move is absolute even when written lowercase.
        let relative = cmd.letter.is_ascii_lowercase() && index > 0;
        let (ox, oy) = if relative { (cx, cy) } else { (0.0, 0.0) };

        let command = match cmd.letter.to_ascii_uppercase() {
            b'M' => {
                cx = a[0] + ox;
                cy = a[1] + oy;
                sx = cx;
                sy = cy;
                PathCommand::MoveTo(cx, cy)
            }
            b'L' => {
                cx = a[0] + ox;
                cy = a[1] + oy;
                PathCommand::LineTo(cx, cy)
            }
            b'H' => {
                cx = a[0] + ox;
                PathCommand::HorizontalTo(cx)
            }
            b'V' => {
                cy = a[0] + oy;
                PathCommand::VerticalTo(cy)
            }
            b'C' => {
                let c = PathCommand::CubicTo(
                    a[0] + ox,
                    a[1] + oy,
                    a[2] + ox,
                    a[3] + oy,
                    a[4] + ox,
                    a[5] + oy,
                );
                cx = a[4] + ox;
                cy = a[5] + oy;
                c
            }
            b'S' => {
                let c = PathCommand::SmoothCubicTo(a[0] + ox, a[1] + oy, a[2] + ox, a[3] + oy);
                cx = a[2] + ox;
                cy = a[3] + oy;
                c
            }
            b'Q' => {
                let c = PathCommand::QuadTo(a[0] + ox, a[1] + oy, a[2] + ox, a[3] + oy);
                cx = a[2] + ox;
                cy = a[3] + oy;
                c
            }
            b'T' => {
                cx = a[0] + ox;
                cy = a[1] + oy;
                PathCommand::SmoothQuadTo(cx, cy)
            }
            b'A' => {
                cx = a[5] + ox;
                cy = a[6] + oy;
                PathCommand::ArcTo {
                    rx: a[0],
                    ry: a[1],
                    rotation: a[2],
                    large_arc: a[3] != 0.0,
                    sweep: a[4] != 0.0,
                    x: cx,
                    y: cy,
                }
            }
            _ => {
                cx = sx;
                cy = sy;
                PathCommand::Close
            }
        };
        out.push(command);
    }
    out
}

fn build_segments(commands: &[PathCommand]) -> Vec<Segment> {
    let mut segments = Vec::with_capacity(commands.len());
    let mut current = Point::default();
    let mut start = Point::default();
    let mut last_cubic_ctrl: Option<Point> = None;
    let mut last_quad_ctrl: Option<Point> = None;

    let reflect = |ctrl: Option<Point>, about: Point| match ctrl {
        Some(c) => Point::new(2.0 * about.x - c.x, 2.0 * about.y - c.y),
        None => about,
    };

    for command in commands {
        let (kind, end) = match *command {
            PathCommand::MoveTo(x, y) => {
                start = Point::new(x, y);
                (SegmentKind::Move, start)
            }
            PathCommand::LineTo(x, y) => (SegmentKind::Line, Point::new(x, y)),
            PathCommand::HorizontalTo(x) => (SegmentKind::Line, Point::new(x, current.y)),
            PathCommand::VerticalTo(y) => (SegmentKind::Line, Point::new(current.x, y)),
            PathCommand::CubicTo(x1, y1, x2, y2, x, y) => (
                SegmentKind::Cubic {
                    control1: Point::new(x1, y1),
                    control2: Point::new(x2, y2),
                },
                Point::new(x, y),
            ),
            PathCommand::SmoothCubicTo(x2, y2, x, y) => (
                SegmentKind::Cubic {
                    control1: reflect(last_cubic_ctrl, current),
                    control2: Point::new(x2, y2),
                },
                Point::new(x, y),
            ),
            PathCommand::QuadTo(x1, y1, x, y) => (
                SegmentKind::Quad {
                    control: Point::new(x1, y1),
                },
                Point::new(x, y),
            ),
            PathCommand::SmoothQuadTo(x, y) => (
                SegmentKind::Quad {
                    control: reflect(last_quad_ctrl, current),
                },
                Point::new(x, y),
            ),
            PathCommand::ArcTo {
                rx,
                ry,
                rotation,
                large_arc,
                sweep,
                x,
                y,
            } => {
                let end = Point::new(x, y);
                if rx == 0.0 || ry == 0.0 {
                    (SegmentKind::Line, end)
                } else {
                    match arc_to_center(current, rx, ry, rotation, large_arc, sweep, end) {
                        Some(arc) => (SegmentKind::Arc(arc), end),
                        // Zero-length arcs draw nothing.
                        None => continue,
                    }
                }
            }
            PathCommand::Close => (SegmentKind::Close, start),
        };

        last_cubic_ctrl = match kind {
            SegmentKind::Cubic { control2, .. } => Some(control2),
            _ => None,
        };
        last_quad_ctrl = match kind {
            SegmentKind::Quad { control } => Some(control),
            _ => None,
        };

        segments.push(Segment {
            kind,
            start: current,
            end,
        });
        current = end;
    }
    segments
}

fn extract_polygons(segments: &[Segment]) -> (Vec<Vec<Point>>, Vec<Vec<Point>>) {
    let mut polygons = Vec::new();
    let mut polylines = Vec::new();
    let mut points: Vec<Point> = Vec::new();

    for segment in segments {
        match segment.kind {
            SegmentKind::Move => {
                if points.len() > 1 {
                    polylines.push(std::mem::take(&mut points));
                }
                points.clear();
                points.push(segment.end);
            }
            SegmentKind::Close => {
                if points.len() > 1 {
                    polygons.push(std::mem::take(&mut points));
                }
                points.clear();
                points.push(segment.end);
            }
            _ => points.push(segment.end),
        }
    }
    if points.len() > 1 {
        polylines.push(points);
    }
    (polygons, polylines)
}

fn segment_bounds(segments: &[Segment]) -> Rect {
    let mut min = Point::new(f32::INFINITY, f32::INFINITY);
    let mut max = Point::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    let mut include = |p: Point| {
        min = Point::new(min.x.min(p.x), min.y.min(p.y));
        max = Point::new(max.x.max(p.x), max.y.max(p.y));
    };

    for segment in segments {
        if segment.kind == SegmentKind::Move {
            continue;
        }
        include(segment.start);
        include(segment.end);
        for p in segment.extrema() {
            include(p);
        }
    }

    if min.x.is_finite() {
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    } else {
        Rect::default()
    }
}

fn flatten(segments: &[Segment]) -> Vec<FlatSubpath> {
    let mut subpaths = Vec::new();
    let mut current = FlatSubpath {
        points: Vec::new(),
        closed: false,
    };

    for segment in segments {
        match segment.kind {
            SegmentKind::Move => {
                if current.points.len() > 1 {
                    subpaths.push(std::mem::replace(
                        &mut current,
                        FlatSubpath {
                            points: Vec::new(),
                            closed: false,
                        },
                    ));
                }
                current.points.clear();
                current.points.push(segment.end);
            }
            SegmentKind::Close => {
                current.points.push(segment.end);
                current.closed = true;
                if current.points.len() > 1 {
                    subpaths.push(std::mem::replace(
                        &mut current,
                        FlatSubpath {
                            points: Vec::new(),
                            closed: false,
                        },
                    ));
                }
                current.points.clear();
                current.points.push(segment.end);
            }
            _ => {
                if current.points.is_empty() {
                    current.points.push(segment.start);
                }
                let steps = segment.flatten_steps();
                for i in 1..=steps {
                    current.points.push(segment.point_at(i as f32 / steps as f32));
                }
            }
        }
    }
    if current.points.len() > 1 {
        subpaths.push(current);
    }
    subpaths
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_memoized_identity() {
        let a = parse_path("M 0 0 L 10 10 Z");
        let b = parse_path("M 0 0 L 10 10 Z");
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_redundant_moves_collapse() {
        let path = parse_path("M 0 0 M 0 0 M 0 0 L 100 100");
        assert_eq!(
            path.absolute_path,
            vec![PathCommand::MoveTo(0.0, 0.0), PathCommand::LineTo(100.0, 100.0)]
        );
        // Parsing the collapsed form gives the same commands.
        let again = parse_path(&format_path(&path.absolute_path));
        assert_eq!(again.absolute_path, path.absolute_path);
    }

    #[test]
    fn test_empty_subpath_dropped() {
        let path = parse_path("M 5 5 Z M 10 10 L 20 20");
        assert_eq!(
            path.absolute_path,
            vec![PathCommand::MoveTo(10.0, 10.0), PathCommand::LineTo(20.0, 20.0)]
        );
    }

    #[test]
    fn test_relative_commands() {
        let path = parse_path("m10 10 l10 0 v10 h-10z");
        assert_eq!(
            path.absolute_path,
            vec![
                PathCommand::MoveTo(10.0, 10.0),
                PathCommand::LineTo(20.0, 10.0),
                PathCommand::VerticalTo(20.0),
                PathCommand::HorizontalTo(10.0),
                PathCommand::Close,
            ]
        );
        assert_eq!(path.polygons.len(), 1);
        assert_eq!(path.polygons[0].len(), 4);
        assert!(path.polylines.is_empty());
        assert_eq!(path.bounding_rect, Rect::new(10.0, 10.0, 10.0, 10.0));
    }

    #[test]
    fn test_implicit_lineto_and_compact_numbers() {
        let path = parse_path("M0,0 10-10.5.5,0");
        assert_eq!(
            path.absolute_path,
            vec![
                PathCommand::MoveTo(0.0, 0.0),
                PathCommand::LineTo(10.0, -10.5),
                PathCommand::LineTo(0.5, 0.0)
            ]
        );
    }

    #[test]
    fn test_polyline_extraction() {
        let path = parse_path("M 0 0 L 10 0 M 20 0 L 30 0 L 30 10 Z");
        assert_eq!(path.polylines.len(), 1);
        assert_eq!(path.polygons.len(), 1);
    }

    #[test]
    fn test_malformed_is_empty() {
        assert!(parse_path("L 10 10").is_empty());
        assert!(parse_path("M 0 0 L 10").is_empty());
        assert!(parse_path("M 0 0 X 1 1").is_empty());
        assert_eq!(parse_path("garbage").bounding_rect, Rect::default());
    }

    #[test]
    fn test_cubic_bounds_use_extrema() {
        let path = parse_path("M 0 0 C 0 100 100 100 100 0");
        let rect = path.bounding_rect;
        assert!(approx_eq(rect.height, 75.0));
        assert!(approx_eq(rect.width, 100.0));
    }

    #[test]
    fn test_arc_bounds() {
        // Upper half of a circle of radius 50 centered at (50, 0).
        let path = parse_path("M 0 0 A 50 50 0 0 1 100 0");
        assert!(path.has_arc);
        let rect = path.bounding_rect;
        assert!(approx_eq(rect.x, 0.0));
        assert!(approx_eq(rect.y, -50.0));
        assert!(approx_eq(rect.height, 50.0));
    }

    #[test]
    fn test_lazy_length() {
        let path = ParsedPath::from_commands(vec![
            PathCommand::MoveTo(0.0, 0.0),
            PathCommand::LineTo(30.0, 0.0),
            PathCommand::LineTo(30.0, 40.0),
        ]);
        assert!(!path.is_length_computed());
        assert!(approx_eq(path.total_length(), 70.0));
        assert!(path.is_length_computed());

        let p = path.point_at_length(50.0).unwrap();
        assert!(approx_eq(p.x, 30.0));
        assert!(approx_eq(p.y, 20.0));
        let end = path.point_at_length(500.0).unwrap();
        assert!(approx_eq(end.y, 40.0));
    }

    #[test]
    fn test_arc_length() {
        let path = parse_path("M 0 0 A 50 50 0 0 1 100 0");
        assert!((path.total_length() - 50.0 * PI).abs() < 0.5);
    }

    #[test]
    fn test_smooth_cubic_reflects_control() {
        let path = parse_path("M 0 0 C 0 10 10 10 10 0 S 20 -10 20 0");
        match path.segments[2].kind {
            SegmentKind::Cubic { control1, .. } => {
                assert_eq!(control1, Point::new(10.0, -10.0));
            }
            other => panic!("unexpected segment {:?}", other),
        }
    }
}
