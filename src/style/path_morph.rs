use std::f32::consts::FRAC_PI_2;

use crate::math::Point;

use super::path::{cubic_point, format_path, ArcSegment, ParsedPath, PathCommand, SegmentKind};

/// A path made only of cubic curves after an initial move.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicPath {
    pub start: Point,
    /// Each curve is `[control1, control2, end]`.
    pub curves: Vec<[Point; 3]>,
}

impl CubicPath {
    /// Convert every segment to cubic form. Lines and closes are degree
    /// elevated, quads raised, arcs split into quarter-turn pieces, and
    /// later subpaths joined by straight cubics.
    pub fn from_path(path: &ParsedPath) -> Self {
        let mut start = None;
        let mut current = Point::default();
        let mut curves = Vec::new();

        for segment in &path.segments {
            match segment.kind {
                SegmentKind::Move if start.is_none() => {
                    start = Some(segment.end);
                }
                SegmentKind::Move | SegmentKind::Line | SegmentKind::Close => {
                    curves.push(line_curve(current, segment.end));
                }
                SegmentKind::Quad { control } => {
                    let (p0, p3) = (current, segment.end);
                    curves.push([
                        Point::new(
                            p0.x + 2.0 / 3.0 * (control.x - p0.x),
                            p0.y + 2.0 / 3.0 * (control.y - p0.y),
                        ),
                        Point::new(
                            p3.x + 2.0 / 3.0 * (control.x - p3.x),
                            p3.y + 2.0 / 3.0 * (control.y - p3.y),
                        ),
                        p3,
                    ]);
                }
                SegmentKind::Cubic { control1, control2 } => {
                    curves.push([control1, control2, segment.end]);
                }
                SegmentKind::Arc(arc) => {
                    curves.extend(arc_curves(&arc));
                    // Keep the exact endpoint rather than the evaluated one.
                    if let Some(last) = curves.last_mut() {
                        last[2] = segment.end;
                    }
                }
            }
            current = segment.end;
        }

        Self {
            start: start.unwrap_or_default(),
            curves,
        }
    }

    pub fn end(&self) -> Point {
        self.curves.last().map(|c| c[2]).unwrap_or(self.start)
    }

    /// Shoelace area over the on-curve points. Positive is clockwise in y-down space.
    pub fn signed_area(&self) -> f32 {
        let mut points = Vec::with_capacity(self.curves.len() + 1);
        points.push(self.start);
        points.extend(self.curves.iter().map(|c| c[2]));
        let n = points.len();
        if n < 3 {
            return 0.0;
        }
        (0..n)
            .map(|i| {
                let (a, b) = (points[i], points[(i + 1) % n]);
                a.x * b.y - b.x * a.y
            })
            .sum::<f32>()
            / 2.0
    }

    pub fn reversed(&self) -> Self {
        let mut curves = Vec::with_capacity(self.curves.len());
        let mut from = self.start;
        let mut pieces = Vec::with_capacity(self.curves.len());
        for c in &self.curves {
            pieces.push((from, *c));
            from = c[2];
        }
        for (from, c) in pieces.into_iter().rev() {
            curves.push([c[1], c[0], from]);
        }
        Self {
            start: self.end(),
            curves,
        }
    }

    fn curve_start(&self, index: usize) -> Point {
        if index == 0 {
            self.start
        } else {
            self.curves[index - 1][2]
        }
    }

    /// Control polygon length, an upper bound on the curve length.
    fn curve_weight(&self, index: usize) -> f32 {
        let p0 = self.curve_start(index);
        let [c1, c2, p3] = self.curves[index];
        p0.distance(c1) + c1.distance(c2) + c2.distance(p3)
    }

    /// Split the longest curve at its midpoint.
    fn split_longest(&mut self) {
        if self.curves.is_empty() {
            self.curves.push([self.start, self.start, self.start]);
            return;
        }
        let mut longest = 0;
        let mut weight = f32::NEG_INFINITY;
        for i in 0..self.curves.len() {
            let w = self.curve_weight(i);
            if w > weight {
                weight = w;
                longest = i;
            }
        }
        let (first, second) = split_curve(self.curve_start(longest), self.curves[longest], 0.5);
        self.curves[longest] = first;
        self.curves.insert(longest + 1, second);
    }

    /// Flat `[x, y, ...]` values: the start point, then six per curve.
    pub fn to_values(&self) -> Vec<f32> {
        let mut values = Vec::with_capacity(2 + self.curves.len() * 6);
        values.push(self.start.x);
        values.push(self.start.y);
        for c in &self.curves {
            for p in c {
                values.push(p.x);
                values.push(p.y);
            }
        }
        values
    }
}

fn line_curve(from: Point, to: Point) -> [Point; 3] {
    [
        Point::new(from.x + (to.x - from.x) / 3.0, from.y + (to.y - from.y) / 3.0),
        Point::new(
            from.x + (to.x - from.x) * 2.0 / 3.0,
            from.y + (to.y - from.y) * 2.0 / 3.0,
        ),
        to,
    ]
}

fn arc_curves(arc: &ArcSegment) -> Vec<[Point; 3]> {
    // The small bias keeps an exact half turn at two pieces despite rounding.
    let pieces = (arc.sweep_angle.abs() / FRAC_PI_2 - 1e-3).ceil().max(1.0) as usize;
    let step = arc.sweep_angle / pieces as f32;
    let k = 4.0 / 3.0 * (step / 4.0).tan();
    let (sin_phi, cos_phi) = arc.phi.sin_cos();
    let derivative = |theta: f32| {
        let (sin_t, cos_t) = theta.sin_cos();
        Point::new(
            -arc.rx * cos_phi * sin_t - arc.ry * sin_phi * cos_t,
            -arc.rx * sin_phi * sin_t + arc.ry * cos_phi * cos_t,
        )
    };

    (0..pieces)
        .map(|i| {
            let a0 = arc.start_angle + step * i as f32;
            let a1 = a0 + step;
            let (p0, p3) = (arc.point_at_angle(a0), arc.point_at_angle(a1));
            let (d0, d1) = (derivative(a0), derivative(a1));
            [
                Point::new(p0.x + k * d0.x, p0.y + k * d0.y),
                Point::new(p3.x - k * d1.x, p3.y - k * d1.y),
                p3,
            ]
        })
        .collect()
}

/// De Casteljau split of one cubic at `t`.
fn split_curve(p0: Point, curve: [Point; 3], t: f32) -> ([Point; 3], [Point; 3]) {
    let [p1, p2, p3] = curve;
    let lerp = |a: Point, b: Point| Point::new(a.x + (b.x - a.x) * t, a.y + (b.y - a.y) * t);
    let p01 = lerp(p0, p1);
    let p12 = lerp(p1, p2);
    let p23 = lerp(p2, p3);
    let p012 = lerp(p01, p12);
    let p123 = lerp(p12, p23);
    let mid = cubic_point(p0, p1, p2, p3, t);
    ([p01, p012, mid], [p123, p23, p3])
}

/// Give both paths the same number of cubic curves by subdividing the
/// longest curves of the shorter one.
pub fn equalize_segments(left: &mut CubicPath, right: &mut CubicPath) {
    while left.curves.len() < right.curves.len() {
        left.split_longest();
    }
    while right.curves.len() < left.curves.len() {
        right.split_longest();
    }
}

/// Turns interpolated values back into path commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathFormatter {
    pub curve_count: usize,
}

impl PathFormatter {
    pub fn format(&self, values: &[f32]) -> Vec<PathCommand> {
        let mut commands = Vec::with_capacity(self.curve_count + 1);
        if values.len() < 2 + self.curve_count * 6 {
            return commands;
        }
        commands.push(PathCommand::MoveTo(values[0], values[1]));
        for c in values[2..].chunks_exact(6).take(self.curve_count) {
            commands.push(PathCommand::CubicTo(c[0], c[1], c[2], c[3], c[4], c[5]));
        }
        commands
    }

    pub fn to_path_string(&self, values: &[f32]) -> String {
        format_path(&self.format(values))
    }
}

/// Two paths prepared for pointwise interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedPaths {
    pub left: Vec<f32>,
    pub right: Vec<f32>,
    pub formatter: PathFormatter,
}

impl MergedPaths {
    pub fn interpolate(&self, t: f32) -> Vec<f32> {
        self.left
            .iter()
            .zip(&self.right)
            .map(|(a, b)| a + (b - a) * t)
            .collect()
    }

    pub fn path_at(&self, t: f32) -> ParsedPath {
        ParsedPath::from_commands(self.formatter.format(&self.interpolate(t)))
    }
}

/// Prepare two paths for morphing.
///
/// Both are converted to cubic curves and equalized to the same curve count.
/// When both enclose a non-zero area with opposite winding, the right path
/// is reversed so the morph does not turn inside out.
pub fn merge_paths(left: &ParsedPath, right: &ParsedPath) -> MergedPaths {
    let mut a = CubicPath::from_path(left);
    let mut b = CubicPath::from_path(right);

    let (area_a, area_b) = (a.signed_area(), b.signed_area());
    if area_a != 0.0 && area_b != 0.0 && area_a.signum() != area_b.signum() {
        b = b.reversed();
    }

    equalize_segments(&mut a, &mut b);

    MergedPaths {
        formatter: PathFormatter {
            curve_count: a.curves.len(),
        },
        left: a.to_values(),
        right: b.to_values(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::path::parse_path;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_merge_lines() {
        let merged = merge_paths(&parse_path("M 0 0 L 100 0"), &parse_path("M 0 0 L 200 0"));
        let left = merged.formatter.format(&merged.left);
        let right = merged.formatter.format(&merged.right);
        assert_eq!(left.len(), right.len());
        assert_eq!(left[0], PathCommand::MoveTo(0.0, 0.0));
        assert_eq!(right[0], PathCommand::MoveTo(0.0, 0.0));
        match (left[1], right[1]) {
            (PathCommand::CubicTo(x1, _, _, _, x, y), PathCommand::CubicTo(_, _, _, _, rx, ry)) => {
                assert!(approx_eq(x1, 100.0 / 3.0));
                assert_eq!((x, y), (100.0, 0.0));
                assert_eq!((rx, ry), (200.0, 0.0));
            }
            other => panic!("expected cubic segments, got {:?}", other),
        }
    }

    #[test]
    fn test_equalize_counts() {
        let merged = merge_paths(
            &parse_path("M 0 0 L 10 0 L 10 10 L 0 10 Z"),
            &parse_path("M 0 0 L 50 0"),
        );
        assert_eq!(merged.left.len(), merged.right.len());
        assert_eq!(merged.formatter.curve_count, 4);
        let right = merged.formatter.format(&merged.right);
        // The split path still ends where it did.
        match right.last() {
            Some(PathCommand::CubicTo(_, _, _, _, x, y)) => {
                assert!(approx_eq(*x, 50.0));
                assert!(approx_eq(*y, 0.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_winding_alignment() {
        let clockwise = parse_path("M 0 0 L 10 0 L 10 10 L 0 10 Z");
        let counter = parse_path("M 0 0 L 0 10 L 10 10 L 10 0 Z");
        let a = CubicPath::from_path(&clockwise);
        let b = CubicPath::from_path(&counter);
        assert!(a.signed_area() * b.signed_area() < 0.0);

        let merged = merge_paths(&clockwise, &counter);
        let right = MergedPaths {
            left: merged.right.clone(),
            right: merged.right.clone(),
            formatter: merged.formatter,
        }
        .path_at(0.0);
        let area = CubicPath::from_path(&right).signed_area();
        assert!(area * a.signed_area() > 0.0);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let merged = merge_paths(&parse_path("M 0 0 L 100 0"), &parse_path("M 0 0 L 200 0"));
        let mid = merged.path_at(0.5);
        assert_eq!(mid.end_point(), Some(Point::new(150.0, 0.0)));
    }

    #[test]
    fn test_arc_to_cubic_endpoints() {
        let cubic = CubicPath::from_path(&parse_path("M 0 0 A 50 50 0 0 1 100 0"));
        assert_eq!(cubic.curves.len(), 2);
        assert_eq!(cubic.end(), Point::new(100.0, 0.0));
        let top = cubic.curves[0][2];
        assert!(approx_eq(top.x, 50.0));
        assert!(approx_eq(top.y, -50.0));
    }
}
