//! Geometric containment tests used by picking.
//!
//! All functions work in the element's local space. Stroke tests take the
//! half width of the hit band, which already includes any extra hit slop.

use std::f32::consts::{FRAC_PI_2, PI, TAU};

use crate::math::{Point, Rect};

/// Inclusive box containment.
pub fn in_box(rect: &Rect, x: f32, y: f32) -> bool {
    rect.contains(x, y)
}

/// Hollow band of width `2 * half_width` centred on the rectangle's edges.
pub fn in_rect_stroke(rect: &Rect, half_width: f32, x: f32, y: f32) -> bool {
    if !rect.outset(half_width).contains(x, y) {
        return false;
    }
    let inner = rect.outset(-half_width);
    if inner.width <= 0.0 || inner.height <= 0.0 {
        return true;
    }
    !(x > inner.left() && x < inner.right() && y > inner.top() && y < inner.bottom())
}

pub fn distance_to_segment(a: Point, b: Point, x: f32, y: f32) -> f32 {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return Point::new(x, y).distance(a);
    }
    let t = (((x - a.x) * dx + (y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Point::new(x, y).distance(Point::new(a.x + t * dx, a.y + t * dy))
}

pub fn in_line(a: Point, b: Point, half_width: f32, x: f32, y: f32) -> bool {
    distance_to_segment(a, b, x, y) <= half_width
}

pub fn in_polyline(points: &[Point], closed: bool, half_width: f32, x: f32, y: f32) -> bool {
    if points.len() == 1 {
        return Point::new(x, y).distance(points[0]) <= half_width;
    }
    let hit_open = points
        .windows(2)
        .any(|w| in_line(w[0], w[1], half_width, x, y));
    hit_open
        || (closed
            && points.len() > 2
            && in_line(points[points.len() - 1], points[0], half_width, x, y))
}

/// Point in polygon by the nonzero rule, or by parity for `even_odd`.
pub fn in_polygon(points: &[Point], even_odd: bool, x: f32, y: f32) -> bool {
    points.len() >= 3 && apply_fill_rule(winding_number(points, x, y), even_odd)
}

fn apply_fill_rule(winding: i32, even_odd: bool) -> bool {
    if even_odd {
        winding % 2 != 0
    } else {
        winding != 0
    }
}

/// Point in any of several rings, combined with the given fill rule.
pub fn in_rings(rings: &[Vec<Point>], even_odd: bool, x: f32, y: f32) -> bool {
    let winding: i32 = rings
        .iter()
        .filter(|r| r.len() >= 3)
        .map(|ring| winding_number(ring, x, y))
        .sum();
    apply_fill_rule(winding, even_odd)
}

/// Signed winding contribution of one ring.
fn winding_number(points: &[Point], x: f32, y: f32) -> i32 {
    let mut winding = 0;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let side = (b.x - a.x) * (y - a.y) - (x - a.x) * (b.y - a.y);
        if a.y <= y {
            if b.y > y && side > 0.0 {
                winding += 1;
            }
        } else if b.y <= y && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}

pub fn in_circle(cx: f32, cy: f32, r: f32, x: f32, y: f32) -> bool {
    Point::new(x, y).distance(Point::new(cx, cy)) <= r
}

pub fn in_circle_stroke(cx: f32, cy: f32, r: f32, half_width: f32, x: f32, y: f32) -> bool {
    (Point::new(x, y).distance(Point::new(cx, cy)) - r).abs() <= half_width
}

pub fn in_ellipse(cx: f32, cy: f32, rx: f32, ry: f32, x: f32, y: f32) -> bool {
    if rx <= 0.0 || ry <= 0.0 {
        return false;
    }
    let (nx, ny) = ((x - cx) / rx, (y - cy) / ry);
    nx * nx + ny * ny <= 1.0
}

pub fn in_ellipse_stroke(cx: f32, cy: f32, rx: f32, ry: f32, half_width: f32, x: f32, y: f32) -> bool {
    let outer = in_ellipse(cx, cy, rx + half_width, ry + half_width, x, y);
    let inner_rx = rx - half_width;
    let inner_ry = ry - half_width;
    outer && (inner_rx <= 0.0 || inner_ry <= 0.0 || !in_ellipse(cx, cy, inner_rx, inner_ry, x, y))
}

/// Band around an arc of radius `r` from `start` sweeping clockwise (y down)
/// by `sweep` radians.
pub fn in_arc_band(
    center: Point,
    r: f32,
    start: f32,
    sweep: f32,
    half_width: f32,
    x: f32,
    y: f32,
) -> bool {
    let p = Point::new(x, y);
    if (p.distance(center) - r).abs() > half_width {
        return false;
    }
    let angle = (y - center.y).atan2(x - center.x);
    let offset = (angle - start).rem_euclid(TAU);
    offset <= sweep + 1e-5
}

/// Corner radii `[top_left, top_right, bottom_right, bottom_left]`, each
/// clamped to half the shorter side.
pub fn clamp_radii(rect: &Rect, radii: [f32; 4]) -> [f32; 4] {
    let limit = rect.width.abs().min(rect.height.abs()) / 2.0;
    radii.map(|r| r.clamp(0.0, limit))
}

/// Stroke band of a rounded rectangle: four straight edges that stop where
/// the corners begin, plus four corner arc bands.
pub fn in_rounded_rect_stroke(rect: &Rect, radii: [f32; 4], half_width: f32, x: f32, y: f32) -> bool {
    let [tl, tr, br, bl] = clamp_radii(rect, radii);
    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());

    let edges = [
        (Point::new(l + tl, t), Point::new(r - tr, t)),
        (Point::new(r, t + tr), Point::new(r, b - br)),
        (Point::new(r - br, b), Point::new(l + bl, b)),
        (Point::new(l, b - bl), Point::new(l, t + tl)),
    ];
    if edges
        .iter()
        .any(|(a, e)| in_line(*a, *e, half_width, x, y))
    {
        return true;
    }

    let corners = [
        (Point::new(l + tl, t + tl), tl, PI),
        (Point::new(r - tr, t + tr), tr, PI + FRAC_PI_2),
        (Point::new(r - br, b - br), br, 0.0),
        (Point::new(l + bl, b - bl), bl, FRAC_PI_2),
    ];
    corners
        .iter()
        .filter(|(_, radius, _)| *radius > 0.0)
        .any(|(center, radius, start)| in_arc_band(*center, *radius, *start, FRAC_PI_2, half_width, x, y))
}

/// Outline of a rounded rectangle for generic point-in-path tests.
pub fn rounded_rect_outline(rect: &Rect, radii: [f32; 4], steps_per_corner: usize) -> Vec<Point> {
    let [tl, tr, br, bl] = clamp_radii(rect, radii);
    let (l, t, r, b) = (rect.left(), rect.top(), rect.right(), rect.bottom());
    let corners = [
        (Point::new(l + tl, t + tl), tl, PI),
        (Point::new(r - tr, t + tr), tr, PI + FRAC_PI_2),
        (Point::new(r - br, b - br), br, 0.0),
        (Point::new(l + bl, b - bl), bl, FRAC_PI_2),
    ];
    let steps = steps_per_corner.max(1);
    let mut outline = Vec::with_capacity(4 * (steps + 1));
    for (center, radius, start) in corners {
        for i in 0..=steps {
            let angle = start + FRAC_PI_2 * i as f32 / steps as f32;
            outline.push(Point::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
            ));
        }
    }
    outline
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 100.0)
    }

    #[test]
    fn test_box_fill() {
        assert!(in_box(&square(), 50.0, 50.0));
        assert!(in_box(&square(), 100.0, 100.0));
        assert!(!in_box(&square(), 150.0, 150.0));
    }

    #[test]
    fn test_rect_stroke_band() {
        assert!(in_rect_stroke(&square(), 5.0, 0.0, 50.0));
        assert!(in_rect_stroke(&square(), 5.0, -4.0, 50.0));
        assert!(!in_rect_stroke(&square(), 5.0, 50.0, 50.0));
        assert!(!in_rect_stroke(&square(), 5.0, -6.0, 50.0));
    }

    #[test]
    fn test_line_distance() {
        let (a, b) = (Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        assert!(in_line(a, b, 2.0, 50.0, 1.5));
        assert!(!in_line(a, b, 2.0, 50.0, 3.0));
        // Beyond the end cap the distance is to the endpoint.
        assert!(!in_line(a, b, 2.0, 103.0, 0.0));
    }

    #[test]
    fn test_polygon_fill_rules() {
        // Outer square and an inner square wound the same way.
        let outer = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        let inner = vec![
            Point::new(3.0, 3.0),
            Point::new(7.0, 3.0),
            Point::new(7.0, 7.0),
            Point::new(3.0, 7.0),
        ];
        assert!(in_polygon(&outer, false, 5.0, 5.0));
        assert!(!in_polygon(&outer, false, 15.0, 5.0));

        let rings = vec![outer, inner];
        assert!(in_rings(&rings, false, 5.0, 5.0));
        assert!(!in_rings(&rings, true, 5.0, 5.0));
        assert!(in_rings(&rings, true, 1.0, 1.0));
    }

    #[test]
    fn test_circle_and_ellipse() {
        assert!(in_circle(0.0, 0.0, 10.0, 6.0, 8.0));
        assert!(!in_circle(0.0, 0.0, 10.0, 8.0, 8.0));
        assert!(in_circle_stroke(0.0, 0.0, 10.0, 1.0, 10.5, 0.0));
        assert!(!in_circle_stroke(0.0, 0.0, 10.0, 1.0, 5.0, 0.0));
        assert!(in_ellipse(0.0, 0.0, 20.0, 10.0, 19.0, 0.0));
        assert!(!in_ellipse(0.0, 0.0, 20.0, 10.0, 0.0, 11.0));
        assert!(in_ellipse_stroke(0.0, 0.0, 20.0, 10.0, 1.0, 0.0, 10.5));
    }

    #[test]
    fn test_rounded_rect_stroke() {
        let rect = square();
        let radii = [20.0; 4];
        // Middle of the left edge.
        assert!(in_rounded_rect_stroke(&rect, radii, 2.0, 0.0, 50.0));
        // The sharp corner is cut away by the radius.
        assert!(!in_rounded_rect_stroke(&rect, radii, 2.0, 0.0, 0.0));
        // On the corner arc.
        let d = 20.0 - 20.0 * std::f32::consts::FRAC_1_SQRT_2;
        assert!(in_rounded_rect_stroke(&rect, radii, 2.0, d, d));
        assert!(!in_rounded_rect_stroke(&rect, radii, 2.0, 50.0, 50.0));
    }

    #[test]
    fn test_radius_clamp() {
        let rect = Rect::new(0.0, 0.0, 40.0, 100.0);
        assert_eq!(clamp_radii(&rect, [50.0, 10.0, -1.0, 20.0]), [20.0, 10.0, 0.0, 20.0]);
    }

    #[test]
    fn test_rounded_outline_fill() {
        let outline = rounded_rect_outline(&square(), [30.0; 4], 8);
        assert!(in_polygon(&outline, false, 50.0, 50.0));
        assert!(!in_polygon(&outline, false, 1.0, 1.0));
    }
}
