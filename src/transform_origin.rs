use crate::math::Rect;

/// One axis of a [`TransformOrigin`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OriginAxis {
    /// `left` or `top`
    Start,
    Center,
    /// `right` or `bottom`
    End,
    /// Percentage of the geometry extent on this axis (0-100)
    Percent(f32),
    /// Offset from the start edge
    Px(f32),
}

impl OriginAxis {
    fn resolve(self, start: f32, extent: f32) -> f32 {
        match self {
            OriginAxis::Start => start,
            OriginAxis::Center => start + extent * 0.5,
            OriginAxis::End => start + extent,
            OriginAxis::Percent(p) => start + extent * p / 100.0,
            OriginAxis::Px(px) => start + px,
        }
    }

    fn parse_offset(token: &str) -> Option<Self> {
        match token.strip_suffix('%') {
            Some(p) => p.trim().parse().ok().map(OriginAxis::Percent),
            None => token
                .strip_suffix("px")
                .unwrap_or(token)
                .trim()
                .parse()
                .ok()
                .map(OriginAxis::Px),
        }
    }
}

/// The pivot for rotation, scale and skew, written like CSS `transform-origin`.
///
/// Anchors are resolved against an element's local geometry bounds, so
/// `center` on a circle is its center and `left top` on a rect is its corner.
///
/// ```ignore
/// scene.set_style(id, "transformOrigin", "center")?;
/// scene.set_style(id, "transformOrigin", "25% 75%")?;
/// scene.set_style(id, "transformOrigin", "10px 20px")?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformOrigin {
    pub x: OriginAxis,
    pub y: OriginAxis,
}

impl Default for TransformOrigin {
    fn default() -> Self {
        Self {
            x: OriginAxis::Start,
            y: OriginAxis::Start,
        }
    }
}

impl TransformOrigin {
    pub const CENTER: Self = Self {
        x: OriginAxis::Center,
        y: OriginAxis::Center,
    };

    /// Parse `"<x> <y>"` with keywords, percentages, pixels or unitless numbers.
    /// A single value sets the named axis and centers the other one; keyword
    /// pairs may come in either order.
    pub fn parse(input: &str) -> Option<Self> {
        let mut tokens = input.split_whitespace();
        let first = tokens.next()?;
        let Some(second) = tokens.next() else {
            return match first {
                "top" | "bottom" => Some(Self {
                    x: OriginAxis::Center,
                    y: vertical(first)?,
                }),
                _ => Some(Self {
                    x: horizontal(first)?,
                    y: OriginAxis::Center,
                }),
            };
        };
        let swapped = matches!(first, "top" | "bottom") || matches!(second, "left" | "right");
        let (x, y) = if swapped { (second, first) } else { (first, second) };
        Some(Self {
            x: horizontal(x)?,
            y: vertical(y)?,
        })
    }

    /// The pivot in the coordinate space of `bounds`.
    pub fn resolve(&self, bounds: Rect) -> (f32, f32) {
        (
            self.x.resolve(bounds.x, bounds.width),
            self.y.resolve(bounds.y, bounds.height),
        )
    }
}

fn horizontal(token: &str) -> Option<OriginAxis> {
    match token {
        "left" => Some(OriginAxis::Start),
        "center" => Some(OriginAxis::Center),
        "right" => Some(OriginAxis::End),
        "top" | "bottom" => None,
        other => OriginAxis::parse_offset(other),
    }
}

fn vertical(token: &str) -> Option<OriginAxis> {
    match token {
        "top" => Some(OriginAxis::Start),
        "center" => Some(OriginAxis::Center),
        "bottom" => Some(OriginAxis::End),
        "left" | "right" => None,
        other => OriginAxis::parse_offset(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-5 && (a.1 - b.1).abs() < 1e-5
    }

    #[test]
    fn test_resolve_against_bounds() {
        let bounds = Rect::new(100.0, 50.0, 200.0, 100.0);
        assert!(approx_eq(TransformOrigin::CENTER.resolve(bounds), (200.0, 100.0)));
        assert!(approx_eq(TransformOrigin::default().resolve(bounds), (100.0, 50.0)));

        let origin = TransformOrigin {
            x: OriginAxis::Percent(25.0),
            y: OriginAxis::Px(20.0),
        };
        assert!(approx_eq(origin.resolve(bounds), (150.0, 70.0)));
    }

    #[test]
    fn test_parse_keywords_in_either_order() {
        let corner = TransformOrigin {
            x: OriginAxis::End,
            y: OriginAxis::Start,
        };
        assert_eq!(TransformOrigin::parse("right top"), Some(corner));
        assert_eq!(TransformOrigin::parse("top right"), Some(corner));
        assert_eq!(TransformOrigin::parse("center"), Some(TransformOrigin::CENTER));
        assert_eq!(
            TransformOrigin::parse("bottom").map(|o| o.y),
            Some(OriginAxis::End)
        );
    }

    #[test]
    fn test_parse_offsets() {
        assert_eq!(
            TransformOrigin::parse("10px 20"),
            Some(TransformOrigin {
                x: OriginAxis::Px(10.0),
                y: OriginAxis::Px(20.0),
            })
        );
        assert_eq!(
            TransformOrigin::parse("25% 75%").map(|o| o.x),
            Some(OriginAxis::Percent(25.0))
        );
        assert_eq!(TransformOrigin::parse("left left"), None);
        assert_eq!(TransformOrigin::parse("sideways"), None);
        assert_eq!(TransformOrigin::parse(""), None);
    }
}
