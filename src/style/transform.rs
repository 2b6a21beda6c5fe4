use crate::math::Mat4;

use super::color::split_top_level;
use super::length::{parse_angle, try_parse_length, CssLength, LengthContext};

/// One function of the `transform` style property.
#[derive(Debug, Clone, PartialEq)]
pub enum TransformFunction {
    Translate(CssLength, CssLength),
    Scale(f32, f32),
    /// Degrees.
    Rotate(f32),
    /// Degrees on each axis.
    Skew(f32, f32),
    /// CSS `matrix(a, b, c, d, e, f)`.
    Matrix([f32; 6]),
}

impl TransformFunction {
    /// Percentages in translations resolve against `size`.
    pub fn to_matrix(&self, size: (f32, f32)) -> Mat4 {
        match *self {
            TransformFunction::Translate(x, y) => {
                let ctx_x = LengthContext {
                    percent_base: size.0,
                    ..LengthContext::default()
                };
                let ctx_y = LengthContext {
                    percent_base: size.1,
                    ..LengthContext::default()
                };
                Mat4::translate(x.to_px(&ctx_x), y.to_px(&ctx_y))
            }
            TransformFunction::Scale(sx, sy) => Mat4::scale_xy(sx, sy),
            TransformFunction::Rotate(deg) => Mat4::rotate_degrees(deg),
            TransformFunction::Skew(ax, ay) => Mat4::shear(ax.to_radians(), ay.to_radians()),
            TransformFunction::Matrix([a, b, c, d, e, f]) => Mat4 {
                data: [
                    a, c, 0.0, e, // row 0
                    b, d, 0.0, f, // row 1
                    0.0, 0.0, 1.0, 0.0, // row 2
                    0.0, 0.0, 0.0, 1.0, // row 3
                ],
            },
        }
    }
}

/// Compose a function list left to right, as CSS does.
pub fn compose_transform(functions: &[TransformFunction], size: (f32, f32)) -> Mat4 {
    functions
        .iter()
        .fold(Mat4::IDENTITY, |m, f| m.then(&f.to_matrix(size)))
}

/// Parse a CSS transform list. `none` is empty, and functions that fail to
/// parse are skipped with a warning.
pub fn parse_transform(input: &str) -> Vec<TransformFunction> {
    let input = input.trim();
    if input.is_empty() || input == "none" {
        return Vec::new();
    }

    let mut functions = Vec::new();
    let mut rest = input;
    while let Some(open) = rest.find('(') {
        let name = rest[..open].trim();
        let Some(close) = rest[open..].find(')').map(|i| open + i) else {
            log::warn!("Unbalanced transform {:?}", input);
            break;
        };
        let args = split_top_level(&rest[open + 1..close], ',');
        let args: Vec<String> = if args.len() == 1 {
            args[0].split_whitespace().map(str::to_string).collect()
        } else {
            args
        };
        match parse_function(name, &args) {
            Some(function) => functions.push(function),
            None => log::warn!("Skipping invalid transform function {}({:?})", name, args),
        }
        rest = &rest[close + 1..];
    }
    functions
}

fn number(arg: Option<&String>) -> Option<f32> {
    arg?.trim().parse::<f32>().ok()
}

fn length(arg: Option<&String>) -> Option<CssLength> {
    try_parse_length(arg?)
}

fn angle(arg: Option<&String>) -> Option<f32> {
    parse_angle(arg?).map(|a| a.to_degrees())
}

fn parse_function(name: &str, args: &[String]) -> Option<TransformFunction> {
    match name {
        "translate" => {
            let x = length(args.first())?;
            let y = match args.get(1) {
                Some(_) => length(args.get(1))?,
                None => CssLength::ZERO,
            };
            Some(TransformFunction::Translate(x, y))
        }
        "translateX" => Some(TransformFunction::Translate(
            length(args.first())?,
            CssLength::ZERO,
        )),
        "translateY" => Some(TransformFunction::Translate(
            CssLength::ZERO,
            length(args.first())?,
        )),
        "scale" => {
            let sx = number(args.first())?;
            let sy = match args.get(1) {
                Some(_) => number(args.get(1))?,
                None => sx,
            };
            Some(TransformFunction::Scale(sx, sy))
        }
        "scaleX" => Some(TransformFunction::Scale(number(args.first())?, 1.0)),
        "scaleY" => Some(TransformFunction::Scale(1.0, number(args.first())?)),
        "rotate" | "rotateZ" => Some(TransformFunction::Rotate(angle(args.first())?)),
        "skew" => {
            let ax = angle(args.first())?;
            let ay = match args.get(1) {
                Some(_) => angle(args.get(1))?,
                None => 0.0,
            };
            Some(TransformFunction::Skew(ax, ay))
        }
        "skewX" => Some(TransformFunction::Skew(angle(args.first())?, 0.0)),
        "skewY" => Some(TransformFunction::Skew(0.0, angle(args.first())?)),
        "matrix" => {
            if args.len() != 6 {
                return None;
            }
            let mut values = [0.0f32; 6];
            for (slot, arg) in values.iter_mut().zip(args) {
                *slot = number(Some(arg))?;
            }
            Some(TransformFunction::Matrix(values))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_parse_list() {
        let functions = parse_transform("translate(10px, 20px) rotate(90deg) scale(2)");
        assert_eq!(
            functions,
            vec![
                TransformFunction::Translate(CssLength::px(10.0), CssLength::px(20.0)),
                TransformFunction::Rotate(90.0),
                TransformFunction::Scale(2.0, 2.0),
            ]
        );
    }

    #[test]
    fn test_compose_order() {
        let m = compose_transform(&parse_transform("translate(10, 0) rotate(90deg)"), (0.0, 0.0));
        let (x, y) = m.transform_point(1.0, 0.0);
        assert!(approx_eq(x, 10.0));
        assert!(approx_eq(y, 1.0));
    }

    #[test]
    fn test_percent_translate() {
        let m = compose_transform(&parse_transform("translateX(50%)"), (200.0, 100.0));
        let (x, _) = m.transform_point(0.0, 0.0);
        assert!(approx_eq(x, 100.0));
    }

    #[test]
    fn test_matrix_and_invalid() {
        let functions = parse_transform("matrix(1, 0, 0, 1, 5, 6) wobble(3) skewX(45deg)");
        assert_eq!(functions.len(), 2);
        let m = compose_transform(&functions, (0.0, 0.0));
        let (x, y) = m.transform_point(0.0, 10.0);
        assert!(approx_eq(x, 15.0));
        assert!(approx_eq(y, 16.0));
        assert!(parse_transform("none").is_empty());
    }
}
