use std::sync::Arc;

use crate::math::Point;
use crate::transform_origin::TransformOrigin;

use super::color::Paint;
use super::filter::FilterFunction;
use super::length::CssLength;
use super::path::ParsedPath;
use super::transform::TransformFunction;

/// A style value as the user wrote it.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StyleValue {
    #[default]
    Null,
    Number(f32),
    Str(String),
    Bool(bool),
    Points(Vec<(f32, f32)>),
}

impl StyleValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StyleValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// CSS-wide keyword, if this value is one.
    pub fn keyword(&self) -> Option<&str> {
        match self.as_str().map(str::trim) {
            Some(k @ ("inherit" | "initial" | "unset")) => Some(k),
            _ => None,
        }
    }
}

impl From<f32> for StyleValue {
    fn from(value: f32) -> Self {
        StyleValue::Number(value)
    }
}

impl From<i32> for StyleValue {
    fn from(value: i32) -> Self {
        StyleValue::Number(value as f32)
    }
}

impl From<&str> for StyleValue {
    fn from(value: &str) -> Self {
        StyleValue::Str(value.to_string())
    }
}

impl From<String> for StyleValue {
    fn from(value: String) -> Self {
        StyleValue::Str(value)
    }
}

impl From<bool> for StyleValue {
    fn from(value: bool) -> Self {
        StyleValue::Bool(value)
    }
}

impl From<Vec<(f32, f32)>> for StyleValue {
    fn from(value: Vec<(f32, f32)>) -> Self {
        StyleValue::Points(value)
    }
}

/// A typed, computed style value.
///
/// Paths, point lists and filters are shared behind `Arc` and never mutated;
/// changing them means replacing the element's reference.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedValue {
    Number(f32),
    Length(CssLength),
    Lengths(Vec<CssLength>),
    Paint(Paint),
    Path(Arc<ParsedPath>),
    Points(Arc<Vec<Point>>),
    Filters(Arc<Vec<FilterFunction>>),
    Transform(Arc<Vec<TransformFunction>>),
    Origin(TransformOrigin),
    Keyword(String),
    Text(String),
    Bool(bool),
    /// Resolve from the parent.
    Inherit,
    /// Resolve to the property's initial value.
    Initial,
}

impl ParsedValue {
    pub fn as_number(&self) -> Option<f32> {
        match self {
            ParsedValue::Number(n) => Some(*n),
            ParsedValue::Length(l) => Some(l.value),
            ParsedValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_length(&self) -> Option<CssLength> {
        match self {
            ParsedValue::Length(l) => Some(*l),
            ParsedValue::Number(n) => Some(CssLength::px(*n)),
            _ => None,
        }
    }

    pub fn as_lengths(&self) -> Option<&[CssLength]> {
        match self {
            ParsedValue::Lengths(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_paint(&self) -> Option<&Paint> {
        match self {
            ParsedValue::Paint(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_path(&self) -> Option<&Arc<ParsedPath>> {
        match self {
            ParsedValue::Path(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_points(&self) -> Option<&[Point]> {
        match self {
            ParsedValue::Points(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_filters(&self) -> Option<&[FilterFunction]> {
        match self {
            ParsedValue::Filters(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_transform(&self) -> Option<&[TransformFunction]> {
        match self {
            ParsedValue::Transform(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_origin(&self) -> Option<TransformOrigin> {
        match self {
            ParsedValue::Origin(o) => Some(*o),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParsedValue::Keyword(s) | ParsedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParsedValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_css_keyword(&self) -> bool {
        matches!(self, ParsedValue::Inherit | ParsedValue::Initial)
    }
}
