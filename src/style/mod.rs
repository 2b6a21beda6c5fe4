//! Style values, their parsers and the property registry.

pub mod cache;
pub mod color;
pub mod filter;
pub mod length;
pub mod path;
pub mod path_morph;
pub mod registry;
pub mod text;
pub mod transform;
pub mod value;

pub use cache::{cached, CacheCell};
pub use color::{Color, Paint};
pub use filter::{parse_filter, FilterFunction};
pub use length::{parse_length, CssLength, LengthContext, Unit};
pub use path::{parse_path, ParsedPath, PathCommand};
pub use path_morph::{equalize_segments, merge_paths, MergedPaths, PathFormatter};
pub use registry::{affects, interpolate, is_inherited, parse_style, property, DirtyFlags, PropertyDef, Syntax};
pub use text::{ApproximateTextMeasurer, FontSpec, TextMeasurer, TextMetrics};
pub use transform::{parse_transform, TransformFunction};
pub use value::{ParsedValue, StyleValue};
