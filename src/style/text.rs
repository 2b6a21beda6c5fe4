/// Font parameters needed to measure a run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub font_size: f32,
    pub font_family: String,
    pub font_weight: u16,
    /// Explicit line height in pixels; `None` uses `1.2 * font_size`.
    pub line_height: Option<f32>,
    pub letter_spacing: f32,
}

impl Default for FontSpec {
    fn default() -> Self {
        Self {
            font_size: 16.0,
            font_family: "sans-serif".to_string(),
            font_weight: 400,
            line_height: None,
            letter_spacing: 0.0,
        }
    }
}

impl FontSpec {
    pub fn line_height(&self) -> f32 {
        self.line_height.unwrap_or(self.font_size * 1.2)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextMetrics {
    pub width: f32,
    pub height: f32,
    pub line_height: f32,
    pub line_count: usize,
}

/// Measures text for geometry and hit testing. Lines break on `\n` only.
pub trait TextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> TextMetrics;
}

/// Font-free measurer using fixed advance ratios.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproximateTextMeasurer;

impl ApproximateTextMeasurer {
    fn advance(c: char, font_size: f32) -> f32 {
        let wide = matches!(c as u32,
            0x1100..=0x115F | 0x2E80..=0xA4CF | 0xAC00..=0xD7A3 | 0xF900..=0xFAFF | 0xFF00..=0xFF60);
        if wide {
            font_size
        } else {
            font_size * 0.6
        }
    }
}

impl TextMeasurer for ApproximateTextMeasurer {
    fn measure(&self, text: &str, font: &FontSpec) -> TextMetrics {
        let line_height = font.line_height();
        let mut width = 0.0f32;
        let mut line_count = 0;
        for line in text.split('\n') {
            line_count += 1;
            let chars = line.chars().count() as f32;
            let advance: f32 = line
                .chars()
                .map(|c| Self::advance(c, font.font_size))
                .sum();
            width = width.max(advance + font.letter_spacing * chars);
        }
        TextMetrics {
            width,
            height: line_height * line_count as f32,
            line_height,
            line_count,
        }
    }
}

#[cfg(feature = "font-metrics")]
pub use font_system::FontSystemMeasurer;

#[cfg(feature = "font-metrics")]
mod font_system {
    use std::cell::RefCell;

    use cosmic_text::{Attrs, Buffer, Family, FontSystem, Metrics, Shaping, Weight};

    use super::{FontSpec, TextMeasurer, TextMetrics};

    /// Measures with shaped glyph runs from the system fonts.
    pub struct FontSystemMeasurer {
        font_system: RefCell<FontSystem>,
    }

    impl FontSystemMeasurer {
        pub fn new() -> Self {
            Self {
                font_system: RefCell::new(FontSystem::new()),
            }
        }
    }

    impl Default for FontSystemMeasurer {
        fn default() -> Self {
            Self::new()
        }
    }

    impl TextMeasurer for FontSystemMeasurer {
        fn measure(&self, text: &str, font: &FontSpec) -> TextMetrics {
            let mut font_system = self.font_system.borrow_mut();
            let line_height = font.line_height();
            let metrics = Metrics::new(font.font_size, line_height);
            let mut buffer = Buffer::new(&mut font_system, metrics);

            let family = match font.font_family.as_str() {
                "serif" => Family::Serif,
                "monospace" => Family::Monospace,
                "sans-serif" => Family::SansSerif,
                name => Family::Name(name),
            };
            buffer.set_size(&mut font_system, None, None);
            buffer.set_text(
                &mut font_system,
                text,
                &Attrs::new().family(family).weight(Weight(font.font_weight)),
                Shaping::Advanced,
                None,
            );
            buffer.shape_until_scroll(&mut font_system, true);

            let mut width = 0.0f32;
            let mut height = 0.0f32;
            let mut line_count = 0;
            for run in buffer.layout_runs() {
                width = width.max(run.line_w);
                height += run.line_height;
                line_count += 1;
            }

            if line_count == 0 {
                height = line_height;
                line_count = 1;
            }

            TextMetrics {
                width,
                height,
                line_height,
                line_count,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_approximate_width() {
        let font = FontSpec {
            font_size: 10.0,
            ..FontSpec::default()
        };
        let metrics = ApproximateTextMeasurer.measure("abcd", &font);
        assert!(approx_eq(metrics.width, 24.0));
        assert!(approx_eq(metrics.height, 12.0));
        assert_eq!(metrics.line_count, 1);
    }

    #[test]
    fn test_multiline_and_wide() {
        let font = FontSpec {
            font_size: 10.0,
            line_height: Some(20.0),
            ..FontSpec::default()
        };
        let metrics = ApproximateTextMeasurer.measure("ab\n中文", &font);
        assert!(approx_eq(metrics.width, 20.0));
        assert!(approx_eq(metrics.height, 40.0));
        assert_eq!(metrics.line_count, 2);
    }
}
