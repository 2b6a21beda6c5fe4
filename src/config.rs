//! Canvas configuration.
//!
//! ```ignore
//! let canvas = Canvas::new(
//!     CanvasConfig::new()
//!         .size(800.0, 600.0)
//!         .device_pixel_ratio(2.0)
//!         .render(RenderConfig::new().dirty_rectangle_debug(true))
//!         .drag_and_drop(DragAndDropConfig::new().distance_threshold(10.0)),
//! );
//! ```

use crate::style::Color;

/// Configuration for a [`crate::Canvas`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasConfig {
    /// Width in CSS pixels.
    pub width: f32,
    /// Height in CSS pixels.
    pub height: f32,
    /// Device pixels per CSS pixel. `None` asks the context service.
    pub device_pixel_ratio: Option<f32>,
    /// Clear color handed to renderer plugins.
    pub background: Color,
    /// Cursor shown when the pointer is over nothing with a `cursor` style.
    pub cursor: String,
    pub render: RenderConfig,
    pub drag_and_drop: DragAndDropConfig,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 300.0,
            height: 150.0,
            device_pixel_ratio: None,
            background: Color::TRANSPARENT,
            cursor: "default".to_string(),
            render: RenderConfig::default(),
            drag_and_drop: DragAndDropConfig::default(),
        }
    }
}

impl CanvasConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the canvas size in CSS pixels.
    pub fn size(mut self, width: f32, height: f32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn device_pixel_ratio(mut self, dpr: f32) -> Self {
        self.device_pixel_ratio = Some(dpr);
        self
    }

    pub fn background(mut self, color: Color) -> Self {
        self.background = color;
        self
    }

    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = cursor.into();
        self
    }

    pub fn render(mut self, render: RenderConfig) -> Self {
        self.render = render;
        self
    }

    pub fn drag_and_drop(mut self, config: DragAndDropConfig) -> Self {
        self.drag_and_drop = config;
        self
    }
}

/// Frame loop behaviour.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Only redraw the union of changed bounds.
    pub enable_dirty_rectangle: bool,
    /// Skip elements whose render bounds miss the viewport.
    pub enable_culling: bool,
    /// Report each dirty rectangle to plugins for drawing an overlay.
    pub enable_dirty_rectangle_debug: bool,
    /// Cap on queued tasks run per frame.
    pub max_tasks_per_frame: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enable_dirty_rectangle: true,
            enable_culling: true,
            enable_dirty_rectangle_debug: false,
            max_tasks_per_frame: 4,
        }
    }
}

impl RenderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dirty_rectangle(mut self, enabled: bool) -> Self {
        self.enable_dirty_rectangle = enabled;
        self
    }

    pub fn culling(mut self, enabled: bool) -> Self {
        self.enable_culling = enabled;
        self
    }

    pub fn dirty_rectangle_debug(mut self, enabled: bool) -> Self {
        self.enable_dirty_rectangle_debug = enabled;
        self
    }

    pub fn max_tasks_per_frame(mut self, max: usize) -> Self {
        self.max_tasks_per_frame = max.max(1);
        self
    }
}

/// Drag recognition thresholds and document-level drag targets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DragAndDropConfig {
    /// Pointer travel in canvas pixels before a drag starts.
    pub drag_start_distance_threshold: f32,
    /// Time in milliseconds a pointer must stay down before a drag starts.
    pub drag_start_time_threshold: f64,
    /// The document element is dragged when nothing draggable was hit.
    pub document_draggable: bool,
    /// The document element receives drop events when nothing droppable is
    /// under the pointer.
    pub document_droppable: bool,
}

impl DragAndDropConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn distance_threshold(mut self, pixels: f32) -> Self {
        self.drag_start_distance_threshold = pixels.max(0.0);
        self
    }

    pub fn time_threshold(mut self, millis: f64) -> Self {
        self.drag_start_time_threshold = millis.max(0.0);
        self
    }

    pub fn document_draggable(mut self, enabled: bool) -> Self {
        self.document_draggable = enabled;
        self
    }

    pub fn document_droppable(mut self, enabled: bool) -> Self {
        self.document_droppable = enabled;
        self
    }
}
