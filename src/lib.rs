//! A retained-mode 2D scene graph.
//!
//! Elements live in a [`Scene`], are styled with CSS-like properties and
//! positioned with per-element transforms. Rendering backends attach as
//! [`RenderingPlugin`]s and draw whatever the frame loop hands them; input
//! is picked against element geometry and dispatched with capture, target
//! and bubble phases.

pub mod canvas;
pub mod config;
pub mod error;
pub mod events;
pub mod math;
pub mod render;
pub mod scene;
pub mod style;
pub mod transform_origin;

pub use canvas::Canvas;
pub use config::{CanvasConfig, DragAndDropConfig, RenderConfig};
pub use error::{CanvasError, PluginError, TreeError};
pub use events::{FederatedEvent, ListenerOptions, PointerInput};
pub use render::{RenderHooks, RenderItem, RenderingPlugin};
pub use scene::{ElementId, Scene, ShapeKind};

pub mod prelude {
    pub use crate::canvas::Canvas;
    pub use crate::config::{CanvasConfig, DragAndDropConfig, RenderConfig};
    pub use crate::error::{CanvasError, PluginError, TreeError};
    pub use crate::events::{
        names, DragTrigger, EventPhase, FederatedEvent, ListenerOptions, PointerInput, PointerType,
    };
    pub use crate::math::{Aabb, Mat4, Point, Rect, Vec3};
    pub use crate::render::{FrameInfo, PluginContext, RenderHooks, RenderItem, RenderingPlugin};
    pub use crate::scene::{ElementId, MutationObserverInit, MutationRecord, Scene, ShapeKind};
    pub use crate::style::{Color, Paint, ParsedValue, StyleValue};
}
