//! The drawing surface a backend renders into.
//!
//! A backend ships its own [`ContextService`]; the canvas only needs the
//! operations below. [`OffscreenContext`] is a headless implementation used
//! when no platform surface exists.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::math::Rect;

pub trait ContextService {
    /// Backend-specific drawing handle.
    fn context(&self) -> &dyn Any;

    /// Device pixels per CSS pixel.
    fn dpr(&self) -> f32;

    /// Resize the surface to `width` by `height` CSS pixels.
    fn resize(&self, width: f32, height: f32);

    /// Where the surface sits in client coordinates.
    fn bounding_client_rect(&self) -> Rect;

    fn apply_cursor_style(&self, cursor: &str);

    fn destroy(&self);
}

/// Shared handle passed to plugins.
pub type SharedContext = Rc<dyn ContextService>;

/// A surface that exists only in memory.
#[derive(Debug)]
pub struct OffscreenContext {
    rect: Cell<Rect>,
    dpr: f32,
    cursor: RefCell<String>,
    destroyed: Cell<bool>,
}

impl OffscreenContext {
    pub fn new(width: f32, height: f32, dpr: f32) -> Self {
        Self {
            rect: Cell::new(Rect::from_size(width, height)),
            dpr: if dpr > 0.0 { dpr } else { 1.0 },
            cursor: RefCell::new("default".to_string()),
            destroyed: Cell::new(false),
        }
    }

    /// Place the surface at `(x, y)` in client space.
    pub fn set_position(&self, x: f32, y: f32) {
        let rect = self.rect.get();
        self.rect.set(Rect::new(x, y, rect.width, rect.height));
    }

    pub fn cursor(&self) -> String {
        self.cursor.borrow().clone()
    }

    /// Size of the backing store in device pixels.
    pub fn pixel_size(&self) -> (u32, u32) {
        let rect = self.rect.get();
        (
            (rect.width * self.dpr).round() as u32,
            (rect.height * self.dpr).round() as u32,
        )
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.get()
    }
}

impl ContextService for OffscreenContext {
    fn context(&self) -> &dyn Any {
        self
    }

    fn dpr(&self) -> f32 {
        self.dpr
    }

    fn resize(&self, width: f32, height: f32) {
        let rect = self.rect.get();
        self.rect.set(Rect::new(rect.x, rect.y, width.max(0.0), height.max(0.0)));
    }

    fn bounding_client_rect(&self) -> Rect {
        self.rect.get()
    }

    fn apply_cursor_style(&self, cursor: &str) {
        *self.cursor.borrow_mut() = cursor.to_string();
    }

    fn destroy(&self) {
        self.destroyed.set(true);
    }
}
