//! The canvas ties a scene to its renderer, input handling and surface.
//!
//! ```ignore
//! let mut canvas = Canvas::new(CanvasConfig::new().size(800.0, 600.0));
//! canvas.register_plugin(Box::new(MyBackend::default()))?;
//! canvas.ready_blocking()?;
//!
//! let circle = canvas.scene_mut().create_element_with(
//!     ShapeKind::Circle,
//!     [("cx", "100"), ("cy", "100"), ("r", "50"), ("fill", "red")],
//! );
//! canvas.append_child(circle)?;
//! canvas.render()?;
//! ```

use std::rc::Rc;

use crate::config::CanvasConfig;
use crate::error::CanvasError;
use crate::events::{names, pick_at, EventService, FederatedEvent, Picker, PickingResult, PointerInput};
use crate::math::{Point, Rect};
use crate::render::{
    FrameStats, OffscreenContext, RenderHooks, RenderingPlugin, RenderingService, SharedContext,
};
use crate::scene::{ElementId, Scene};

/// Geometry picking refined by the plugins tapped into the pick hook.
struct HookedPicker<'a> {
    hooks: &'a RenderHooks,
}

impl HookedPicker<'_> {
    fn pick_result(&self, scene: &Scene, position: Point, all: bool, exclude: Option<ElementId>) -> PickingResult {
        let base = pick_at(scene, position, all, exclude);
        match self.hooks.pick.call(base.clone()) {
            Some(refined) => refined,
            None => base,
        }
    }
}

impl Picker for HookedPicker<'_> {
    fn pick(&self, scene: &Scene, position: Point, exclude: Option<ElementId>) -> Option<ElementId> {
        self.pick_result(scene, position, false, exclude).top()
    }
}

pub struct Canvas {
    config: CanvasConfig,
    scene: Scene,
    rendering: RenderingService,
    events: EventService,
    context: SharedContext,
    destroyed: bool,
}

impl Canvas {
    /// A canvas drawing into an in-memory surface.
    pub fn new(config: CanvasConfig) -> Self {
        let dpr = config.device_pixel_ratio.unwrap_or(1.0);
        let context: SharedContext = Rc::new(OffscreenContext::new(config.width, config.height, dpr));
        Self::with_context(config, context)
    }

    pub fn with_context(mut config: CanvasConfig, context: SharedContext) -> Self {
        if config.device_pixel_ratio.is_none() {
            config.device_pixel_ratio = Some(context.dpr());
        }
        let scene = Scene::new(config.width, config.height);
        let rendering = RenderingService::new(config.render.clone(), context.clone(), config.background);
        let events = EventService::new(config.cursor.clone(), config.drag_and_drop.clone());
        log::info!("Created canvas {}x{}", config.width, config.height);
        Self {
            config,
            scene,
            rendering,
            events,
            context,
            destroyed: false,
        }
    }

    /// Install `env_logger` once; later calls are ignored.
    pub fn init_logging() {
        let _ = env_logger::builder().try_init();
    }

    fn check(&self) -> Result<(), CanvasError> {
        if self.destroyed {
            Err(CanvasError::Destroyed)
        } else {
            Ok(())
        }
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn document_element(&self) -> ElementId {
        self.scene.document_element()
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    pub fn rendering_service(&self) -> &RenderingService {
        &self.rendering
    }

    pub fn event_service(&self) -> &EventService {
        &self.events
    }

    /// Whether every registered plugin finished initialising. A plugin
    /// registered later clears this until the next [`ready`](Self::ready).
    pub fn is_ready(&self) -> bool {
        !self.destroyed && self.rendering.is_initialized()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Resolves once every plugin finished its async initialisation.
    pub async fn ready(&mut self) -> Result<(), CanvasError> {
        self.check()?;
        if self.rendering.is_initialized() {
            return Ok(());
        }
        self.rendering.init().await?;
        log::info!("Canvas ready with plugins {:?}", self.rendering.plugins());
        Ok(())
    }

    pub fn ready_blocking(&mut self) -> Result<(), CanvasError> {
        pollster::block_on(self.ready())
    }

    /// Append to the document element.
    pub fn append_child(&mut self, child: ElementId) -> Result<(), CanvasError> {
        self.check()?;
        let root = self.scene.document_element();
        Ok(self.scene.append_child(root, child)?)
    }

    pub fn remove_child(&mut self, child: ElementId) -> Result<(), CanvasError> {
        self.check()?;
        let root = self.scene.document_element();
        Ok(self.scene.remove_child(root, child)?)
    }

    /// Deliver pending mutation records, then draw one frame. Waits for the
    /// plugins first if [`ready`](Self::ready) has not completed yet.
    pub fn render(&mut self) -> Result<FrameStats, CanvasError> {
        self.check()?;
        if !self.rendering.is_initialized() {
            self.ready_blocking()?;
        }
        self.scene.deliver_mutations();
        let viewport = Rect::from_size(self.config.width, self.config.height);
        Ok(self.rendering.render(&mut self.scene, viewport))
    }

    pub fn needs_frame(&self) -> bool {
        !self.destroyed && (self.scene.observers.has_pending() || self.rendering.needs_frame(&self.scene))
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn RenderingPlugin>) -> Result<(), CanvasError> {
        self.check()?;
        Ok(self.rendering.register_plugin(plugin)?)
    }

    pub fn unregister_plugin(&mut self, name: &str) -> Result<Box<dyn RenderingPlugin>, CanvasError> {
        self.check()?;
        Ok(self.rendering.unregister_plugin(name)?)
    }

    pub fn plugins(&self) -> Vec<&str> {
        self.rendering.plugins()
    }

    /// Queue deferred work such as an image decode.
    pub fn schedule_task(&self, source: &str, task: impl FnOnce() + 'static) -> Result<(), CanvasError> {
        self.check()?;
        self.rendering.tasks().schedule(source, task);
        Ok(())
    }

    // Input

    fn sync_origin(&mut self) {
        let rect = self.context.bounding_client_rect();
        self.events.set_canvas_origin(Point::new(rect.x, rect.y));
    }

    fn apply_cursor(&mut self) {
        if let Some(cursor) = self.events.take_cursor_change() {
            self.context.apply_cursor_style(&cursor);
        }
    }

    pub fn on_pointer_down(&mut self, input: PointerInput) -> Result<(), CanvasError> {
        self.check()?;
        self.sync_origin();
        let picker = HookedPicker {
            hooks: self.rendering.hooks(),
        };
        self.events.on_pointer_down(&mut self.scene, &picker, input);
        self.apply_cursor();
        Ok(())
    }

    pub fn on_pointer_move(&mut self, input: PointerInput) -> Result<(), CanvasError> {
        self.check()?;
        self.sync_origin();
        let picker = HookedPicker {
            hooks: self.rendering.hooks(),
        };
        self.events.on_pointer_move(&mut self.scene, &picker, input);
        self.apply_cursor();
        Ok(())
    }

    pub fn on_pointer_up(&mut self, input: PointerInput) -> Result<(), CanvasError> {
        self.check()?;
        self.sync_origin();
        let picker = HookedPicker {
            hooks: self.rendering.hooks(),
        };
        self.events.on_pointer_up(&mut self.scene, &picker, input);
        self.apply_cursor();
        Ok(())
    }

    pub fn on_wheel(&mut self, input: PointerInput) -> Result<(), CanvasError> {
        self.check()?;
        self.sync_origin();
        let picker = HookedPicker {
            hooks: self.rendering.hooks(),
        };
        self.events.on_wheel(&mut self.scene, &picker, input);
        Ok(())
    }

    pub fn on_pointer_leave(&mut self, input: PointerInput) -> Result<(), CanvasError> {
        self.check()?;
        self.sync_origin();
        self.events.on_pointer_leave_canvas(&mut self.scene, input);
        self.apply_cursor();
        Ok(())
    }

    // Picking

    /// Topmost element at a canvas-space point.
    pub fn element_from_point(&self, x: f32, y: f32) -> Result<Option<ElementId>, CanvasError> {
        self.check()?;
        let picker = HookedPicker {
            hooks: self.rendering.hooks(),
        };
        Ok(picker.pick(&self.scene, Point::new(x, y), None))
    }

    /// Every element at a canvas-space point, topmost first.
    pub fn elements_from_point(&self, x: f32, y: f32) -> Result<Vec<ElementId>, CanvasError> {
        self.check()?;
        let picker = HookedPicker {
            hooks: self.rendering.hooks(),
        };
        Ok(picker.pick_result(&self.scene, Point::new(x, y), true, None).picked)
    }

    /// Like [`element_from_point`](Self::element_from_point), also letting
    /// async pick plugins (e.g. GPU readback) refine the result.
    pub async fn element_from_point_async(&self, x: f32, y: f32) -> Result<Option<ElementId>, CanvasError> {
        self.check()?;
        let hooks = self.rendering.hooks();
        let picker = HookedPicker { hooks };
        let result = picker.pick_result(&self.scene, Point::new(x, y), false, None);
        let refined = match hooks.pick_async.call(result.clone()).await {
            Some(refined) => refined,
            None => result,
        };
        Ok(refined.top())
    }

    // Coordinates

    pub fn client_to_viewport(&self, client: Point) -> Point {
        let rect = self.context.bounding_client_rect();
        Point::new(client.x - rect.x, client.y - rect.y)
    }

    pub fn viewport_to_client(&self, canvas: Point) -> Point {
        let rect = self.context.bounding_client_rect();
        Point::new(canvas.x + rect.x, canvas.y + rect.y)
    }

    /// World bounds of `id` in client coordinates.
    pub fn get_bounding_client_rect(&self, id: ElementId) -> Result<Option<Rect>, CanvasError> {
        self.check()?;
        if !self.scene.contains(id) {
            return Err(crate::error::TreeError::StaleElement(id).into());
        }
        let origin = self.context.bounding_client_rect();
        Ok(self
            .scene
            .get_bounds(id)
            .map(|b| b.to_rect().offset(origin.x, origin.y)))
    }

    /// Resize the surface and the scene viewport, then notify listeners on
    /// the document element with a `resize` event carrying `(width, height)`.
    pub fn resize(&mut self, width: f32, height: f32) -> Result<(), CanvasError> {
        self.check()?;
        self.config.width = width;
        self.config.height = height;
        self.context.resize(width, height);
        self.scene.set_viewport(width, height);
        self.rendering.invalidate_all();

        let root = self.scene.document_element();
        let mut event = FederatedEvent::new(names::RESIZE, false);
        event.set_detail((width, height));
        self.scene.dispatch_event(root, &mut event);
        log::debug!("Canvas resized to {}x{}", width, height);
        Ok(())
    }

    /// Tear down the scene, plugins and surface. Every later call fails with
    /// [`CanvasError::Destroyed`].
    pub fn destroy(&mut self) -> Result<(), CanvasError> {
        self.check()?;
        let root = self.scene.document_element();
        self.scene.remove_all_children(root)?;
        self.scene.deliver_mutations();
        self.events.reset();
        self.rendering.destroy();
        self.context.destroy();
        self.destroyed = true;
        log::info!("Canvas destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::events::ListenerOptions;
    use crate::render::{PluginContext, RenderItem};
    use crate::scene::ShapeKind;

    struct PickOverride;

    impl RenderingPlugin for PickOverride {
        fn name(&self) -> &str {
            "pick-override"
        }

        fn init(&mut self, ctx: &mut PluginContext<'_>) {
            ctx.hooks.pick.tap("pick-override", |mut result: PickingResult| {
                result.picked.clear();
                result
            });
        }
    }

    #[test]
    fn test_destroyed_canvas_rejects_calls() {
        let mut canvas = Canvas::new(CanvasConfig::new());
        canvas.destroy().unwrap();
        assert_eq!(canvas.render().unwrap_err(), CanvasError::Destroyed);
        assert_eq!(canvas.element_from_point(0.0, 0.0).unwrap_err(), CanvasError::Destroyed);
        assert_eq!(canvas.destroy().unwrap_err(), CanvasError::Destroyed);
    }

    #[test]
    fn test_pick_hook_refines_result() {
        let mut canvas = Canvas::new(CanvasConfig::new().size(200.0, 200.0));
        let rect = canvas
            .scene_mut()
            .create_element_with(ShapeKind::Rect, [("width", "50"), ("height", "50"), ("fill", "red")]);
        canvas.append_child(rect).unwrap();
        assert_eq!(canvas.element_from_point(10.0, 10.0).unwrap(), Some(rect));

        canvas.register_plugin(Box::new(PickOverride)).unwrap();
        assert_eq!(canvas.element_from_point(10.0, 10.0).unwrap(), None);
        assert_eq!(pollster::block_on(canvas.element_from_point_async(10.0, 10.0)).unwrap(), None);

        canvas.unregister_plugin("pick-override").unwrap();
        assert_eq!(canvas.element_from_point(10.0, 10.0).unwrap(), Some(rect));
    }

    #[test]
    fn test_resize_event_and_full_redraw() {
        let mut canvas = Canvas::new(CanvasConfig::new().size(100.0, 100.0));
        canvas.render().unwrap();
        let size = Rc::new(RefCell::new(None));
        let sink = size.clone();
        let root = canvas.document_element();
        canvas
            .scene_mut()
            .add_event_listener(
                root,
                names::RESIZE,
                move |e: &mut FederatedEvent| *sink.borrow_mut() = e.detail::<(f32, f32)>().copied(),
                ListenerOptions::default(),
            )
            .unwrap();
        canvas.resize(300.0, 200.0).unwrap();
        assert_eq!(*size.borrow(), Some((300.0, 200.0)));
        assert_eq!(canvas.context().bounding_client_rect(), Rect::from_size(300.0, 200.0));
        let stats = canvas.render().unwrap();
        assert_eq!(stats.damage, crate::render::Damage::Full);
    }

    #[test]
    fn test_cursor_applied_to_context() {
        let context = Rc::new(OffscreenContext::new(100.0, 100.0, 1.0));
        let mut canvas = Canvas::with_context(CanvasConfig::new().size(100.0, 100.0), context.clone());
        let rect = canvas.scene_mut().create_element_with(
            ShapeKind::Rect,
            [("width", "50"), ("height", "50"), ("fill", "red"), ("cursor", "pointer")],
        );
        canvas.append_child(rect).unwrap();
        canvas.on_pointer_move(PointerInput::new(10.0, 10.0)).unwrap();
        assert_eq!(context.cursor(), "pointer");
        canvas.on_pointer_leave(PointerInput::new(-1.0, -1.0)).unwrap();
        assert_eq!(context.cursor(), "default");
    }

    #[test]
    fn test_bounding_client_rect_offsets_by_surface() {
        let context = Rc::new(OffscreenContext::new(100.0, 100.0, 1.0));
        context.set_position(10.0, 20.0);
        let mut canvas = Canvas::with_context(CanvasConfig::new(), context);
        let rect = canvas
            .scene_mut()
            .create_element_with(ShapeKind::Rect, [("x", "5"), ("width", "10"), ("height", "10")]);
        canvas.append_child(rect).unwrap();
        assert_eq!(
            canvas.get_bounding_client_rect(rect).unwrap(),
            Some(Rect::new(15.0, 20.0, 10.0, 10.0))
        );
    }

    #[test]
    fn test_renders_with_backend() {
        struct Count(Rc<RefCell<usize>>);
        impl RenderingPlugin for Count {
            fn name(&self) -> &str {
                "count"
            }
            fn init(&mut self, ctx: &mut PluginContext<'_>) {
                let count = self.0.clone();
                ctx.hooks
                    .render
                    .tap("count", move |_: &RenderItem| *count.borrow_mut() += 1);
            }
        }

        let drawn = Rc::new(RefCell::new(0));
        let mut canvas = Canvas::new(CanvasConfig::new());
        canvas.register_plugin(Box::new(Count(drawn.clone()))).unwrap();
        let circle = canvas
            .scene_mut()
            .create_element_with(ShapeKind::Circle, [("cx", "20"), ("cy", "20"), ("r", "5"), ("fill", "red")]);
        canvas.append_child(circle).unwrap();
        canvas.render().unwrap();
        assert!(canvas.is_ready());
        assert_eq!(*drawn.borrow(), 1);
    }
}
