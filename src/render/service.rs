//! The frame loop and plugin registry.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::config::RenderConfig;
use crate::error::PluginError;
use crate::math::{Aabb, Rect};
use crate::scene::{ElementId, Lifecycle, Scene};
use crate::style::{registry, Color, CssLength, ParsedValue};

use super::context::SharedContext;
use super::dirty::{Damage, DirtyRectTracker};
use super::plugin::{DirtyRectangle, FrameInfo, PluginContext, RenderHooks, RenderItem, RenderingPlugin};
use super::tasks::TaskQueue;

/// What one call to [`RenderingService::render`] did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStats {
    pub frame: u64,
    /// Nothing changed so no hooks ran.
    pub skipped: bool,
    pub damage: Damage,
    pub rendered: usize,
    pub culled: usize,
    /// Outside the damaged area.
    pub clean: usize,
    pub tasks_run: usize,
}

pub struct RenderingService {
    hooks: RenderHooks,
    plugins: Vec<Box<dyn RenderingPlugin>>,
    config: RenderConfig,
    context: SharedContext,
    tasks: TaskQueue,
    dirty: DirtyRectTracker,
    background: Color,
    frame: u64,
    initialized: bool,
    /// Plugins whose `init` taps have not run yet.
    awaiting_init: Vec<String>,
    /// Plugins whose `init_async` taps have not all succeeded yet.
    awaiting_ready: Vec<String>,
    /// Plugins that have not been told about the connected elements yet.
    awaiting_mount: Vec<String>,
}

impl RenderingService {
    pub fn new(config: RenderConfig, context: SharedContext, background: Color) -> Self {
        Self {
            hooks: RenderHooks::default(),
            plugins: Vec::new(),
            config,
            context,
            tasks: TaskQueue::new(),
            dirty: DirtyRectTracker::new(),
            background,
            frame: 0,
            initialized: false,
            awaiting_init: Vec::new(),
            awaiting_ready: Vec::new(),
            awaiting_mount: Vec::new(),
        }
    }

    pub fn hooks(&self) -> &RenderHooks {
        &self.hooks
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn tasks(&self) -> &TaskQueue {
        &self.tasks
    }

    /// Whether every registered plugin finished initialising. Registering a
    /// plugin clears this until the next [`init`](Self::init).
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn register_plugin(&mut self, mut plugin: Box<dyn RenderingPlugin>) -> Result<(), PluginError> {
        let name = plugin.name().to_string();
        if self.plugins.iter().any(|p| p.name() == name) {
            return Err(PluginError::Duplicate(name));
        }
        let mut ctx = PluginContext {
            hooks: &mut self.hooks,
            config: &self.config,
            context: self.context.clone(),
            tasks: self.tasks.clone(),
        };
        plugin.init(&mut ctx);
        log::info!("Registered rendering plugin '{}'", name);
        self.plugins.push(plugin);
        self.awaiting_init.push(name.clone());
        self.awaiting_ready.push(name.clone());
        self.awaiting_mount.push(name);
        self.initialized = false;
        // a backend swapped in at runtime paints the whole canvas first
        self.dirty.invalidate_all();
        Ok(())
    }

    pub fn unregister_plugin(&mut self, name: &str) -> Result<Box<dyn RenderingPlugin>, PluginError> {
        let index = self
            .plugins
            .iter()
            .position(|p| p.name() == name)
            .ok_or_else(|| PluginError::NotFound(name.to_string()))?;
        let mut plugin = self.plugins.remove(index);
        plugin.destroy(&mut self.hooks);
        for pending in [&mut self.awaiting_init, &mut self.awaiting_ready, &mut self.awaiting_mount] {
            pending.retain(|p| p != name);
        }
        log::info!("Unregistered rendering plugin '{}'", name);
        self.dirty.invalidate_all();
        Ok(plugin)
    }

    pub fn plugins(&self) -> Vec<&str> {
        self.plugins.iter().map(|p| p.name()).collect()
    }

    pub fn get_plugin(&self, name: &str) -> Option<&dyn RenderingPlugin> {
        self.plugins.iter().find(|p| p.name() == name).map(|p| p.as_ref())
    }

    /// Run the init hooks of plugins that have not initialised yet and wait
    /// for their async initialisers. The first failure in tap order is
    /// reported. `init` taps run once per plugin; a retry repeats only the
    /// async taps of the plugins that failed.
    pub async fn init(&mut self) -> Result<(), PluginError> {
        for plugin in std::mem::take(&mut self.awaiting_init) {
            self.hooks.init.call_for(&plugin, &());
        }
        let results = self.hooks.init_async.call_for(&self.awaiting_ready, ()).await;

        let mut failed: Vec<String> = Vec::new();
        let mut first_error = None;
        for (plugin, result) in results {
            if let Err(reason) = result {
                log::error!("Plugin '{}' failed to initialise: {}", plugin, reason);
                if !failed.contains(&plugin) {
                    failed.push(plugin.clone());
                }
                if first_error.is_none() {
                    first_error = Some(PluginError::Init { plugin, reason });
                }
            }
        }
        self.awaiting_ready.retain(|p| failed.contains(p));
        if let Some(err) = first_error {
            return Err(err);
        }
        self.initialized = true;
        Ok(())
    }

    /// Tell plugins attached after elements were connected about those
    /// elements. Changes still queued for this frame are left to the regular
    /// flush.
    fn replay_mounted(&mut self, scene: &Scene) {
        if self.awaiting_mount.is_empty() {
            return;
        }
        let document = scene.document_element();
        let mut known: Vec<ElementId> = scene.paint_order().into_iter().filter(|id| *id != document).collect();
        for change in scene.lifecycle.iter().rev() {
            match *change {
                Lifecycle::Mounted(id) => known.retain(|k| *k != id),
                Lifecycle::Unmounted(id) => known.push(id),
            }
        }
        for plugin in std::mem::take(&mut self.awaiting_mount) {
            for id in &known {
                self.hooks.mounted.call_for(&plugin, id);
            }
        }
    }

    /// Repaint everything on the next frame.
    pub fn invalidate_all(&mut self) {
        self.dirty.invalidate_all();
    }

    /// Whether the next [`render`](Self::render) would do anything.
    pub fn needs_frame(&self, scene: &Scene) -> bool {
        scene.has_pending_changes() || self.dirty.has_pending() || !self.tasks.is_empty()
    }

    /// Flush the scene's pending changes and run one frame of hooks.
    pub fn render(&mut self, scene: &mut Scene, viewport: Rect) -> FrameStats {
        let tasks_run = self.tasks.run_frame(self.config.max_tasks_per_frame);
        if self.tasks.take_rerender_request() {
            self.dirty.invalidate_all();
        }

        self.replay_mounted(scene);
        for change in scene.take_lifecycle() {
            match change {
                Lifecycle::Mounted(id) => self.hooks.mounted.call(&id),
                Lifecycle::Unmounted(id) => {
                    self.dirty.remove(id);
                    self.hooks.unmounted.call(&id);
                }
            }
        }
        let order_changed = scene.take_order_dirty();
        for id in scene.take_render_dirty() {
            if scene.is_connected(id) {
                self.dirty.update(id, scene.get_render_bounds(id));
            }
        }

        let debug = self.config.enable_dirty_rectangle_debug;
        let previous_debug = self.dirty.last_debug_rect();
        let damage = if self.config.enable_dirty_rectangle {
            self.dirty.take(viewport, debug)
        } else if self.dirty_or_order(order_changed) {
            Damage::Full
        } else {
            Damage::None
        };

        let mut stats = FrameStats {
            frame: self.frame,
            skipped: damage.is_none(),
            damage,
            rendered: 0,
            culled: 0,
            clean: 0,
            tasks_run,
        };
        if stats.skipped {
            return stats;
        }

        if debug {
            if let Damage::Partial(rect) = damage {
                self.hooks.dirty_rectangle.call(&DirtyRectangle {
                    rect,
                    previous: previous_debug,
                });
            }
        }

        let info = FrameInfo {
            frame: self.frame,
            viewport,
            damage,
            background: self.background,
        };
        self.hooks.begin_frame.call(&info);

        let viewport_box = viewport.to_aabb();
        let clip = damage.clip().map(|r| r.to_aabb());
        let document = scene.document_element();
        for id in scene.paint_order() {
            if id == document {
                continue;
            }
            let bounds = scene.get_render_bounds(id);
            if self.config.enable_culling && bounds.is_some_and(|b| !b.intersects(&viewport_box)) {
                stats.culled += 1;
                continue;
            }
            if let (Some(clip), Some(b)) = (&clip, &bounds) {
                if !b.intersects(clip) {
                    stats.clean += 1;
                    continue;
                }
            }
            if !scene.is_visible(id) {
                continue;
            }
            let Some(item) = render_item(scene, id, bounds) else {
                continue;
            };
            self.hooks.render.call(&item);
            stats.rendered += 1;
        }

        self.hooks.end_frame.call(&info);
        log::debug!(
            "Frame {}: {:?}, rendered {}, culled {}, clean {}",
            self.frame,
            damage,
            stats.rendered,
            stats.culled,
            stats.clean
        );
        self.frame += 1;
        stats
    }

    // Without dirty rectangles any pending change means a full repaint.
    fn dirty_or_order(&mut self, order_changed: bool) -> bool {
        let pending = self.dirty.has_pending() || order_changed;
        self.dirty.take(Rect::default(), false);
        pending
    }

    /// Detach every plugin and run the destroy hooks.
    pub fn destroy(&mut self) {
        self.hooks.destroy.call(&());
        for mut plugin in self.plugins.drain(..) {
            plugin.destroy(&mut self.hooks);
        }
        self.tasks.clear();
        self.dirty.clear();
        self.initialized = false;
        self.awaiting_init.clear();
        self.awaiting_ready.clear();
        self.awaiting_mount.clear();
    }
}

fn render_item(scene: &Scene, id: ElementId, render_bounds: Option<Aabb>) -> Option<RenderItem> {
    let kind = scene.kind(id)?;
    let world_transform = scene.get_world_transform(id)?;
    let mut style: FxHashMap<&'static str, _> = registry::PROPERTIES
        .iter()
        .filter_map(|def| scene.get_computed_style(id, def.name).map(|v| (def.name, v)))
        .collect();
    // relative font sizes are meaningless without the ancestors
    style.insert("fontSize", ParsedValue::Length(CssLength::px(scene.font_size_px(id))));
    Some(RenderItem {
        id,
        kind,
        world_transform,
        opacity: scene.effective_opacity(id),
        z_index: scene.z_index(id),
        render_bounds,
        style: Rc::new(style),
    })
}
