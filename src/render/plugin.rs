//! The plugin contract and the hook set plugins tap into.

use std::rc::Rc;

use futures::future::LocalBoxFuture;
use rustc_hash::FxHashMap;

use crate::config::RenderConfig;
use crate::events::PickingResult;
use crate::math::{Aabb, Mat4, Rect};
use crate::scene::{ElementId, ShapeKind};
use crate::style::{Color, ParsedValue};

use super::context::SharedContext;
use super::dirty::Damage;
use super::hooks::{AsyncParallelHook, AsyncSeriesWaterfallHook, SyncHook, SyncWaterfallHook};
use super::tasks::TaskQueue;

/// Per-frame information handed to `begin_frame` and `end_frame`.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInfo {
    pub frame: u64,
    pub viewport: Rect,
    pub damage: Damage,
    pub background: Color,
}

/// Everything a backend needs to draw one element. Built fresh each frame;
/// the scene itself is never exposed to backends.
#[derive(Debug, Clone)]
pub struct RenderItem {
    pub id: ElementId,
    pub kind: ShapeKind,
    pub world_transform: Mat4,
    /// Opacity multiplied down from the ancestors.
    pub opacity: f32,
    pub z_index: f32,
    pub render_bounds: Option<Aabb>,
    pub style: Rc<FxHashMap<&'static str, ParsedValue>>,
}

impl RenderItem {
    pub fn get(&self, name: &str) -> Option<&ParsedValue> {
        self.style.get(name)
    }
}

/// The damaged area of the frame, for drawing a debug overlay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirtyRectangle {
    pub rect: Rect,
    /// Overlay drawn last frame; already included in `rect`.
    pub previous: Option<Rect>,
}

/// Result of an async init tap.
pub type InitFuture = LocalBoxFuture<'static, Result<(), String>>;

#[derive(Default)]
pub struct RenderHooks {
    pub init: SyncHook<()>,
    pub init_async: AsyncParallelHook<(), Result<(), String>>,
    pub begin_frame: SyncHook<FrameInfo>,
    pub render: SyncHook<RenderItem>,
    pub end_frame: SyncHook<FrameInfo>,
    pub mounted: SyncHook<ElementId>,
    pub unmounted: SyncHook<ElementId>,
    pub pick: SyncWaterfallHook<PickingResult>,
    pub pick_async: AsyncSeriesWaterfallHook<PickingResult>,
    pub dirty_rectangle: SyncHook<DirtyRectangle>,
    pub destroy: SyncHook<()>,
}

impl RenderHooks {
    /// Remove every tap `plugin` registered, on every hook.
    pub fn untap_all(&mut self, plugin: &str) -> usize {
        self.init.untap_all(plugin)
            + self.init_async.untap_all(plugin)
            + self.begin_frame.untap_all(plugin)
            + self.render.untap_all(plugin)
            + self.end_frame.untap_all(plugin)
            + self.mounted.untap_all(plugin)
            + self.unmounted.untap_all(plugin)
            + self.pick.untap_all(plugin)
            + self.pick_async.untap_all(plugin)
            + self.dirty_rectangle.untap_all(plugin)
            + self.destroy.untap_all(plugin)
    }
}

/// What a plugin receives when it is attached.
pub struct PluginContext<'a> {
    pub hooks: &'a mut RenderHooks,
    pub config: &'a RenderConfig,
    pub context: SharedContext,
    pub tasks: TaskQueue,
}

pub trait RenderingPlugin {
    /// Unique among the plugins of one canvas; used to tag taps.
    fn name(&self) -> &str;

    fn init(&mut self, ctx: &mut PluginContext<'_>);

    /// Detach from the hooks. The default removes every tap tagged with
    /// [`name`](Self::name).
    fn destroy(&mut self, hooks: &mut RenderHooks) {
        hooks.untap_all(self.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untap_all_spans_hooks() {
        let mut hooks = RenderHooks::default();
        hooks.begin_frame.tap("a", |_: &FrameInfo| {});
        hooks.render.tap("a", |_: &RenderItem| {});
        hooks.pick.tap("b", |r: PickingResult| r);
        assert_eq!(hooks.untap_all("a"), 2);
        assert!(hooks.render.is_empty());
        assert_eq!(hooks.pick.len(), 1);
    }
}
