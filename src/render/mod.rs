//! Plugin-driven rendering: hooks, the frame loop and damage tracking.

pub mod context;
pub mod dirty;
pub mod hooks;
pub mod plugin;
pub mod service;
pub mod tasks;

pub use context::{ContextService, OffscreenContext, SharedContext};
pub use dirty::{Damage, DirtyRectTracker};
pub use hooks::{AsyncParallelHook, AsyncSeriesWaterfallHook, SyncHook, SyncWaterfallHook};
pub use plugin::{DirtyRectangle, FrameInfo, InitFuture, PluginContext, RenderHooks, RenderItem, RenderingPlugin};
pub use service::{FrameStats, RenderingService};
pub use tasks::{Task, TaskQueue, Tile, TileGrid};
