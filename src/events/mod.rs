//! Pointer input, picking and DOM-style event dispatch.

pub mod dispatch;
pub mod dragndrop;
pub mod event;
pub mod hit_test;
pub mod listener;
pub mod picking;
pub mod service;

pub use dispatch::dispatch_event;
pub use dragndrop::{DragAndDrop, DragTrigger};
pub use event::{names, EventPhase, FederatedEvent, PointerType};
pub use listener::{Listener, ListenerId, ListenerOptions};
pub use picking::{pick_at, Picker, PickingResult, ScenePicker};
pub use service::{EventService, PointerInput};
