//! The event object passed to listeners.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use smallvec::SmallVec;

use crate::math::Point;
use crate::scene::ElementId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventPhase {
    #[default]
    None,
    Capturing,
    AtTarget,
    Bubbling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PointerType {
    #[default]
    Mouse,
    Pen,
    Touch,
}

/// Lifecycle and interaction event names.
pub mod names {
    pub const POINTER_DOWN: &str = "pointerdown";
    pub const POINTER_UP: &str = "pointerup";
    pub const POINTER_UP_OUTSIDE: &str = "pointerupoutside";
    pub const POINTER_MOVE: &str = "pointermove";
    pub const POINTER_OVER: &str = "pointerover";
    pub const POINTER_OUT: &str = "pointerout";
    pub const POINTER_ENTER: &str = "pointerenter";
    pub const POINTER_LEAVE: &str = "pointerleave";
    pub const CLICK: &str = "click";
    pub const WHEEL: &str = "wheel";
    pub const DRAG_START: &str = "dragstart";
    pub const DRAG: &str = "drag";
    pub const DRAG_END: &str = "dragend";
    pub const DRAG_ENTER: &str = "dragenter";
    pub const DRAG_OVER: &str = "dragover";
    pub const DRAG_LEAVE: &str = "dragleave";
    pub const DROP: &str = "drop";
    pub const INSERTED: &str = "DOMNodeInserted";
    pub const REMOVED: &str = "DOMNodeRemoved";
    pub const MOUNTED: &str = "DOMNodeInsertedIntoDocument";
    pub const UNMOUNTED: &str = "DOMNodeRemovedFromDocument";
    pub const DESTROY: &str = "destroy";
    pub const RESIZE: &str = "resize";
}

/// One dispatched event.
///
/// The dispatcher never keeps an event after `dispatch_event` returns, so a
/// caller may reuse one instance for many dispatches, changing its detail in
/// between.
#[derive(Clone)]
pub struct FederatedEvent {
    pub event_type: String,
    pub bubbles: bool,
    pub target: Option<ElementId>,
    pub current_target: Option<ElementId>,
    pub related_target: Option<ElementId>,
    pub phase: EventPhase,
    /// Position relative to the host viewport
    pub client: Point,
    /// Position in canvas coordinates
    pub canvas: Point,
    pub pointer_id: u32,
    pub pointer_type: PointerType,
    pub button: i16,
    pub buttons: u16,
    pub delta_x: f32,
    pub delta_y: f32,
    /// Host timestamp in milliseconds
    pub timestamp: f64,
    detail: Option<Rc<dyn Any>>,
    pub(crate) path: SmallVec<[ElementId; 8]>,
    pub(crate) propagation_stopped: bool,
    pub(crate) immediate_propagation_stopped: bool,
    pub(crate) default_prevented: bool,
    pub(crate) in_passive_listener: bool,
}

impl fmt::Debug for FederatedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FederatedEvent")
            .field("event_type", &self.event_type)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .field("phase", &self.phase)
            .field("canvas", &self.canvas)
            .field("has_detail", &self.detail.is_some())
            .finish()
    }
}

impl FederatedEvent {
    pub fn new(event_type: impl Into<String>, bubbles: bool) -> Self {
        Self {
            event_type: event_type.into(),
            bubbles,
            target: None,
            current_target: None,
            related_target: None,
            phase: EventPhase::None,
            client: Point::default(),
            canvas: Point::default(),
            pointer_id: 0,
            pointer_type: PointerType::Mouse,
            button: 0,
            buttons: 0,
            delta_x: 0.0,
            delta_y: 0.0,
            timestamp: 0.0,
            detail: None,
            path: SmallVec::new(),
            propagation_stopped: false,
            immediate_propagation_stopped: false,
            default_prevented: false,
            in_passive_listener: false,
        }
    }

    /// A bubbling user event carrying `detail`.
    pub fn custom<T: 'static>(event_type: impl Into<String>, detail: T) -> Self {
        let mut event = Self::new(event_type, true);
        event.set_detail(detail);
        event
    }

    pub fn detail<T: 'static>(&self) -> Option<&T> {
        self.detail.as_ref()?.downcast_ref()
    }

    pub fn set_detail<T: 'static>(&mut self, detail: T) {
        self.detail = Some(Rc::new(detail));
    }

    pub fn clear_detail(&mut self) {
        self.detail = None;
    }

    /// Elements the event travels through, target first.
    pub fn composed_path(&self) -> &[ElementId] {
        &self.path
    }

    pub fn stop_propagation(&mut self) {
        self.propagation_stopped = true;
    }

    pub fn stop_immediate_propagation(&mut self) {
        self.propagation_stopped = true;
        self.immediate_propagation_stopped = true;
    }

    pub fn is_propagation_stopped(&self) -> bool {
        self.propagation_stopped
    }

    /// Ignored inside passive listeners.
    pub fn prevent_default(&mut self) {
        if !self.in_passive_listener {
            self.default_prevented = true;
        }
    }

    pub fn default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// A fresh copy of this event with the same type, coordinates and
    /// detail, ready to be dispatched again.
    pub fn clone_for_dispatch(&self, event_type: Option<&str>) -> Self {
        let mut copy = self.clone();
        if let Some(t) = event_type {
            copy.event_type = t.to_string();
        }
        copy.reset();
        copy
    }

    /// Clear dispatch state so the instance can be dispatched again.
    pub(crate) fn reset(&mut self) {
        self.target = None;
        self.current_target = None;
        self.phase = EventPhase::None;
        self.path.clear();
        self.propagation_stopped = false;
        self.immediate_propagation_stopped = false;
        self.default_prevented = false;
        self.in_passive_listener = false;
    }
}
