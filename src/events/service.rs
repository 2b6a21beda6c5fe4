//! Turns raw pointer input into federated events on scene elements.
//!
//! Each pointer id keeps its own hover and press state, so multi-touch
//! produces independent over/out and click sequences.

use rustc_hash::FxHashMap;

use crate::config::DragAndDropConfig;
use crate::math::Point;
use crate::scene::{ElementId, Scene, StyleSource};

use super::dispatch::dispatch_event;
use super::dragndrop::DragAndDrop;
use super::event::{names, FederatedEvent, PointerType};
use super::picking::Picker;

/// Pointer input in client coordinates, as a platform layer reports it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub pointer_id: u32,
    pub pointer_type: PointerType,
    pub client: Point,
    pub button: i16,
    pub buttons: u16,
    pub delta_x: f32,
    pub delta_y: f32,
    /// Milliseconds, any monotonic origin.
    pub timestamp: f64,
}

impl PointerInput {
    pub fn new(x: f32, y: f32) -> Self {
        Self {
            pointer_id: 1,
            pointer_type: PointerType::Mouse,
            client: Point::new(x, y),
            button: 0,
            buttons: 0,
            delta_x: 0.0,
            delta_y: 0.0,
            timestamp: 0.0,
        }
    }

    pub fn pointer(mut self, id: u32, pointer_type: PointerType) -> Self {
        self.pointer_id = id;
        self.pointer_type = pointer_type;
        self
    }

    pub fn button(mut self, button: i16, buttons: u16) -> Self {
        self.button = button;
        self.buttons = buttons;
        self
    }

    pub fn delta(mut self, dx: f32, dy: f32) -> Self {
        self.delta_x = dx;
        self.delta_y = dy;
        self
    }

    pub fn at_time(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct PointerState {
    over: Option<ElementId>,
    down: Option<ElementId>,
}

pub struct EventService {
    pointers: FxHashMap<u32, PointerState>,
    canvas_origin: Point,
    default_cursor: String,
    current_cursor: String,
    cursor_change: Option<String>,
    drag: DragAndDrop,
}

impl EventService {
    pub fn new(default_cursor: impl Into<String>, drag: DragAndDropConfig) -> Self {
        let default_cursor = default_cursor.into();
        Self {
            pointers: FxHashMap::default(),
            canvas_origin: Point::default(),
            current_cursor: default_cursor.clone(),
            default_cursor,
            cursor_change: None,
            drag: DragAndDrop::new(drag),
        }
    }

    /// Top-left of the canvas in client coordinates.
    pub fn set_canvas_origin(&mut self, origin: Point) {
        self.canvas_origin = origin;
    }

    pub fn client_to_canvas(&self, client: Point) -> Point {
        Point::new(client.x - self.canvas_origin.x, client.y - self.canvas_origin.y)
    }

    pub fn canvas_to_client(&self, canvas: Point) -> Point {
        Point::new(canvas.x + self.canvas_origin.x, canvas.y + self.canvas_origin.y)
    }

    pub fn drag_and_drop(&self) -> &DragAndDrop {
        &self.drag
    }

    pub fn drag_and_drop_mut(&mut self) -> &mut DragAndDrop {
        &mut self.drag
    }

    /// The cursor requested since the last call, if it changed.
    pub fn take_cursor_change(&mut self) -> Option<String> {
        self.cursor_change.take()
    }

    /// Element the pointer is currently over.
    pub fn hovered(&self, pointer_id: u32) -> Option<ElementId> {
        self.pointers.get(&pointer_id).and_then(|p| p.over)
    }

    pub fn on_pointer_down(&mut self, scene: &mut Scene, picker: &dyn Picker, input: PointerInput) {
        let event = self.event_from(names::POINTER_DOWN, &input);
        let target = self.target_at(scene, picker, event.canvas);
        self.update_over(scene, target, &event);
        dispatch_event(scene, target, &mut event.clone_for_dispatch(None));
        self.state(input.pointer_id).down = Some(target);
        self.drag.on_down(scene, target, &event);
    }

    pub fn on_pointer_move(&mut self, scene: &mut Scene, picker: &dyn Picker, input: PointerInput) {
        let event = self.event_from(names::POINTER_MOVE, &input);
        let target = self.target_at(scene, picker, event.canvas);
        self.update_over(scene, target, &event);
        dispatch_event(scene, target, &mut event.clone_for_dispatch(None));
        self.drag.on_move(scene, picker, &event);
    }

    pub fn on_pointer_up(&mut self, scene: &mut Scene, picker: &dyn Picker, input: PointerInput) {
        let event = self.event_from(names::POINTER_UP, &input);
        let target = self.target_at(scene, picker, event.canvas);
        dispatch_event(scene, target, &mut event.clone_for_dispatch(None));

        let down = self.state(input.pointer_id).down.take();
        match down {
            Some(pressed) if pressed == target => {
                dispatch_event(scene, target, &mut event.clone_for_dispatch(Some(names::CLICK)));
            }
            Some(pressed) if scene.contains(pressed) => {
                dispatch_event(scene, pressed, &mut event.clone_for_dispatch(Some(names::POINTER_UP_OUTSIDE)));
            }
            _ => {}
        }
        self.drag.on_up(scene, &event);
        if input.pointer_type == PointerType::Touch {
            // touch pointers do not hover once lifted
            self.update_over_to(scene, None, &event);
            self.pointers.remove(&input.pointer_id);
        }
    }

    /// Pointer left the canvas entirely.
    pub fn on_pointer_leave_canvas(&mut self, scene: &mut Scene, input: PointerInput) {
        let event = self.event_from(names::POINTER_OUT, &input);
        self.update_over_to(scene, None, &event);
    }

    pub fn on_wheel(&mut self, scene: &mut Scene, picker: &dyn Picker, input: PointerInput) {
        let event = self.event_from(names::WHEEL, &input);
        let target = self.target_at(scene, picker, event.canvas);
        dispatch_event(scene, target, &mut event.clone_for_dispatch(None));
    }

    /// Forget hover and press state, e.g. after the scene was rebuilt.
    pub fn reset(&mut self) {
        self.pointers.clear();
        self.drag.reset();
    }

    fn state(&mut self, pointer_id: u32) -> &mut PointerState {
        self.pointers.entry(pointer_id).or_default()
    }

    fn event_from(&self, event_type: &str, input: &PointerInput) -> FederatedEvent {
        let mut event = FederatedEvent::new(event_type, true);
        event.client = input.client;
        event.canvas = self.client_to_canvas(input.client);
        event.pointer_id = input.pointer_id;
        event.pointer_type = input.pointer_type;
        event.button = input.button;
        event.buttons = input.buttons;
        event.delta_x = input.delta_x;
        event.delta_y = input.delta_y;
        event.timestamp = input.timestamp;
        event
    }

    fn target_at(&self, scene: &Scene, picker: &dyn Picker, position: Point) -> ElementId {
        picker
            .pick(scene, position, None)
            .unwrap_or_else(|| scene.document_element())
    }

    fn update_over(&mut self, scene: &mut Scene, target: ElementId, event: &FederatedEvent) {
        self.update_over_to(scene, Some(target), event);
    }

    fn update_over_to(&mut self, scene: &mut Scene, target: Option<ElementId>, event: &FederatedEvent) {
        let previous = self
            .state(event.pointer_id)
            .over
            .filter(|id| scene.is_connected(*id));
        if previous == target {
            return;
        }
        self.state(event.pointer_id).over = target;

        let old_path = previous.map(|id| path_from_root(scene, id)).unwrap_or_default();
        let new_path = target.map(|id| path_from_root(scene, id)).unwrap_or_default();
        let shared = old_path
            .iter()
            .zip(new_path.iter())
            .take_while(|(a, b)| a == b)
            .count();

        if let Some(old) = previous {
            let mut out = event.clone_for_dispatch(Some(names::POINTER_OUT));
            out.bubbles = true;
            out.related_target = target;
            dispatch_event(scene, old, &mut out);
            for id in old_path[shared..].iter().rev() {
                let mut leave = event.clone_for_dispatch(Some(names::POINTER_LEAVE));
                leave.bubbles = false;
                leave.related_target = target;
                dispatch_event(scene, *id, &mut leave);
            }
        }
        if let Some(new) = target {
            let mut over = event.clone_for_dispatch(Some(names::POINTER_OVER));
            over.bubbles = true;
            over.related_target = previous;
            dispatch_event(scene, new, &mut over);
            for id in &new_path[shared..] {
                let mut enter = event.clone_for_dispatch(Some(names::POINTER_ENTER));
                enter.bubbles = false;
                enter.related_target = previous;
                dispatch_event(scene, *id, &mut enter);
            }
        }

        let cursor = target
            .and_then(|id| scene.style_of(id).keyword("cursor"))
            .unwrap_or_else(|| self.default_cursor.clone());
        if cursor != self.current_cursor {
            self.current_cursor = cursor.clone();
            self.cursor_change = Some(cursor);
        }
    }
}

fn path_from_root(scene: &Scene, id: ElementId) -> Vec<ElementId> {
    let mut path = scene.ancestors(id);
    path.reverse();
    path.push(id);
    path
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::events::listener::ListenerOptions;
    use crate::events::picking::ScenePicker;
    use crate::scene::ShapeKind;

    type Log = Rc<RefCell<Vec<String>>>;

    fn listen(scene: &mut Scene, id: ElementId, label: &'static str, types: &[&str], log: &Log) {
        for event_type in types {
            let sink = log.clone();
            scene
                .add_event_listener(
                    id,
                    event_type,
                    move |e: &mut FederatedEvent| {
                        sink.borrow_mut().push(format!("{}:{}", label, e.event_type))
                    },
                    ListenerOptions::default(),
                )
                .unwrap();
        }
    }

    fn setup() -> (Scene, ElementId, ElementId, ElementId) {
        let mut scene = Scene::new(300.0, 300.0);
        let root = scene.document_element();
        let group = scene.create_element(ShapeKind::Group);
        let a = scene.create_element_with(
            ShapeKind::Rect,
            [("width", "100"), ("height", "100"), ("fill", "red"), ("cursor", "pointer")],
        );
        let b = scene.create_element_with(
            ShapeKind::Rect,
            [("x", "150"), ("width", "100"), ("height", "100"), ("fill", "blue")],
        );
        scene.append_child(root, group).unwrap();
        scene.append_child(group, a).unwrap();
        scene.append_child(group, b).unwrap();
        (scene, group, a, b)
    }

    #[test]
    fn test_click_requires_same_target() {
        let (mut scene, _, a, b) = setup();
        let log: Log = Rc::default();
        listen(&mut scene, a, "a", &[names::CLICK, names::POINTER_UP_OUTSIDE], &log);
        listen(&mut scene, b, "b", &[names::CLICK], &log);
        let mut service = EventService::new("default", DragAndDropConfig::default());

        service.on_pointer_down(&mut scene, &ScenePicker, PointerInput::new(50.0, 50.0));
        service.on_pointer_up(&mut scene, &ScenePicker, PointerInput::new(60.0, 60.0));
        service.on_pointer_down(&mut scene, &ScenePicker, PointerInput::new(50.0, 50.0));
        service.on_pointer_up(&mut scene, &ScenePicker, PointerInput::new(200.0, 50.0));

        assert_eq!(*log.borrow(), vec!["a:click", "a:pointerupoutside"]);
    }

    #[test]
    fn test_enter_leave_follow_path_difference() {
        let (mut scene, group, a, b) = setup();
        let log: Log = Rc::default();
        let types = [names::POINTER_ENTER, names::POINTER_LEAVE, names::POINTER_OVER, names::POINTER_OUT];
        listen(&mut scene, group, "g", &types, &log);
        listen(&mut scene, a, "a", &types, &log);
        listen(&mut scene, b, "b", &types, &log);
        let mut service = EventService::new("default", DragAndDropConfig::default());

        service.on_pointer_move(&mut scene, &ScenePicker, PointerInput::new(50.0, 50.0));
        assert_eq!(
            *log.borrow(),
            vec!["a:pointerover", "g:pointerover", "g:pointerenter", "a:pointerenter"]
        );
        log.borrow_mut().clear();

        service.on_pointer_move(&mut scene, &ScenePicker, PointerInput::new(200.0, 50.0));
        assert_eq!(
            *log.borrow(),
            vec![
                "a:pointerout",
                "g:pointerout",
                "a:pointerleave",
                "b:pointerover",
                "g:pointerover",
                "b:pointerenter",
            ]
        );
    }

    #[test]
    fn test_cursor_follows_hover() {
        let (mut scene, _, _, _) = setup();
        let mut service = EventService::new("default", DragAndDropConfig::default());
        service.on_pointer_move(&mut scene, &ScenePicker, PointerInput::new(50.0, 50.0));
        assert_eq!(service.take_cursor_change().as_deref(), Some("pointer"));
        service.on_pointer_move(&mut scene, &ScenePicker, PointerInput::new(55.0, 50.0));
        assert_eq!(service.take_cursor_change(), None);
        service.on_pointer_move(&mut scene, &ScenePicker, PointerInput::new(200.0, 50.0));
        assert_eq!(service.take_cursor_change().as_deref(), Some("default"));
    }

    #[test]
    fn test_empty_space_targets_document() {
        let (mut scene, _, _, _) = setup();
        let root = scene.document_element();
        let log: Log = Rc::default();
        listen(&mut scene, root, "doc", &[names::WHEEL], &log);
        let mut service = EventService::new("default", DragAndDropConfig::default());
        service.set_canvas_origin(Point::new(10.0, 10.0));
        service.on_wheel(&mut scene, &ScenePicker, PointerInput::new(290.0, 290.0).delta(0.0, 3.0));
        assert_eq!(*log.borrow(), vec!["doc:wheel"]);
    }
}
