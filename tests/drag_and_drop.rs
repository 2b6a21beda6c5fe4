use std::cell::RefCell;
use std::rc::Rc;

use arbor::prelude::*;

type Log = Rc<RefCell<Vec<String>>>;

fn listen(canvas: &mut Canvas, id: ElementId, types: &[&str]) -> Log {
    let log: Log = Rc::default();
    for event_type in types {
        let sink = log.clone();
        canvas
            .scene_mut()
            .add_event_listener(
                id,
                event_type,
                move |e: &mut FederatedEvent| sink.borrow_mut().push(e.event_type.clone()),
                ListenerOptions::default(),
            )
            .unwrap();
    }
    log
}

fn canvas_with(config: DragAndDropConfig) -> (Canvas, ElementId, ElementId) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut canvas = Canvas::new(CanvasConfig::new().size(400.0, 400.0).drag_and_drop(config));
    let scene = canvas.scene_mut();
    let ball = scene.create_element_with(
        ShapeKind::Circle,
        [("cx", "50"), ("cy", "50"), ("r", "20"), ("fill", "red"), ("draggable", "true")],
    );
    let bin = scene.create_element_with(
        ShapeKind::Rect,
        [
            ("x", "200"),
            ("y", "200"),
            ("width", "100"),
            ("height", "100"),
            ("fill", "gray"),
            ("droppable", "true"),
        ],
    );
    canvas.append_child(bin).unwrap();
    canvas.append_child(ball).unwrap();
    (canvas, ball, bin)
}

fn at(x: f32, y: f32, t: f64) -> PointerInput {
    PointerInput::new(x, y).button(0, 1).at_time(t)
}

#[test]
fn test_drag_threshold_sequence() {
    let (mut canvas, ball, _) = canvas_with(DragAndDropConfig::new().distance_threshold(10.0).time_threshold(500.0));
    let log = listen(&mut canvas, ball, &[names::DRAG_START, names::DRAG, names::DRAG_END]);

    canvas.on_pointer_down(at(50.0, 50.0, 0.0)).unwrap();
    canvas.on_pointer_move(at(53.0, 52.0, 100.0)).unwrap();
    assert!(log.borrow().is_empty());

    canvas.on_pointer_move(at(70.0, 50.0, 150.0)).unwrap();
    canvas.on_pointer_move(at(80.0, 50.0, 200.0)).unwrap();
    canvas.on_pointer_up(at(80.0, 50.0, 250.0)).unwrap();

    assert_eq!(*log.borrow(), vec!["dragstart", "drag", "drag", "dragend"]);
}

#[test]
fn test_time_threshold_starts_drag() {
    let (mut canvas, ball, _) = canvas_with(DragAndDropConfig::new().distance_threshold(100.0).time_threshold(300.0));
    let log = listen(&mut canvas, ball, &[names::DRAG_START]);
    canvas.on_pointer_down(at(50.0, 50.0, 0.0)).unwrap();
    canvas.on_pointer_move(at(51.0, 50.0, 299.0)).unwrap();
    assert!(log.borrow().is_empty());
    canvas.on_pointer_move(at(52.0, 50.0, 300.0)).unwrap();
    assert_eq!(log.borrow().len(), 1);
}

#[test]
fn test_drop_on_droppable() {
    let (mut canvas, ball, bin) = canvas_with(DragAndDropConfig::new().distance_threshold(5.0));
    let log = listen(
        &mut canvas,
        bin,
        &[names::DRAG_ENTER, names::DRAG_LEAVE, names::DRAG_OVER, names::DROP],
    );
    let dropped = Rc::new(RefCell::new(None));
    let sink = dropped.clone();
    canvas
        .scene_mut()
        .add_event_listener(
            bin,
            names::DROP,
            move |e: &mut FederatedEvent| *sink.borrow_mut() = e.related_target,
            ListenerOptions::default(),
        )
        .unwrap();

    canvas.on_pointer_down(at(50.0, 50.0, 0.0)).unwrap();
    canvas.on_pointer_move(at(250.0, 250.0, 10.0)).unwrap();
    canvas.on_pointer_up(at(250.0, 250.0, 20.0)).unwrap();

    assert_eq!(*log.borrow(), vec!["dragenter", "dragover", "drop"]);
    assert_eq!(*dropped.borrow(), Some(ball));
}

#[test]
fn test_document_droppable_fallback() {
    let (mut canvas, _, _) = canvas_with(DragAndDropConfig::new().distance_threshold(5.0).document_droppable(true));
    let root = canvas.document_element();
    let log = listen(&mut canvas, root, &[names::DRAG_ENTER, names::DROP]);

    canvas.on_pointer_down(at(50.0, 50.0, 0.0)).unwrap();
    canvas.on_pointer_move(at(380.0, 20.0, 10.0)).unwrap();
    canvas.on_pointer_up(at(380.0, 20.0, 20.0)).unwrap();
    assert_eq!(*log.borrow(), vec!["dragenter", "drop"]);
}

#[test]
fn test_release_before_threshold_is_a_click() {
    let (mut canvas, ball, _) = canvas_with(DragAndDropConfig::new().distance_threshold(10.0).time_threshold(1000.0));
    let log = listen(&mut canvas, ball, &[names::CLICK, names::DRAG_START, names::DRAG_END]);
    canvas.on_pointer_down(at(50.0, 50.0, 0.0)).unwrap();
    canvas.on_pointer_move(at(52.0, 50.0, 10.0)).unwrap();
    canvas.on_pointer_up(at(52.0, 50.0, 20.0)).unwrap();
    assert_eq!(*log.borrow(), vec!["click"]);
}
