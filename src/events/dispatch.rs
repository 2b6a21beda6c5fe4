//! Capture, target and bubble dispatch over the scene tree.
//!
//! The propagation path is computed once per dispatch. At each node the
//! matching listeners are snapshotted before any of them runs, so listeners
//! added or removed during dispatch only affect later dispatches.
//!
//! While bubbling, an ancestor also receives `"<name>:<type>"` for every
//! element below it on the path that carries a `name`, with `target` still
//! pointing at the deepest element.
//!
//! A panicking listener does not stop the other listeners at the same node
//! and phase. Propagation ends after that node and the first panic is
//! resumed to the caller.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::scene::{ElementId, Scene};

use super::event::{EventPhase, FederatedEvent};

type Panic = Box<dyn Any + Send>;

/// Dispatch `event` at `target`. Returns `false` if a listener called
/// `prevent_default`.
///
/// Dispatching at an element that is not connected to the document does
/// nothing and returns `true`.
pub fn dispatch_event(scene: &mut Scene, target: ElementId, event: &mut FederatedEvent) -> bool {
    if !scene.is_connected(target) {
        log::debug!(
            "Skipping {:?} dispatch to detached element {:?}",
            event.event_type,
            target
        );
        return true;
    }
    dispatch_along_path(scene, target, event)
}

/// Dispatch regardless of connectivity, following the ancestor chain as it
/// currently is. Used for lifecycle events on detached subtrees.
pub(crate) fn dispatch_along_path(scene: &mut Scene, target: ElementId, event: &mut FederatedEvent) -> bool {
    if !scene.contains(target) {
        return true;
    }
    event.reset();
    event.target = Some(target);
    event.path = std::iter::once(target).chain(scene.ancestors(target)).collect();
    let path = event.path.clone();
    let event_type = event.event_type.clone();
    let mut panicked: Option<Panic> = None;

    for &node in path.iter().skip(1).rev() {
        if event.propagation_stopped || panicked.is_some() {
            break;
        }
        event.phase = EventPhase::Capturing;
        invoke(scene, node, &event_type, event, &mut panicked);
    }

    if !event.propagation_stopped && panicked.is_none() {
        event.phase = EventPhase::AtTarget;
        invoke(scene, target, &event_type, event, &mut panicked);
    }

    if event.bubbles {
        for (i, &node) in path.iter().enumerate().skip(1) {
            if event.propagation_stopped || panicked.is_some() {
                break;
            }
            event.phase = EventPhase::Bubbling;
            invoke(scene, node, &event_type, event, &mut panicked);

            let delegated: Vec<String> = path[..i]
                .iter()
                .filter_map(|below| scene.get(*below).and_then(|el| el.name()))
                .map(|name| format!("{}:{}", name, event_type))
                .collect();
            for delegated_type in delegated {
                if event.immediate_propagation_stopped || panicked.is_some() {
                    break;
                }
                invoke(scene, node, &delegated_type, event, &mut panicked);
            }
        }
    }

    event.phase = EventPhase::None;
    event.current_target = None;
    if let Some(payload) = panicked {
        panic::resume_unwind(payload);
    }
    !event.default_prevented
}

fn invoke(
    scene: &mut Scene,
    node: ElementId,
    event_type: &str,
    event: &mut FederatedEvent,
    panicked: &mut Option<Panic>,
) {
    let Some(element) = scene.tree.get_mut(node) else {
        return;
    };
    let entries = element.listeners.snapshot(event_type, event.phase);
    if entries.is_empty() {
        return;
    }
    for entry in entries.iter().filter(|e| e.options.once) {
        element.listeners.remove(entry.id);
    }

    event.current_target = Some(node);
    for entry in entries {
        if event.immediate_propagation_stopped {
            break;
        }
        event.in_passive_listener = entry.options.passive;
        let result = panic::catch_unwind(AssertUnwindSafe(|| (entry.callback)(event)));
        event.in_passive_listener = false;
        if let Err(payload) = result {
            log::error!("Listener for {:?} on {:?} panicked", event_type, node);
            if panicked.is_none() {
                *panicked = Some(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::events::event::names;
    use crate::events::listener::ListenerOptions;
    use crate::scene::ShapeKind;

    type Log = Rc<RefCell<Vec<String>>>;

    fn record(log: &Log, label: &str) -> impl Fn(&mut FederatedEvent) + 'static {
        let log = log.clone();
        let label = label.to_string();
        move |event: &mut FederatedEvent| {
            log.borrow_mut().push(format!("{}:{:?}", label, event.phase));
        }
    }

    fn setup() -> (Scene, ElementId, ElementId) {
        let mut scene = Scene::new(400.0, 400.0);
        let root = scene.document_element();
        let group = scene.create_element(ShapeKind::Group);
        let circle = scene.create_element(ShapeKind::Circle);
        scene.append_child(root, group).unwrap();
        scene.append_child(group, circle).unwrap();
        (scene, group, circle)
    }

    #[test]
    fn test_capture_target_bubble_order() {
        let (mut scene, group, circle) = setup();
        let log: Log = Rc::default();
        scene
            .add_event_listener(group, "ping", record(&log, "group-capture"), ListenerOptions::capture())
            .unwrap();
        scene
            .add_event_listener(group, "ping", record(&log, "group"), ListenerOptions::default())
            .unwrap();
        scene
            .add_event_listener(circle, "ping", record(&log, "circle"), ListenerOptions::default())
            .unwrap();

        let mut event = FederatedEvent::new("ping", true);
        assert!(dispatch_event(&mut scene, circle, &mut event));
        assert_eq!(
            *log.borrow(),
            vec!["group-capture:Capturing", "circle:AtTarget", "group:Bubbling"]
        );
        assert_eq!(event.composed_path()[0], circle);
        assert_eq!(event.composed_path().last(), Some(&scene.document_element()));
    }

    #[test]
    fn test_stop_propagation() {
        let (mut scene, group, circle) = setup();
        let log: Log = Rc::default();
        scene
            .add_event_listener(circle, "ping", |e: &mut FederatedEvent| e.stop_propagation(), ListenerOptions::default())
            .unwrap();
        scene
            .add_event_listener(circle, "ping", record(&log, "sibling"), ListenerOptions::default())
            .unwrap();
        scene
            .add_event_listener(group, "ping", record(&log, "group"), ListenerOptions::default())
            .unwrap();
        dispatch_event(&mut scene, circle, &mut FederatedEvent::new("ping", true));
        // Listeners on the same node still run.
        assert_eq!(*log.borrow(), vec!["sibling:AtTarget"]);
    }

    #[test]
    fn test_once_listener() {
        let (mut scene, _, circle) = setup();
        let log: Log = Rc::default();
        scene
            .add_event_listener(circle, "ping", record(&log, "once"), ListenerOptions::once())
            .unwrap();
        dispatch_event(&mut scene, circle, &mut FederatedEvent::new("ping", true));
        dispatch_event(&mut scene, circle, &mut FederatedEvent::new("ping", true));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn test_detached_is_noop() {
        let mut scene = Scene::new(100.0, 100.0);
        let lonely = scene.create_element(ShapeKind::Rect);
        let log: Log = Rc::default();
        scene
            .add_event_listener(lonely, "ping", record(&log, "lonely"), ListenerOptions::default())
            .unwrap();
        assert!(dispatch_event(&mut scene, lonely, &mut FederatedEvent::new("ping", true)));
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn test_delegated_listener_keeps_target() {
        let (mut scene, group, circle) = setup();
        scene.set_attribute(circle, "name", "knob").unwrap();
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        scene
            .add_event_listener(
                group,
                "knob:click",
                move |e: &mut FederatedEvent| {
                    *sink.borrow_mut() = Some((e.target, e.current_target, e.composed_path().len()));
                },
                ListenerOptions::default(),
            )
            .unwrap();
        dispatch_event(&mut scene, circle, &mut FederatedEvent::new(names::CLICK, true));
        assert_eq!(*seen.borrow(), Some((Some(circle), Some(group), 3)));
    }

    #[test]
    fn test_reused_custom_event() {
        let (mut scene, _, circle) = setup();
        let total = Rc::new(RefCell::new(0u32));
        let sink = total.clone();
        scene
            .add_event_listener(
                circle,
                "tick",
                move |e: &mut FederatedEvent| *sink.borrow_mut() += e.detail::<u32>().copied().unwrap_or(0),
                ListenerOptions::default(),
            )
            .unwrap();
        let mut event = FederatedEvent::custom("tick", 1u32);
        for n in 1..=3u32 {
            event.set_detail(n);
            dispatch_event(&mut scene, circle, &mut event);
        }
        assert_eq!(*total.borrow(), 6);
    }

    #[test]
    fn test_panicking_listener_does_not_skip_siblings() {
        let (mut scene, group, circle) = setup();
        let log: Log = Rc::default();
        scene
            .add_event_listener(circle, "ping", |_: &mut FederatedEvent| panic!("boom"), ListenerOptions::default())
            .unwrap();
        scene
            .add_event_listener(circle, "ping", record(&log, "after"), ListenerOptions::default())
            .unwrap();
        scene
            .add_event_listener(group, "ping", record(&log, "group"), ListenerOptions::default())
            .unwrap();

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatch_event(&mut scene, circle, &mut FederatedEvent::new("ping", true));
        }));
        assert!(result.is_err());
        assert_eq!(*log.borrow(), vec!["after:AtTarget"]);
    }
}
