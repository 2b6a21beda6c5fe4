//! Drag recognition and drop-target tracking.
//!
//! A pointer going down on a draggable element arms a pending drag. The drag
//! starts on the first move that reaches the distance threshold or happens
//! after the time threshold, with distance checked first. While dragging,
//! the element under the pointer (ignoring the dragged subtree) is resolved
//! to its closest droppable ancestor and receives `dragenter`, `dragover`,
//! `dragleave` and finally `drop`.

use crate::config::DragAndDropConfig;
use crate::math::Point;
use crate::scene::{ElementId, Scene, StyleSource};

use super::dispatch::dispatch_event;
use super::event::{names, FederatedEvent};
use super::picking::Picker;

/// Which threshold started a drag. Carried as the `dragstart` detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragTrigger {
    Distance,
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Pending {
        element: ElementId,
        pointer_id: u32,
        start: Point,
        start_time: f64,
    },
    Dragging {
        element: ElementId,
        pointer_id: u32,
        drop_target: Option<ElementId>,
    },
}

pub struct DragAndDrop {
    config: DragAndDropConfig,
    state: DragState,
}

impl DragAndDrop {
    pub fn new(config: DragAndDropConfig) -> Self {
        Self {
            config,
            state: DragState::Idle,
        }
    }

    pub fn config(&self) -> &DragAndDropConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: DragAndDropConfig) {
        self.config = config;
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    /// The element being dragged, once the drag has started.
    pub fn dragged(&self) -> Option<ElementId> {
        match self.state {
            DragState::Dragging { element, .. } => Some(element),
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        self.state = DragState::Idle;
    }

    pub(crate) fn on_down(&mut self, scene: &Scene, target: ElementId, event: &FederatedEvent) {
        self.state = match self.draggable_from(scene, target) {
            Some(element) => DragState::Pending {
                element,
                pointer_id: event.pointer_id,
                start: event.canvas,
                start_time: event.timestamp,
            },
            None => DragState::Idle,
        };
    }

    pub(crate) fn on_move(&mut self, scene: &mut Scene, picker: &dyn Picker, event: &FederatedEvent) {
        match self.state {
            DragState::Pending {
                element,
                pointer_id,
                start,
                start_time,
            } if pointer_id == event.pointer_id => {
                let trigger = if start.distance(event.canvas) >= self.config.drag_start_distance_threshold {
                    Some(DragTrigger::Distance)
                } else if event.timestamp - start_time >= self.config.drag_start_time_threshold {
                    Some(DragTrigger::Time)
                } else {
                    None
                };
                let Some(trigger) = trigger else {
                    return;
                };
                log::debug!("Drag of {:?} started by {:?}", element, trigger);
                self.state = DragState::Dragging {
                    element,
                    pointer_id,
                    drop_target: None,
                };
                let mut start_event = event.clone_for_dispatch(Some(names::DRAG_START));
                start_event.set_detail(trigger);
                dispatch_event(scene, element, &mut start_event);
                self.drag(scene, picker, event);
            }
            DragState::Dragging { pointer_id, .. } if pointer_id == event.pointer_id => {
                self.drag(scene, picker, event);
            }
            _ => {}
        }
    }

    pub(crate) fn on_up(&mut self, scene: &mut Scene, event: &FederatedEvent) {
        let DragState::Dragging {
            element,
            pointer_id,
            drop_target,
        } = self.state
        else {
            if let DragState::Pending { pointer_id, .. } = self.state {
                if pointer_id == event.pointer_id {
                    self.state = DragState::Idle;
                }
            }
            return;
        };
        if pointer_id != event.pointer_id {
            return;
        }
        self.state = DragState::Idle;

        if let Some(target) = drop_target {
            let mut drop = event.clone_for_dispatch(Some(names::DROP));
            drop.related_target = Some(element);
            dispatch_event(scene, target, &mut drop);
        }
        let mut end = event.clone_for_dispatch(Some(names::DRAG_END));
        end.related_target = drop_target;
        dispatch_event(scene, element, &mut end);
    }

    fn drag(&mut self, scene: &mut Scene, picker: &dyn Picker, event: &FederatedEvent) {
        let DragState::Dragging {
            element,
            drop_target: previous,
            ..
        } = self.state
        else {
            return;
        };
        dispatch_event(scene, element, &mut event.clone_for_dispatch(Some(names::DRAG)));

        let under = picker.pick(scene, event.canvas, Some(element));
        let current = self.droppable_from(scene, under);
        if current != previous {
            if let Some(old) = previous {
                let mut leave = event.clone_for_dispatch(Some(names::DRAG_LEAVE));
                leave.related_target = Some(element);
                dispatch_event(scene, old, &mut leave);
            }
            if let Some(new) = current {
                let mut enter = event.clone_for_dispatch(Some(names::DRAG_ENTER));
                enter.related_target = Some(element);
                dispatch_event(scene, new, &mut enter);
            }
            if let DragState::Dragging { drop_target, .. } = &mut self.state {
                *drop_target = current;
            }
        }
        if let Some(target) = current {
            let mut over = event.clone_for_dispatch(Some(names::DRAG_OVER));
            over.related_target = Some(element);
            dispatch_event(scene, target, &mut over);
        }
    }

    fn draggable_from(&self, scene: &Scene, target: ElementId) -> Option<ElementId> {
        self.closest_flagged(scene, Some(target), "draggable", self.config.document_draggable)
    }

    fn droppable_from(&self, scene: &Scene, target: Option<ElementId>) -> Option<ElementId> {
        self.closest_flagged(scene, target, "droppable", self.config.document_droppable)
    }

    fn closest_flagged(
        &self,
        scene: &Scene,
        target: Option<ElementId>,
        flag: &str,
        document_fallback: bool,
    ) -> Option<ElementId> {
        let document = scene.document_element();
        let found = target.and_then(|t| {
            std::iter::once(t)
                .chain(scene.ancestors(t))
                .filter(|id| *id != document)
                .find(|id| {
                    scene
                        .style_of(*id)
                        .computed(flag)
                        .and_then(|v| v.as_bool())
                        .unwrap_or(false)
                })
        });
        found.or_else(|| document_fallback.then_some(document))
    }
}
