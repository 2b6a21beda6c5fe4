//! Finding the elements under a canvas-space point.
//!
//! Candidates are visited in reverse paint order so the topmost element
//! comes first. Each one is tested in its own local space with the shape's
//! containment function; `pointerEvents` decides whether fill, stroke or
//! both take part.

use crate::math::Point;
use crate::scene::{ElementId, PointerTargets, Scene, ShapeKind, StyleSource};
use crate::scene::shape::HitInput;

/// What a pick found, topmost first.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PickingResult {
    pub position: Point,
    pub picked: Vec<ElementId>,
}

impl PickingResult {
    pub fn top(&self) -> Option<ElementId> {
        self.picked.first().copied()
    }
}

/// Resolves a canvas point to a target element.
pub trait Picker {
    /// Topmost element under `position`, ignoring `exclude` and everything
    /// below it.
    fn pick(&self, scene: &Scene, position: Point, exclude: Option<ElementId>) -> Option<ElementId>;
}

/// Geometry picking with no plugin involvement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScenePicker;

impl Picker for ScenePicker {
    fn pick(&self, scene: &Scene, position: Point, exclude: Option<ElementId>) -> Option<ElementId> {
        pick_at(scene, position, false, exclude).top()
    }
}

/// Hit-test every connected element at `position`. With `all` unset the
/// search stops at the first hit.
pub fn pick_at(scene: &Scene, position: Point, all: bool, exclude: Option<ElementId>) -> PickingResult {
    let mut picked = Vec::new();
    for id in scene.paint_order().into_iter().rev() {
        if exclude.is_some_and(|ex| scene.contains_node(ex, id)) {
            continue;
        }
        if hit(scene, id, position) {
            picked.push(id);
            if !all {
                break;
            }
        }
    }
    PickingResult { position, picked }
}

/// Whether `position` (canvas space) lands on `id`.
pub fn hit(scene: &Scene, id: ElementId, position: Point) -> bool {
    let Some(el) = scene.get(id) else {
        return false;
    };
    if el.kind() == ShapeKind::Group || !el.is_connected() {
        return false;
    }
    let style = scene.style_of(id);
    let targets = pointer_targets(&style, el.kind(), scene.is_visible(id));
    if targets.is_empty() {
        return false;
    }
    let Some(inverse) = scene.get_world_transform(id).and_then(|m| m.inverse()) else {
        return false;
    };
    let (x, y) = inverse.transform_point(position.x, position.y);

    let half_width = (style.px("lineWidth") + style.px("increasedLineWidthForHitTesting")) / 2.0;
    let geometry = scene.get_geometry_bounds(id);
    if let Some(bounds) = geometry {
        if !bounds.expand(half_width).contains_point(x, y) {
            return false;
        }
    }
    let input = HitInput {
        style: &style,
        geometry,
        targets,
        half_width,
    };
    (el.kind().spec().contains)(&input, x, y)
}

/// The painted parts of an element that respond to the pointer.
pub fn pointer_targets(style: &dyn StyleSource, kind: ShapeKind, visible: bool) -> PointerTargets {
    let box_pickable = kind.spec().box_pickable;
    let painted = |name: &str| {
        style
            .computed(name)
            .and_then(|v| v.as_paint().map(|p| !p.is_none()))
            .unwrap_or(false)
    };
    let mut painted_parts = PointerTargets::empty();
    if painted("fill") || box_pickable {
        painted_parts |= PointerTargets::FILL;
    }
    if painted("stroke") {
        painted_parts |= PointerTargets::STROKE;
    }
    let when_visible = |t: PointerTargets| if visible { t } else { PointerTargets::empty() };

    let mut targets = match style.keyword("pointerEvents").as_deref() {
        Some("none") => PointerTargets::empty(),
        Some("visible") => when_visible(PointerTargets::all()),
        Some("visibleFill") => when_visible(PointerTargets::FILL),
        Some("visibleStroke") => when_visible(PointerTargets::STROKE),
        Some("painted") => painted_parts,
        Some("fill") => PointerTargets::FILL,
        Some("stroke") => PointerTargets::STROKE,
        Some("all") => PointerTargets::all(),
        // auto, visiblePainted
        _ => when_visible(painted_parts),
    };
    if box_pickable && !targets.is_empty() {
        targets |= PointerTargets::FILL;
    }
    targets
}
