//! Style resolution, transforms and bounds on the scene.
//!
//! Writing a style runs the invalidation chain: the parsed value is replaced,
//! cached computed values are forgotten (in inheriting descendants too), and
//! the property's [`DirtyFlags`] decide which geometry, bounds, transform and
//! paint state goes stale. Reads recompute lazily.

use crate::error::TreeError;
use crate::math::{Aabb, Mat4, Point, Rect, Vec3};
use crate::style::registry::initial_value;
use crate::style::transform::compose_transform;
use crate::style::{affects, cached, is_inherited, parse_style, property, DirtyFlags, LengthContext, ParsedValue, StyleValue};

use super::document::Scene;
use super::mutation::MutationRecord;
use super::shape::{GeometryInput, StyleSource};
use super::transform::Transform;
use super::tree::ElementId;

const DEFAULT_FONT_SIZE: f32 = 16.0;

/// Computed style of one element, as seen by shape functions.
pub struct ElementStyle<'a> {
    scene: &'a Scene,
    id: ElementId,
}

impl StyleSource for ElementStyle<'_> {
    fn computed(&self, name: &str) -> Option<ParsedValue> {
        self.scene.get_computed_style(self.id, name)
    }

    fn length_context(&self) -> LengthContext {
        self.scene.length_context(self.id)
    }

    fn px(&self, name: &str) -> f32 {
        if name == "fontSize" {
            return self.scene.font_size_px(self.id);
        }
        self.computed(name)
            .and_then(|v| v.as_length())
            .map(|l| l.to_px(&self.length_context()))
            .unwrap_or(0.0)
    }
}

impl Scene {
    /// Style accessor resolving computed values for `id`.
    pub fn style_of(&self, id: ElementId) -> ElementStyle<'_> {
        ElementStyle { scene: self, id }
    }

    // Writes

    /// Set one style property. `StyleValue::Null` removes it.
    pub fn set_style(&mut self, id: ElementId, name: &str, value: impl Into<StyleValue>) -> Result<(), TreeError> {
        self.element(id)?;
        if let Some(old) = self.store_style(id, name, value.into()) {
            self.queue_mutation(MutationRecord::attribute(id, name, old));
        }
        Ok(())
    }

    /// Set several style properties in order.
    pub fn set_styles<K, V>(&mut self, id: ElementId, styles: impl IntoIterator<Item = (K, V)>) -> Result<(), TreeError>
    where
        K: AsRef<str>,
        V: Into<StyleValue>,
    {
        for (name, value) in styles {
            self.set_style(id, name.as_ref(), value)?;
        }
        Ok(())
    }

    /// Remove a style property so the default or inherited value applies.
    pub fn remove_style(&mut self, id: ElementId, name: &str) -> Result<(), TreeError> {
        self.set_style(id, name, StyleValue::Null)
    }

    /// The raw value set on the element itself.
    pub fn get_style(&self, id: ElementId, name: &str) -> Option<&StyleValue> {
        self.tree.get(id)?.style.get(name)
    }

    /// Store and parse `raw`, then invalidate what depends on it. Returns the
    /// previous raw value, or `None` when nothing changed.
    pub(crate) fn store_style(&mut self, id: ElementId, name: &str, raw: StyleValue) -> Option<Option<StyleValue>> {
        let el = self.tree.get_mut(id)?;
        let old = match raw {
            StyleValue::Null => {
                let old = el.style.remove(name)?;
                el.parsed.remove(name);
                Some(old)
            }
            raw => {
                if el.style.get(name) == Some(&raw) {
                    return None;
                }
                el.parsed.insert(name.to_string(), parse_style(name, &raw));
                el.style.insert(name.to_string(), raw)
            }
        };
        self.style_changed(id, name);
        Some(old)
    }

    fn style_changed(&mut self, id: ElementId, name: &str) {
        if let Some(el) = self.tree.get(id) {
            el.forget_computed(name);
        }
        if matches!(name, "transform" | "transformOrigin") {
            self.sync_style_transform(id);
        }

        let flags = affects(name);
        let inherited = is_inherited(name);
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(el) = self.tree.get(node) else {
                continue;
            };
            if node != id {
                let inherits = match el.parsed.get(name) {
                    Some(ParsedValue::Inherit) => true,
                    Some(_) => name == "fontSize",
                    None => inherited,
                };
                if !inherits {
                    continue;
                }
            }
            el.forget_computed(name);
            stack.extend(self.tree.children(node));
            self.apply_flags(node, flags);
        }
    }

    pub(crate) fn apply_flags(&mut self, id: ElementId, flags: DirtyFlags) {
        let Some(el) = self.tree.get(id) else {
            return;
        };
        el.mark_dirty(flags);
        let connected = el.connected;
        let follows_geometry = el.parsed.contains_key("transform") || el.parsed.contains_key("transformOrigin");

        if flags.contains(DirtyFlags::GEOMETRY) {
            el.invalidate_geometry();
            if follows_geometry {
                self.sync_style_transform(id);
                self.transform_changed(id);
            }
        }
        if flags.contains(DirtyFlags::TRANSFORM) {
            self.transform_changed(id);
        }
        if flags.intersects(DirtyFlags::GEOMETRY | DirtyFlags::BOUNDS) {
            self.invalidate_bounds_upward(id);
        }
        if flags.contains(DirtyFlags::ORDER) {
            self.mark_order_dirty();
        }
        if connected && !flags.is_empty() {
            self.render_dirty.insert(id);
        }
    }

    /// Feed the `transform` and `transformOrigin` styles into the element's
    /// transform component. Percentages resolve against the geometry bounds.
    fn sync_style_transform(&mut self, id: ElementId) {
        let geometry = self
            .get_geometry_bounds(id)
            .map(|b| b.to_rect())
            .unwrap_or_else(|| Rect::new(0.0, 0.0, 0.0, 0.0));
        let matrix = match self.get_computed_style(id, "transform") {
            Some(ParsedValue::Transform(functions)) => {
                compose_transform(&functions, (geometry.width, geometry.height))
            }
            _ => Mat4::IDENTITY,
        };
        let origin = self
            .get_computed_style(id, "transformOrigin")
            .and_then(|v| v.as_origin())
            .map(|o| o.resolve(geometry));

        let Some(el) = self.tree.get_mut(id) else {
            return;
        };
        el.transform.set_style_matrix(matrix);
        if let Some((x, y)) = origin {
            el.transform.set_origin(Vec3::xy(x, y));
        }
    }

    pub(crate) fn mark_order_dirty(&mut self) {
        self.order_dirty = true;
        self.paint_order.borrow_mut().invalidate();
    }

    // Reads

    /// The resolved value of `name` on `id`.
    ///
    /// An explicit value wins. Otherwise inherited properties come from the
    /// nearest ancestor that sets them, then the shape's default, then the
    /// document element, then the registry's initial value. Properties the
    /// registry does not know only resolve to explicit values.
    pub fn get_computed_style(&self, id: ElementId, name: &str) -> Option<ParsedValue> {
        let el = self.tree.get(id)?;
        if let Some(hit) = el.computed.borrow().get(name) {
            return hit.clone();
        }
        let value = self.resolve_style(id, name);
        el.computed.borrow_mut().insert(name.to_string(), value.clone());
        value
    }

    fn resolve_style(&self, id: ElementId, name: &str) -> Option<ParsedValue> {
        let el = self.tree.get(id)?;
        let def = property(name);
        match el.parsed.get(name) {
            Some(ParsedValue::Inherit) => {
                return match self.tree.parent(id) {
                    Some(parent) => self.get_computed_style(parent, name),
                    None => def.and_then(initial_value),
                };
            }
            Some(ParsedValue::Initial) => return def.and_then(initial_value),
            Some(value) => return Some(value.clone()),
            None => {}
        }
        let def = def?;

        if def.inherited {
            let from_ancestor = self
                .tree
                .ancestors(id)
                .filter(|a| *a != self.document_element())
                .find(|a| self.tree.get(*a).is_some_and(|el| el.parsed.contains_key(name)));
            if let Some(ancestor) = from_ancestor {
                return self.get_computed_style(ancestor, name);
            }
        }
        let shape_default = el
            .kind
            .spec()
            .defaults
            .iter()
            .find(|(prop, _)| *prop == name)
            .map(|(_, raw)| parse_style(name, &StyleValue::from(*raw)));
        if shape_default.is_some() {
            return shape_default;
        }
        if def.inherited && id != self.document_element() {
            let root = self.tree.get(self.document_element())?;
            if root.parsed.contains_key(name) {
                return self.get_computed_style(self.document_element(), name);
            }
        }
        initial_value(def)
    }

    /// Font size in pixels, with `em` and `%` resolved against the parent.
    pub fn font_size_px(&self, id: ElementId) -> f32 {
        let document = self.document_element();
        let inherited = match self.tree.parent(id) {
            Some(parent) => self.font_size_px(parent),
            None if id != document => self.font_size_px(document),
            None => DEFAULT_FONT_SIZE,
        };
        let root_font_size = if id == document {
            DEFAULT_FONT_SIZE
        } else {
            self.font_size_px(document)
        };
        match self.tree.get(id).and_then(|el| el.parsed.get("fontSize")) {
            None | Some(ParsedValue::Inherit) => inherited,
            Some(ParsedValue::Initial) => DEFAULT_FONT_SIZE,
            Some(value) => value
                .as_length()
                .map(|l| {
                    l.to_px(&LengthContext {
                        font_size: inherited,
                        root_font_size,
                        percent_base: inherited,
                    })
                })
                .unwrap_or(inherited),
        }
    }

    /// Font sizes and percentage base used to resolve lengths on `id`.
    pub fn length_context(&self, id: ElementId) -> LengthContext {
        LengthContext {
            font_size: self.font_size_px(id),
            root_font_size: self.font_size_px(self.document_element()),
            percent_base: self.viewport.0,
        }
    }

    /// `opacity` multiplied down from the root.
    pub fn effective_opacity(&self, id: ElementId) -> f32 {
        std::iter::once(id)
            .chain(self.tree.ancestors(id))
            .map(|node| self.style_of(node).number("opacity").unwrap_or(1.0).clamp(0.0, 1.0))
            .product()
    }

    /// Whether `visibility` is not `hidden`.
    pub fn is_visible(&self, id: ElementId) -> bool {
        self.style_of(id).keyword("visibility").as_deref() != Some("hidden")
    }

    /// Stacking order among siblings; `0` by default.
    pub fn z_index(&self, id: ElementId) -> f32 {
        self.style_of(id).number("zIndex").unwrap_or(0.0)
    }

    /// Connected elements in paint order: depth first, siblings sorted by
    /// `zIndex` with ties kept in tree order.
    pub fn paint_order(&self) -> Vec<ElementId> {
        cached(&self.paint_order, || {
            let mut out = Vec::with_capacity(self.tree.len());
            self.collect_paint_order(self.document_element(), &mut out);
            out
        })
    }

    fn collect_paint_order(&self, id: ElementId, out: &mut Vec<ElementId>) {
        out.push(id);
        let mut children: Vec<(f32, ElementId)> = self
            .tree
            .children(id)
            .map(|child| (self.z_index(child), child))
            .collect();
        children.sort_by(|a, b| a.0.total_cmp(&b.0));
        for (_, child) in children {
            self.collect_paint_order(child, out);
        }
    }

    // Transforms

    pub(crate) fn transform_changed(&mut self, id: ElementId) {
        self.mark_world_dirty(id);
        self.invalidate_bounds_upward(id);
        let Some(el) = self.tree.get(id) else {
            return;
        };
        el.mark_dirty(DirtyFlags::TRANSFORM | DirtyFlags::BOUNDS);
        if el.connected {
            // every descendant moved on screen along with `id`
            self.render_dirty.extend(self.tree.descendants(id));
        }
    }

    /// Mark `id` and its descendants world-dirty. A dirty node's descendants
    /// are already dirty, so the walk stops there.
    fn mark_world_dirty(&self, id: ElementId) {
        let mut stack = vec![id];
        while let Some(node) = stack.pop() {
            let Some(el) = self.tree.get(node) else {
                continue;
            };
            if node != id && el.transform.is_world_dirty() {
                continue;
            }
            el.transform.mark_world_dirty();
            el.invalidate_bounds();
            stack.extend(self.tree.children(node));
        }
    }

    pub(crate) fn invalidate_bounds_upward(&self, from: ElementId) {
        for node in std::iter::once(from).chain(self.tree.ancestors(from)) {
            if let Some(el) = self.tree.get(node) {
                el.invalidate_bounds();
            }
        }
    }

    fn update_transform(&mut self, id: ElementId, update: impl FnOnce(&mut Transform)) -> Result<(), TreeError> {
        update(&mut self.element_mut(id)?.transform);
        self.transform_changed(id);
        Ok(())
    }

    /// Matrix mapping local coordinates into the parent's space.
    pub fn get_local_transform(&self, id: ElementId) -> Option<Mat4> {
        Some(self.tree.get(id)?.transform.local_matrix())
    }

    /// Local-to-canvas matrix, bringing any stale ancestors up to date first.
    pub fn get_world_transform(&self, id: ElementId) -> Option<Mat4> {
        let el = self.tree.get(id)?;
        let mut chain: Vec<ElementId> = std::iter::once(id).chain(self.tree.ancestors(id)).collect();
        chain.reverse();
        let mut parent_world: Option<Mat4> = None;
        for node in chain {
            let Some(current) = self.tree.get(node) else {
                continue;
            };
            current.transform.update_world(parent_world.as_ref());
            parent_world = Some(current.transform.world_matrix());
        }
        Some(el.transform.world_matrix())
    }

    fn parent_world(&self, id: ElementId) -> Mat4 {
        self.tree
            .parent(id)
            .and_then(|p| self.get_world_transform(p))
            .unwrap_or(Mat4::IDENTITY)
    }

    /// Set the position in the parent's space.
    pub fn set_local_position(&mut self, id: ElementId, x: f32, y: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.set_position(Vec3::xy(x, y)))
    }

    /// Translate in the parent's space.
    pub fn translate_local(&mut self, id: ElementId, dx: f32, dy: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.set_position(t.position() + Vec3::xy(dx, dy)))
    }

    /// Position in the parent's space.
    pub fn get_local_position(&self, id: ElementId) -> Option<(f32, f32)> {
        let p = self.tree.get(id)?.transform.position();
        Some((p.x, p.y))
    }

    /// Move `id` so that its position lands on `(x, y)` in canvas space.
    pub fn set_position(&mut self, id: ElementId, x: f32, y: f32) -> Result<(), TreeError> {
        self.element(id)?;
        let (lx, ly) = match self.parent_world(id).inverse() {
            Some(inverse) => inverse.transform_point(x, y),
            None => (x, y),
        };
        self.set_local_position(id, lx, ly)
    }

    /// Position in canvas space.
    pub fn get_position(&self, id: ElementId) -> Option<(f32, f32)> {
        let p = self.tree.get(id)?.transform.position();
        Some(self.parent_world(id).transform_point(p.x, p.y))
    }

    /// Translate in canvas space.
    pub fn translate(&mut self, id: ElementId, dx: f32, dy: f32) -> Result<(), TreeError> {
        let (x, y) = self.get_position(id).ok_or(TreeError::StaleElement(id))?;
        self.set_position(id, x + dx, y + dy)
    }

    /// Set the rotation relative to the parent, in degrees.
    pub fn set_local_euler_angles(&mut self, id: ElementId, degrees: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.set_euler_angle(degrees))
    }

    /// Rotation relative to the parent, in degrees.
    pub fn get_local_euler_angles(&self, id: ElementId) -> Option<f32> {
        Some(self.tree.get(id)?.transform.euler_angle())
    }

    /// Set the rotation in canvas space, in degrees.
    pub fn set_euler_angles(&mut self, id: ElementId, degrees: f32) -> Result<(), TreeError> {
        self.element(id)?;
        let parent = self.parent_world(id).decompose_2d().rotation.to_degrees();
        self.set_local_euler_angles(id, degrees - parent)
    }

    /// Rotation in canvas space, in degrees.
    pub fn get_euler_angles(&self, id: ElementId) -> Option<f32> {
        Some(self.get_world_transform(id)?.decompose_2d().rotation.to_degrees())
    }

    /// Rotate further by `degrees` around the origin.
    pub fn rotate(&mut self, id: ElementId, degrees: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.rotate(degrees))
    }

    /// Set the scale relative to the parent.
    pub fn set_local_scale(&mut self, id: ElementId, sx: f32, sy: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.set_scale(Vec3::new(sx, sy, 1.0)))
    }

    /// Scale relative to the parent.
    pub fn get_local_scale(&self, id: ElementId) -> Option<(f32, f32)> {
        let s = self.tree.get(id)?.transform.scale();
        Some((s.x, s.y))
    }

    /// Set the scale in canvas space.
    pub fn set_scale(&mut self, id: ElementId, sx: f32, sy: f32) -> Result<(), TreeError> {
        self.element(id)?;
        let (px, py) = self.parent_world(id).decompose_2d().scale;
        let divide = |s: f32, p: f32| if p.abs() > f32::EPSILON { s / p } else { s };
        self.set_local_scale(id, divide(sx, px), divide(sy, py))
    }

    /// Scale in canvas space.
    pub fn get_scale(&self, id: ElementId) -> Option<(f32, f32)> {
        Some(self.get_world_transform(id)?.decompose_2d().scale)
    }

    /// Skew angles in radians.
    pub fn set_local_skew(&mut self, id: ElementId, skew_x: f32, skew_y: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.set_skew(skew_x, skew_y))
    }

    /// Pivot for rotation and scale, in local coordinates. A `transformOrigin`
    /// style overrides it whenever the geometry changes.
    pub fn set_origin(&mut self, id: ElementId, x: f32, y: f32) -> Result<(), TreeError> {
        self.update_transform(id, |t| t.set_origin(Vec3::xy(x, y)))
    }

    // Bounds

    /// Local bounds of the element's own geometry, without stroke.
    pub fn get_geometry_bounds(&self, id: ElementId) -> Option<Aabb> {
        let el = self.tree.get(id)?;
        cached(&el.geometry, || {
            let style = self.style_of(id);
            (el.kind.spec().geometry)(&GeometryInput {
                style: &style,
                measurer: self.measurer.as_ref(),
            })
        })
    }

    /// Canvas-space bounds of the element and its subtree, without stroke.
    pub fn get_bounds(&self, id: ElementId) -> Option<Aabb> {
        let el = self.tree.get(id)?;
        cached(&el.bounds, || {
            let world = self.get_world_transform(id)?;
            let own = self.get_geometry_bounds(id).map(|g| g.transform(&world));
            union_all(own, self.tree.children(id).filter_map(|c| self.get_bounds(c)))
        })
    }

    /// Like [`Scene::get_bounds`] but grown by stroke, shadow and filter
    /// outsets.
    pub fn get_render_bounds(&self, id: ElementId) -> Option<Aabb> {
        let el = self.tree.get(id)?;
        cached(&el.render_bounds, || {
            let world = self.get_world_transform(id)?;
            let outset = self.paint_outset(id);
            let own = self
                .get_geometry_bounds(id)
                .map(|g| g.expand(outset).transform(&world));
            union_all(own, self.tree.children(id).filter_map(|c| self.get_render_bounds(c)))
        })
    }

    fn paint_outset(&self, id: ElementId) -> f32 {
        let style = self.style_of(id);
        let painted = |name: &str| {
            style
                .computed(name)
                .and_then(|v| v.as_paint().map(|p| !p.is_none()))
                .unwrap_or(false)
        };
        let mut outset = 0.0;
        if painted("stroke") {
            outset += style.px("lineWidth") / 2.0;
        }
        if painted("shadowColor") {
            let offset = style.px("shadowOffsetX").abs().max(style.px("shadowOffsetY").abs());
            outset += style.number("shadowBlur").unwrap_or(0.0).max(0.0) + offset;
        }
        if let Some(ParsedValue::Filters(filters)) = style.computed("filter") {
            outset += filters.iter().map(|f| f.outset()).sum::<f32>();
        }
        outset
    }

    /// Outline length for shapes that have one, zero otherwise.
    pub fn get_total_length(&self, id: ElementId) -> f32 {
        let Some(el) = self.tree.get(id) else {
            return 0.0;
        };
        (el.kind.spec().outline)(&self.style_of(id))
            .map(|o| o.total_length())
            .unwrap_or(0.0)
    }

    /// Point on the outline at `length` along it, in local coordinates.
    pub fn get_point_at_length(&self, id: ElementId, length: f32) -> Option<Point> {
        let el = self.tree.get(id)?;
        (el.kind.spec().outline)(&self.style_of(id))?.point_at_length(length)
    }
}

fn union_all(first: Option<Aabb>, rest: impl Iterator<Item = Aabb>) -> Option<Aabb> {
    rest.fold(first, |acc, b| Some(acc.map_or(b, |a| a.union(&b))))
}
