//! The per-node record stored in the scene arena.

use std::cell::{Cell, RefCell};

use rustc_hash::FxHashMap;

use crate::events::listener::ListenerRegistry;
use crate::math::Aabb;
use crate::style::{CacheCell, DirtyFlags, ParsedValue, StyleValue};

use super::shape::ShapeKind;
use super::transform::Transform;

pub struct Element {
    pub(crate) kind: ShapeKind,
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) class_list: Vec<String>,
    /// Attributes that are not style properties
    pub(crate) attributes: FxHashMap<String, StyleValue>,
    /// Raw style values as set
    pub(crate) style: FxHashMap<String, StyleValue>,
    /// Parsed counterparts of `style`, possibly `Inherit`/`Initial` markers
    pub(crate) parsed: FxHashMap<String, ParsedValue>,
    /// Fully resolved values, keyword and inheritance lookups included
    pub(crate) computed: RefCell<FxHashMap<String, Option<ParsedValue>>>,
    pub(crate) transform: Transform,
    /// Local geometry bounds, no stroke
    pub(crate) geometry: RefCell<CacheCell<Option<Aabb>>>,
    /// World bounds of this element and its subtree, no stroke
    pub(crate) bounds: RefCell<CacheCell<Option<Aabb>>>,
    /// World bounds including stroke, shadow and filter outsets
    pub(crate) render_bounds: RefCell<CacheCell<Option<Aabb>>>,
    pub(crate) dirty: Cell<DirtyFlags>,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) connected: bool,
}

impl Element {
    pub(crate) fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            id: None,
            name: None,
            class_list: Vec::new(),
            attributes: FxHashMap::default(),
            style: FxHashMap::default(),
            parsed: FxHashMap::default(),
            computed: RefCell::new(FxHashMap::default()),
            transform: Transform::new(),
            geometry: RefCell::new(CacheCell::Uncomputed),
            bounds: RefCell::new(CacheCell::Uncomputed),
            render_bounds: RefCell::new(CacheCell::Uncomputed),
            dirty: Cell::new(DirtyFlags::all()),
            listeners: ListenerRegistry::default(),
            connected: false,
        }
    }

    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    pub fn node_name(&self) -> &'static str {
        self.kind.tag()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn class_list(&self) -> &[String] {
        &self.class_list
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.class_list.iter().any(|c| c == class)
    }

    /// Raw value of a style property set directly on this element.
    pub fn style(&self, name: &str) -> Option<&StyleValue> {
        self.style.get(name)
    }

    pub fn style_names(&self) -> impl Iterator<Item = &str> {
        self.style.keys().map(String::as_str)
    }

    /// Attribute value as a string, covering `id`, `name`, `class`, style
    /// properties and free attributes.
    pub fn attribute_string(&self, name: &str) -> Option<String> {
        match name {
            "id" => self.id.clone(),
            "name" => self.name.clone(),
            "class" => (!self.class_list.is_empty()).then(|| self.class_list.join(" ")),
            _ => self
                .style
                .get(name)
                .or_else(|| self.attributes.get(name))
                .map(value_to_string),
        }
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn dirty(&self) -> DirtyFlags {
        self.dirty.get()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub(crate) fn mark_dirty(&self, flags: DirtyFlags) {
        self.dirty.set(self.dirty.get() | flags);
    }

    pub(crate) fn clear_computed(&self) {
        self.computed.borrow_mut().clear();
    }

    pub(crate) fn forget_computed(&self, name: &str) {
        self.computed.borrow_mut().remove(name);
    }

    pub(crate) fn invalidate_geometry(&self) {
        self.geometry.borrow_mut().invalidate();
    }

    pub(crate) fn invalidate_bounds(&self) {
        self.bounds.borrow_mut().invalidate();
        self.render_bounds.borrow_mut().invalidate();
    }
}

pub(crate) fn value_to_string(value: &StyleValue) -> String {
    match value {
        StyleValue::Null => String::new(),
        StyleValue::Number(n) => n.to_string(),
        StyleValue::Str(s) => s.clone(),
        StyleValue::Bool(b) => b.to_string(),
        StyleValue::Points(points) => points
            .iter()
            .map(|(x, y)| format!("{},{}", x, y))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_string() {
        let mut el = Element::new(ShapeKind::Circle);
        el.id = Some("c".into());
        el.class_list = vec!["a".into(), "b".into()];
        el.style.insert("r".into(), 10.into());
        el.attributes.insert("data-kind".into(), "round".into());

        assert_eq!(el.attribute_string("id").as_deref(), Some("c"));
        assert_eq!(el.attribute_string("class").as_deref(), Some("a b"));
        assert_eq!(el.attribute_string("r").as_deref(), Some("10"));
        assert_eq!(el.attribute_string("data-kind").as_deref(), Some("round"));
        assert_eq!(el.attribute_string("missing"), None);
        assert!(el.has_class("b"));
        assert_eq!(el.node_name(), "circle");
    }
}
