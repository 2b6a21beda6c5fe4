//! The scene document: element storage, tree mutation and queries.
//!
//! A [`Scene`] owns every element, including detached ones. Elements are
//! addressed by [`ElementId`] and become part of the rendered document once
//! they are appended (directly or transitively) under the document element.

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::error::TreeError;
use crate::events::dispatch::dispatch_along_path;
use crate::events::event::{names, FederatedEvent};
use crate::events::listener::{ListenerId, ListenerOptions};
use crate::style::{ApproximateTextMeasurer, CacheCell, DirtyFlags, StyleValue, TextMeasurer};

use super::element::Element;
use super::mutation::{MutationCallback, MutationObserverInit, MutationObservers, MutationRecord, ObserverId};
use super::selector::Selector;
use super::shape::ShapeKind;
use super::tree::{Children, ElementId, Tree};

/// Connection changes the rendering service has not seen yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Mounted(ElementId),
    Unmounted(ElementId),
}

pub struct Scene {
    pub(crate) tree: Tree<Element>,
    document_element: ElementId,
    pub(crate) observers: MutationObservers,
    /// Elements whose appearance changed since the last frame
    pub(crate) render_dirty: FxHashSet<ElementId>,
    pub(crate) lifecycle: Vec<Lifecycle>,
    pub(crate) order_dirty: bool,
    pub(crate) paint_order: RefCell<CacheCell<Vec<ElementId>>>,
    pub(crate) measurer: Box<dyn TextMeasurer>,
    pub(crate) viewport: (f32, f32),
}

impl Scene {
    /// An empty scene with the given viewport size and the approximate text measurer.
    pub fn new(width: f32, height: f32) -> Self {
        Self::with_measurer(width, height, Box::new(ApproximateTextMeasurer))
    }

    /// An empty scene that measures text with `measurer`.
    pub fn with_measurer(width: f32, height: f32, measurer: Box<dyn TextMeasurer>) -> Self {
        let mut tree = Tree::new();
        let mut root = Element::new(ShapeKind::Group);
        root.connected = true;
        let document_element = tree.insert(root);

        let mut scene = Self {
            tree,
            document_element,
            observers: MutationObservers::default(),
            render_dirty: FxHashSet::default(),
            lifecycle: Vec::new(),
            order_dirty: true,
            paint_order: RefCell::new(CacheCell::Uncomputed),
            measurer,
            viewport: (width, height),
        };
        for (name, value) in [("fontSize", "16px"), ("fontFamily", "sans-serif")] {
            scene.store_style(document_element, name, StyleValue::from(value));
        }
        scene
    }

    /// The root every rendered element descends from. It cannot be removed,
    /// reparented or destroyed.
    pub fn document_element(&self) -> ElementId {
        self.document_element
    }

    /// Width and height percentages resolve against.
    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    /// Change the size percentages resolve against.
    pub fn set_viewport(&mut self, width: f32, height: f32) {
        if self.viewport == (width, height) {
            return;
        }
        self.viewport = (width, height);
        // also re-resolves `transform` and `transformOrigin` percentages
        for id in self.tree.ids() {
            self.apply_flags(id, DirtyFlags::GEOMETRY | DirtyFlags::BOUNDS);
        }
    }

    /// Swap the text measurer and re-measure every text element.
    pub fn set_text_measurer(&mut self, measurer: Box<dyn TextMeasurer>) {
        self.measurer = measurer;
        for id in self.tree.ids() {
            if self.kind(id) == Some(ShapeKind::Text) {
                self.apply_flags(id, DirtyFlags::GEOMETRY | DirtyFlags::BOUNDS | DirtyFlags::PAINT);
            }
        }
    }

    /// Create a detached element of `kind`.
    pub fn create_element(&mut self, kind: ShapeKind) -> ElementId {
        self.tree.insert(Element::new(kind))
    }

    /// Create an element and set its initial styles. No mutation records are
    /// produced since nothing can observe the new element yet.
    pub fn create_element_with<K, V>(&mut self, kind: ShapeKind, styles: impl IntoIterator<Item = (K, V)>) -> ElementId
    where
        K: AsRef<str>,
        V: Into<StyleValue>,
    {
        let id = self.create_element(kind);
        for (name, value) in styles {
            self.store_style(id, name.as_ref(), value.into());
        }
        id
    }

    /// The element record, or `None` for a stale id.
    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.tree.get(id)
    }

    /// Whether `id` still refers to a live element, attached or not.
    pub fn contains(&self, id: ElementId) -> bool {
        self.tree.contains(id)
    }

    /// Number of live elements, the document element included.
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    /// Whether the scene holds no elements at all.
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// The shape kind of `id`.
    pub fn kind(&self, id: ElementId) -> Option<ShapeKind> {
        self.tree.get(id).map(|el| el.kind)
    }

    /// Whether `id` descends from the document element.
    pub fn is_connected(&self, id: ElementId) -> bool {
        self.tree.get(id).is_some_and(|el| el.connected)
    }

    pub(crate) fn element(&self, id: ElementId) -> Result<&Element, TreeError> {
        self.tree.get(id).ok_or(TreeError::StaleElement(id))
    }

    pub(crate) fn element_mut(&mut self, id: ElementId) -> Result<&mut Element, TreeError> {
        self.tree.get_mut(id).ok_or(TreeError::StaleElement(id))
    }

    // Hierarchy

    /// Parent of `id`, if attached.
    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.tree.parent(id)
    }

    /// Children of `id` in tree order.
    pub fn children(&self, id: ElementId) -> Children<'_, Element> {
        self.tree.children(id)
    }

    /// First child of `id`.
    pub fn first_child(&self, id: ElementId) -> Option<ElementId> {
        self.tree.first_child(id)
    }

    /// Last child of `id`.
    pub fn last_child(&self, id: ElementId) -> Option<ElementId> {
        self.tree.last_child(id)
    }

    /// Sibling after `id`.
    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        self.tree.next_sibling(id)
    }

    /// Sibling before `id`.
    pub fn prev_sibling(&self, id: ElementId) -> Option<ElementId> {
        self.tree.prev_sibling(id)
    }

    /// Number of direct children of `id`.
    pub fn child_count(&self, id: ElementId) -> usize {
        self.tree.num_children(id)
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: ElementId) -> Vec<ElementId> {
        self.tree.ancestors(id).collect()
    }

    /// `id` and everything below it, pre-order.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        self.tree.descendants(id)
    }

    /// Whether `node` is `ancestor` or one of its descendants.
    pub fn contains_node(&self, ancestor: ElementId, node: ElementId) -> bool {
        self.tree.is_inclusive_ancestor(ancestor, node)
    }

    // Mutation

    /// Insert `child` as the last child of `parent`, detaching it from its old parent first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` under `parent` before `reference`, or last when
    /// `reference` is `None`. A child that already has a parent is moved.
    pub fn insert_before(
        &mut self,
        parent: ElementId,
        child: ElementId,
        reference: Option<ElementId>,
    ) -> Result<(), TreeError> {
        if child == self.document_element {
            return Err(TreeError::DocumentElement);
        }
        self.tree.check_insert(parent, child, reference)?;
        if reference == Some(child) {
            return Ok(());
        }

        if let Some(old_parent) = self.tree.parent(child) {
            self.detach_child(old_parent, child);
        }
        self.tree.insert_before(parent, child, reference)?;

        let record = MutationRecord::child_list(
            parent,
            vec![child],
            Vec::new(),
            self.tree.prev_sibling(child),
            self.tree.next_sibling(child),
        );
        self.queue_mutation(record);

        self.invalidate_reparented(child);
        self.invalidate_bounds_upward(parent);
        self.mark_order_dirty();

        let mut inserted = FederatedEvent::new(names::INSERTED, true);
        inserted.related_target = Some(parent);
        dispatch_along_path(self, child, &mut inserted);

        if self.is_connected(parent) {
            self.connect_subtree(child);
        }
        Ok(())
    }

    /// Detach `child` from `parent`. The element stays alive and can be reattached.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        if self.tree.parent(child) != Some(parent) {
            return Err(TreeError::NotChild);
        }
        self.detach_child(parent, child);
        Ok(())
    }

    /// Replace `old` (a child of `parent`) with `new`. Returns `old`.
    pub fn replace_child(
        &mut self,
        parent: ElementId,
        new: ElementId,
        old: ElementId,
    ) -> Result<ElementId, TreeError> {
        if self.tree.parent(old) != Some(parent) {
            return Err(TreeError::NotChild);
        }
        if new == old {
            return Ok(old);
        }
        self.tree.check_insert(parent, new, Some(old))?;
        self.insert_before(parent, new, Some(old))?;
        self.remove_child(parent, old)?;
        Ok(old)
    }

    /// Detach `id` from its parent, if it has one.
    pub fn remove(&mut self, id: ElementId) -> Result<(), TreeError> {
        if id == self.document_element {
            return Err(TreeError::DocumentElement);
        }
        match self.tree.parent(id) {
            Some(parent) => self.remove_child(parent, id),
            None if self.tree.contains(id) => Ok(()),
            None => Err(TreeError::StaleElement(id)),
        }
    }

    /// Detach every child of `parent`.
    pub fn remove_all_children(&mut self, parent: ElementId) -> Result<(), TreeError> {
        let children: Vec<_> = self.tree.children(parent).collect();
        for child in children {
            self.remove_child(parent, child)?;
        }
        Ok(())
    }

    /// Destroy `id` and its whole subtree. Every destroyed element receives
    /// a `destroy` event first; afterwards their ids are stale.
    pub fn destroy(&mut self, id: ElementId) -> Result<(), TreeError> {
        if id == self.document_element {
            return Err(TreeError::DocumentElement);
        }
        if !self.tree.contains(id) {
            return Err(TreeError::StaleElement(id));
        }
        for node in self.tree.descendants(id) {
            dispatch_along_path(self, node, &mut FederatedEvent::new(names::DESTROY, false));
        }
        self.remove(id)?;

        let doomed = self.tree.descendants(id);
        for &node in doomed.iter().rev() {
            self.observers.forget_target(node);
            self.render_dirty.remove(&node);
            self.tree.remove(node);
        }
        log::debug!("Destroyed {} element(s) under {:?}", doomed.len(), id);
        Ok(())
    }

    /// Copy `id` into a new detached element. Styles, attributes, identity
    /// and local transform are copied; listeners are not.
    pub fn clone_node(&mut self, id: ElementId, deep: bool) -> Result<ElementId, TreeError> {
        let source = self.element(id)?;
        let mut copy = Element::new(source.kind);
        copy.id = source.id.clone();
        copy.name = source.name.clone();
        copy.class_list = source.class_list.clone();
        copy.attributes = source.attributes.clone();
        copy.style = source.style.clone();
        copy.parsed = source.parsed.clone();
        copy.transform = source.transform.clone_local();
        let clone = self.tree.insert(copy);

        if deep {
            let children: Vec<_> = self.tree.children(id).collect();
            for child in children {
                let child_clone = self.clone_node(child, true)?;
                self.tree.append_child(clone, child_clone)?;
            }
        }
        Ok(clone)
    }

    fn detach_child(&mut self, parent: ElementId, child: ElementId) {
        let mut removed = FederatedEvent::new(names::REMOVED, true);
        removed.related_target = Some(parent);
        dispatch_along_path(self, child, &mut removed);

        if self.is_connected(child) {
            self.disconnect_subtree(child);
        }
        let (prev, next) = (self.tree.prev_sibling(child), self.tree.next_sibling(child));
        self.invalidate_bounds_upward(parent);
        self.tree.detach(child);
        self.invalidate_reparented(child);
        self.mark_order_dirty();
        self.queue_mutation(MutationRecord::child_list(parent, Vec::new(), vec![child], prev, next));
    }

    fn connect_subtree(&mut self, root: ElementId) {
        let nodes = self.tree.descendants(root);
        for &node in &nodes {
            if let Some(el) = self.tree.get_mut(node) {
                el.connected = true;
            }
            self.lifecycle.push(Lifecycle::Mounted(node));
            self.render_dirty.insert(node);
        }
        for node in nodes {
            dispatch_along_path(self, node, &mut FederatedEvent::new(names::MOUNTED, false));
        }
    }

    fn disconnect_subtree(&mut self, root: ElementId) {
        let nodes = self.tree.descendants(root);
        for &node in &nodes {
            dispatch_along_path(self, node, &mut FederatedEvent::new(names::UNMOUNTED, false));
        }
        for node in nodes {
            if let Some(el) = self.tree.get_mut(node) {
                el.connected = false;
            }
            self.render_dirty.remove(&node);
            self.lifecycle.push(Lifecycle::Unmounted(node));
        }
    }

    /// A moved subtree sees a new parent matrix and new inherited values.
    fn invalidate_reparented(&self, root: ElementId) {
        for node in self.tree.descendants(root) {
            if let Some(el) = self.tree.get(node) {
                el.transform.mark_world_dirty();
                el.clear_computed();
                el.invalidate_geometry();
                el.invalidate_bounds();
                el.mark_dirty(DirtyFlags::all());
            }
        }
    }

    // Identity and attributes

    /// Set or clear the `#id` used by selectors.
    pub fn set_id(&mut self, id: ElementId, value: Option<&str>) -> Result<(), TreeError> {
        let old = std::mem::replace(&mut self.element_mut(id)?.id, value.map(str::to_string));
        self.queue_mutation(MutationRecord::attribute(id, "id", old.map(StyleValue::from)));
        Ok(())
    }

    /// Set or clear the name used for delegated `name:type` listeners.
    pub fn set_name(&mut self, id: ElementId, value: Option<&str>) -> Result<(), TreeError> {
        let old = std::mem::replace(&mut self.element_mut(id)?.name, value.map(str::to_string));
        self.queue_mutation(MutationRecord::attribute(id, "name", old.map(StyleValue::from)));
        Ok(())
    }

    /// Add `class` to the class list. Adding a present class records nothing.
    pub fn add_class(&mut self, id: ElementId, class: &str) -> Result<(), TreeError> {
        let el = self.element(id)?;
        if el.has_class(class) {
            return Ok(());
        }
        let mut classes = el.class_list.clone();
        classes.push(class.to_string());
        self.set_class_list(id, classes)
    }

    /// Remove `class` from the class list.
    pub fn remove_class(&mut self, id: ElementId, class: &str) -> Result<(), TreeError> {
        let el = self.element(id)?;
        if !el.has_class(class) {
            return Ok(());
        }
        let classes = el.class_list.iter().filter(|c| *c != class).cloned().collect();
        self.set_class_list(id, classes)
    }

    fn set_class_list(&mut self, id: ElementId, classes: Vec<String>) -> Result<(), TreeError> {
        let el = self.element_mut(id)?;
        let old = el.attribute_string("class");
        el.class_list = classes;
        self.queue_mutation(MutationRecord::attribute(id, "class", old.map(StyleValue::from)));
        Ok(())
    }

    /// Set an attribute. `id`, `name` and `class` update the element's
    /// identity, registered style properties go through the style pipeline
    /// and anything else is stored as a plain attribute.
    pub fn set_attribute(&mut self, id: ElementId, name: &str, value: impl Into<StyleValue>) -> Result<(), TreeError> {
        let value = value.into();
        let text = match &value {
            StyleValue::Null => None,
            other => Some(super::element::value_to_string(other)),
        };
        match name {
            "id" => self.set_id(id, text.as_deref()),
            "name" => self.set_name(id, text.as_deref()),
            "class" => {
                let classes = text
                    .as_deref()
                    .unwrap_or_default()
                    .split_whitespace()
                    .map(str::to_string)
                    .collect();
                self.set_class_list(id, classes)
            }
            _ if crate::style::property(name).is_some() => self.set_style(id, name, value),
            _ => {
                let el = self.element_mut(id)?;
                let old = match value {
                    StyleValue::Null => el.attributes.remove(name),
                    value => {
                        if el.attributes.get(name) == Some(&value) {
                            return Ok(());
                        }
                        el.attributes.insert(name.to_string(), value)
                    }
                };
                self.queue_mutation(MutationRecord::attribute(id, name, old));
                Ok(())
            }
        }
    }

    /// Attribute value, falling back to the raw style of the same name.
    pub fn get_attribute(&self, id: ElementId, name: &str) -> Option<StyleValue> {
        let el = self.tree.get(id)?;
        match name {
            "id" | "name" | "class" => el.attribute_string(name).map(StyleValue::from),
            _ => el.style.get(name).or_else(|| el.attributes.get(name)).cloned(),
        }
    }

    /// Remove an attribute; same as setting it to `StyleValue::Null`.
    pub fn remove_attribute(&mut self, id: ElementId, name: &str) -> Result<(), TreeError> {
        self.set_attribute(id, name, StyleValue::Null)
    }

    // Queries

    /// First element below `root` (excluding `root`) matching `predicate`,
    /// depth first.
    pub fn find(&self, root: ElementId, predicate: impl Fn(&Element) -> bool) -> Option<ElementId> {
        self.tree
            .descendants(root)
            .into_iter()
            .skip(1)
            .find(|id| self.tree.get(*id).is_some_and(&predicate))
    }

    /// Every element below `root` (excluding `root`) matching `predicate`, depth first.
    pub fn find_all(&self, root: ElementId, predicate: impl Fn(&Element) -> bool) -> Vec<ElementId> {
        self.tree
            .descendants(root)
            .into_iter()
            .skip(1)
            .filter(|id| self.tree.get(*id).is_some_and(&predicate))
            .collect()
    }

    /// First element below `root` matching `selector`. An unparsable selector matches nothing.
    pub fn query_selector(&self, root: ElementId, selector: &str) -> Option<ElementId> {
        let selector = Selector::parse(selector)?;
        self.find(root, |el| selector.matches(el))
    }

    /// Every element below `root` matching `selector`.
    pub fn query_selector_all(&self, root: ElementId, selector: &str) -> Vec<ElementId> {
        match Selector::parse(selector) {
            Some(selector) => self.find_all(root, |el| selector.matches(el)),
            None => Vec::new(),
        }
    }

    /// First connected element with the given `#id`.
    pub fn get_element_by_id(&self, id: &str) -> Option<ElementId> {
        self.find(self.document_element, |el| el.id() == Some(id))
    }

    /// Connected elements carrying `class`.
    pub fn get_elements_by_class_name(&self, class: &str) -> Vec<ElementId> {
        self.find_all(self.document_element, |el| el.has_class(class))
    }

    /// Connected elements whose tag matches, ignoring case.
    pub fn get_elements_by_tag_name(&self, tag: &str) -> Vec<ElementId> {
        let tag = tag.to_ascii_lowercase();
        self.find_all(self.document_element, |el| el.node_name() == tag)
    }

    // Listeners

    /// Register `listener` for `event_type` on `id`.
    pub fn add_event_listener(
        &mut self,
        id: ElementId,
        event_type: &str,
        listener: impl Fn(&mut FederatedEvent) + 'static,
        options: ListenerOptions,
    ) -> Result<ListenerId, TreeError> {
        let el = self.element_mut(id)?;
        Ok(el.listeners.add(event_type, Rc::new(listener), options))
    }

    /// Remove one listener. Returns whether it was registered.
    pub fn remove_event_listener(&mut self, id: ElementId, listener: ListenerId) -> bool {
        self.tree
            .get_mut(id)
            .is_some_and(|el| el.listeners.remove(listener))
    }

    /// Remove every listener for `event_type`, or all listeners when `None`.
    pub fn remove_all_event_listeners(&mut self, id: ElementId, event_type: Option<&str>) {
        if let Some(el) = self.tree.get_mut(id) {
            match event_type {
                Some(t) => el.listeners.remove_type(t),
                None => el.listeners.clear(),
            }
        }
    }

    /// Whether `id` has any listener for `event_type`.
    pub fn has_event_listener(&self, id: ElementId, event_type: &str) -> bool {
        self.tree.get(id).is_some_and(|el| el.listeners.has(event_type))
    }

    /// Dispatch `event` at `id`. See [`crate::events::dispatch::dispatch_event`].
    pub fn dispatch_event(&mut self, id: ElementId, event: &mut FederatedEvent) -> bool {
        crate::events::dispatch::dispatch_event(self, id, event)
    }

    // Mutation observers

    /// Register a callback that receives batched mutation records.
    pub fn create_mutation_observer(&mut self, callback: impl Fn(&[MutationRecord]) + 'static) -> ObserverId {
        let callback: MutationCallback = Rc::new(callback);
        self.observers.create(callback)
    }

    /// Start watching `target` with the given options.
    pub fn observe(&mut self, observer: ObserverId, target: ElementId, init: MutationObserverInit) -> Result<(), TreeError> {
        if !self.tree.contains(target) {
            return Err(TreeError::StaleElement(target));
        }
        self.observers.observe(observer, target, init);
        Ok(())
    }

    /// Stop an observer and drop its queued records.
    pub fn disconnect_observer(&mut self, observer: ObserverId) {
        self.observers.disconnect(observer);
    }

    /// Drain the records queued for `observer` without calling it.
    pub fn take_records(&mut self, observer: ObserverId) -> Vec<MutationRecord> {
        self.observers.take_records(observer)
    }

    /// Deliver queued mutation records. The canvas calls this at the start
    /// of every frame.
    pub fn deliver_mutations(&mut self) -> usize {
        self.observers.deliver()
    }

    pub(crate) fn queue_mutation(&mut self, record: MutationRecord) {
        if !self.observers.is_observing() {
            return;
        }
        let ancestors: Vec<_> = self.tree.ancestors(record.target).collect();
        self.observers.queue(record, &ancestors);
    }

    // Frame bookkeeping

    pub(crate) fn take_lifecycle(&mut self) -> Vec<Lifecycle> {
        std::mem::take(&mut self.lifecycle)
    }

    pub(crate) fn take_render_dirty(&mut self) -> Vec<ElementId> {
        let dirty: Vec<_> = self
            .render_dirty
            .drain()
            .filter(|id| self.tree.contains(*id))
            .collect();
        for id in &dirty {
            if let Some(el) = self.tree.get(*id) {
                el.dirty.set(DirtyFlags::empty());
            }
        }
        dirty
    }

    pub(crate) fn take_order_dirty(&mut self) -> bool {
        std::mem::take(&mut self.order_dirty)
    }

    /// Whether the next frame has anything to flush.
    pub fn has_pending_changes(&self) -> bool {
        !self.render_dirty.is_empty() || !self.lifecycle.is_empty() || self.order_dirty
    }
}
