//! Mutation observers.
//!
//! Records are queued as the scene changes and handed to callbacks in
//! batches by [`MutationObservers::deliver`], which the canvas calls at the
//! start of every frame. Callbacks never run inside the mutating call.

use std::rc::Rc;

use crate::style::StyleValue;

use super::tree::ElementId;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationObserverInit {
    pub attributes: bool,
    pub child_list: bool,
    /// Also observe every descendant of the target
    pub subtree: bool,
    /// Keep the previous value in attribute records
    pub attribute_old_value: bool,
    /// Only report these attribute names
    pub attribute_filter: Option<Vec<String>>,
}

impl MutationObserverInit {
    pub fn attributes() -> Self {
        Self {
            attributes: true,
            ..Self::default()
        }
    }

    pub fn child_list() -> Self {
        Self {
            child_list: true,
            ..Self::default()
        }
    }

    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    pub fn with_old_value(mut self) -> Self {
        self.attribute_old_value = true;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Attributes,
    ChildList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: ElementId,
    pub added_nodes: Vec<ElementId>,
    pub removed_nodes: Vec<ElementId>,
    pub previous_sibling: Option<ElementId>,
    pub next_sibling: Option<ElementId>,
    pub attribute_name: Option<String>,
    pub old_value: Option<StyleValue>,
}

impl MutationRecord {
    pub fn attribute(target: ElementId, name: &str, old_value: Option<StyleValue>) -> Self {
        Self {
            kind: MutationKind::Attributes,
            target,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            attribute_name: Some(name.to_string()),
            old_value,
        }
    }

    pub fn child_list(
        target: ElementId,
        added_nodes: Vec<ElementId>,
        removed_nodes: Vec<ElementId>,
        previous_sibling: Option<ElementId>,
        next_sibling: Option<ElementId>,
    ) -> Self {
        Self {
            kind: MutationKind::ChildList,
            target,
            added_nodes,
            removed_nodes,
            previous_sibling,
            next_sibling,
            attribute_name: None,
            old_value: None,
        }
    }
}

pub type MutationCallback = Rc<dyn Fn(&[MutationRecord])>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

struct Observer {
    id: ObserverId,
    callback: MutationCallback,
    targets: Vec<(ElementId, MutationObserverInit)>,
    pending: Vec<MutationRecord>,
}

impl Observer {
    fn interested(&self, record: &MutationRecord, ancestors: &[ElementId]) -> Option<bool> {
        self.targets.iter().find_map(|(target, init)| {
            let reaches = *target == record.target || (init.subtree && ancestors.contains(target));
            if !reaches {
                return None;
            }
            match record.kind {
                MutationKind::ChildList if init.child_list => Some(false),
                MutationKind::Attributes if init.attributes => {
                    let name = record.attribute_name.as_deref().unwrap_or_default();
                    let passes = init
                        .attribute_filter
                        .as_ref()
                        .map_or(true, |filter| filter.iter().any(|f| f == name));
                    passes.then_some(init.attribute_old_value)
                }
                _ => None,
            }
        })
    }
}

#[derive(Default)]
pub struct MutationObservers {
    observers: Vec<Observer>,
    next_id: u64,
}

impl MutationObservers {
    pub fn create(&mut self, callback: MutationCallback) -> ObserverId {
        self.next_id += 1;
        let id = ObserverId(self.next_id);
        self.observers.push(Observer {
            id,
            callback,
            targets: Vec::new(),
            pending: Vec::new(),
        });
        id
    }

    /// Start observing `target`; observing it again replaces the options.
    pub fn observe(&mut self, id: ObserverId, target: ElementId, init: MutationObserverInit) -> bool {
        let Some(observer) = self.observers.iter_mut().find(|o| o.id == id) else {
            return false;
        };
        match observer.targets.iter_mut().find(|(t, _)| *t == target) {
            Some(entry) => entry.1 = init,
            None => observer.targets.push((target, init)),
        }
        true
    }

    /// Stop observing everything and drop queued records.
    pub fn disconnect(&mut self, id: ObserverId) {
        if let Some(observer) = self.observers.iter_mut().find(|o| o.id == id) {
            observer.targets.clear();
            observer.pending.clear();
        }
    }

    pub fn remove(&mut self, id: ObserverId) {
        self.observers.retain(|o| o.id != id);
    }

    pub fn take_records(&mut self, id: ObserverId) -> Vec<MutationRecord> {
        self.observers
            .iter_mut()
            .find(|o| o.id == id)
            .map(|o| std::mem::take(&mut o.pending))
            .unwrap_or_default()
    }

    pub fn is_observing(&self) -> bool {
        self.observers.iter().any(|o| !o.targets.is_empty())
    }

    pub fn has_pending(&self) -> bool {
        self.observers.iter().any(|o| !o.pending.is_empty())
    }

    /// Queue `record` for every observer watching its target, directly or
    /// through one of `ancestors`.
    pub fn queue(&mut self, record: MutationRecord, ancestors: &[ElementId]) {
        for observer in &mut self.observers {
            if let Some(keep_old_value) = observer.interested(&record, ancestors) {
                let mut record = record.clone();
                if !keep_old_value {
                    record.old_value = None;
                }
                observer.pending.push(record);
            }
        }
    }

    /// Drop registrations on a destroyed element.
    pub fn forget_target(&mut self, target: ElementId) {
        for observer in &mut self.observers {
            observer.targets.retain(|(t, _)| *t != target);
        }
    }

    /// Hand every queued batch to its callback. Returns the number of
    /// records delivered.
    pub fn deliver(&mut self) -> usize {
        let batches: Vec<(MutationCallback, Vec<MutationRecord>)> = self
            .observers
            .iter_mut()
            .filter(|o| !o.pending.is_empty())
            .map(|o| (o.callback.clone(), std::mem::take(&mut o.pending)))
            .collect();
        let mut delivered = 0;
        for (callback, records) in batches {
            delivered += records.len();
            callback(&records);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::scene::tree::Tree;

    fn ids() -> (ElementId, ElementId) {
        let mut tree = Tree::new();
        (tree.insert(()), tree.insert(()))
    }

    #[test]
    fn test_batched_delivery() {
        let (parent, child) = ids();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut observers = MutationObservers::default();
        let id = observers.create(Rc::new(move |records: &[MutationRecord]| sink.borrow_mut().push(records.len())));
        observers.observe(id, parent, MutationObserverInit::attributes().subtree());

        observers.queue(MutationRecord::attribute(parent, "r", None), &[]);
        observers.queue(MutationRecord::attribute(child, "fill", None), &[parent]);
        assert!(seen.borrow().is_empty());

        assert_eq!(observers.deliver(), 2);
        assert_eq!(*seen.borrow(), vec![2]);
        assert_eq!(observers.deliver(), 0);
    }

    #[test]
    fn test_options_filter_records() {
        let (parent, child) = ids();
        let mut observers = MutationObservers::default();
        let id = observers.create(Rc::new(|_: &[MutationRecord]| {}));
        observers.observe(id, parent, MutationObserverInit::child_list());

        // Not subtree, and attributes are not observed.
        observers.queue(MutationRecord::attribute(parent, "r", Some(1.into())), &[]);
        observers.queue(MutationRecord::child_list(child, vec![], vec![], None, None), &[parent]);
        assert!(observers.take_records(id).is_empty());

        observers.queue(MutationRecord::child_list(parent, vec![child], vec![], None, None), &[]);
        let records = observers.take_records(id);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].added_nodes, vec![child]);
    }

    #[test]
    fn test_old_value_and_attribute_filter() {
        let (el, _) = ids();
        let mut observers = MutationObservers::default();
        let plain = observers.create(Rc::new(|_: &[MutationRecord]| {}));
        let with_old = observers.create(Rc::new(|_: &[MutationRecord]| {}));
        observers.observe(plain, el, MutationObserverInit::attributes());
        observers.observe(
            with_old,
            el,
            MutationObserverInit {
                attribute_filter: Some(vec!["r".into()]),
                ..MutationObserverInit::attributes().with_old_value()
            },
        );

        observers.queue(MutationRecord::attribute(el, "r", Some(5.into())), &[]);
        observers.queue(MutationRecord::attribute(el, "fill", Some("red".into())), &[]);

        let plain_records = observers.take_records(plain);
        assert_eq!(plain_records.len(), 2);
        assert_eq!(plain_records[0].old_value, None);

        let old_records = observers.take_records(with_old);
        assert_eq!(old_records.len(), 1);
        assert_eq!(old_records[0].old_value, Some(StyleValue::Number(5.0)));
    }

    #[test]
    fn test_disconnect_drops_pending() {
        let (el, _) = ids();
        let mut observers = MutationObservers::default();
        let id = observers.create(Rc::new(|_: &[MutationRecord]| {}));
        observers.observe(id, el, MutationObserverInit::attributes());
        observers.queue(MutationRecord::attribute(el, "r", None), &[]);
        observers.disconnect(id);
        assert!(!observers.has_pending());
        assert!(!observers.is_observing());
    }
}
