//! Arena-based storage for the scene hierarchy.
//!
//! Elements live in a dense `Vec` for cache-friendly iteration, addressed
//! through a sparse map of generational indices. Hierarchy is an explicit
//! doubly-linked index (parent, first/last child, prev/next sibling, child
//! count) so that insertion, removal and sibling queries are O(1) no matter
//! how many siblings a node has.
//!
//! - **Generational Indices**: an [`ElementId`] carries the generation of its
//!   slot, so a stale id never resolves to a node allocated later in the
//!   same slot.
//! - **Swap-Remove**: removal moves the last dense node into the hole and
//!   fixes its sparse entry.

use crate::error::TreeError;

/// Handle to a node in the scene tree.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct ElementId {
    index: u32,
    generation: u32,
}

impl ElementId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub fn index(self) -> u32 {
        self.index
    }

    /// Combines generation (high bits) with index (low bits).
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

struct SparseEntry {
    /// Position in the dense array while the slot is occupied
    dense_index: Option<usize>,
    /// Survives removal so the next occupant gets a fresh generation
    generation: u32,
}

struct Node<T> {
    value: T,
    parent: Option<ElementId>,
    first_child: Option<ElementId>,
    last_child: Option<ElementId>,
    prev_sibling: Option<ElementId>,
    next_sibling: Option<ElementId>,
    num_children: usize,
    /// Back-pointer to sparse array index (for swap-remove fixup)
    sparse_index: u32,
}

/// Hierarchy storage with O(1) lookup, insertion and unlinking.
pub struct Tree<T> {
    dense: Vec<Node<T>>,
    sparse: Vec<SparseEntry>,
    free_indices: Vec<u32>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Tree<T> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
        }
    }

    /// Store a detached node and return its id.
    pub fn insert(&mut self, value: T) -> ElementId {
        let dense_index = self.dense.len();
        let id = match self.free_indices.pop() {
            Some(index) => {
                let entry = &mut self.sparse[index as usize];
                entry.generation = entry.generation.wrapping_add(1);
                entry.dense_index = Some(dense_index);
                ElementId::new(index, entry.generation)
            }
            None => {
                let index = self.sparse.len() as u32;
                self.sparse.push(SparseEntry {
                    dense_index: Some(dense_index),
                    generation: 0,
                });
                ElementId::new(index, 0)
            }
        };

        self.dense.push(Node {
            value,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            num_children: 0,
            sparse_index: id.index,
        });
        id
    }

    /// Remove a node and return its value.
    ///
    /// The node is unlinked from its parent and its children become roots.
    pub fn remove(&mut self, id: ElementId) -> Option<T> {
        let dense_index = self.dense_index(id)?;

        self.detach(id);
        let mut child = self.dense[dense_index].first_child;
        while let Some(c) = child {
            let idx = self.dense_index(c)?;
            child = self.dense[idx].next_sibling;
            let node = &mut self.dense[idx];
            node.parent = None;
            node.prev_sibling = None;
            node.next_sibling = None;
        }

        let last_dense_index = self.dense.len() - 1;
        let removed = self.dense.swap_remove(dense_index);
        if dense_index != last_dense_index {
            let moved_sparse = self.dense[dense_index].sparse_index;
            self.sparse[moved_sparse as usize].dense_index = Some(dense_index);
        }

        self.sparse[id.index as usize].dense_index = None;
        self.free_indices.push(id.index);
        Some(removed.value)
    }

    fn dense_index(&self, id: ElementId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .filter(|e| e.generation == id.generation)
            .and_then(|e| e.dense_index)
    }

    fn node(&self, id: ElementId) -> Option<&Node<T>> {
        self.dense_index(id).map(|idx| &self.dense[idx])
    }

    fn node_mut(&mut self, id: ElementId) -> Option<&mut Node<T>> {
        self.dense_index(id).map(move |idx| &mut self.dense[idx])
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn get(&self, id: ElementId) -> Option<&T> {
        self.node(id).map(|n| &n.value)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut T> {
        self.node_mut(id).map(|n| &mut n.value)
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    /// All live ids in storage order (not tree order).
    pub fn ids(&self) -> Vec<ElementId> {
        self.dense
            .iter()
            .map(|n| ElementId::new(n.sparse_index, self.sparse[n.sparse_index as usize].generation))
            .collect()
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.parent
    }

    pub fn first_child(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.first_child
    }

    pub fn last_child(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.last_child
    }

    pub fn next_sibling(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.next_sibling
    }

    pub fn prev_sibling(&self, id: ElementId) -> Option<ElementId> {
        self.node(id)?.prev_sibling
    }

    pub fn num_children(&self, id: ElementId) -> usize {
        self.node(id).map(|n| n.num_children).unwrap_or(0)
    }

    /// Children in order.
    pub fn children(&self, id: ElementId) -> Children<'_, T> {
        Children {
            tree: self,
            next: self.first_child(id),
        }
    }

    /// Ancestors from the parent up to the root.
    pub fn ancestors(&self, id: ElementId) -> Ancestors<'_, T> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    pub fn child_at(&self, id: ElementId, index: usize) -> Option<ElementId> {
        self.children(id).nth(index)
    }

    pub fn index_of(&self, child: ElementId) -> Option<usize> {
        let parent = self.parent(child)?;
        self.children(parent).position(|c| c == child)
    }

    pub fn depth(&self, id: ElementId) -> usize {
        self.ancestors(id).count()
    }

    pub fn root_of(&self, id: ElementId) -> ElementId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Whether `ancestor` is `node` or one of its ancestors.
    pub fn is_inclusive_ancestor(&self, ancestor: ElementId, node: ElementId) -> bool {
        ancestor == node || self.ancestors(node).any(|a| a == ancestor)
    }

    /// Pre-order depth-first traversal including `id` itself.
    pub fn descendants(&self, id: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            out.push(current);
            let mut child = self.last_child(current);
            while let Some(c) = child {
                stack.push(c);
                child = self.prev_sibling(c);
            }
        }
        out
    }

    /// Whether `insert_before(parent, child, reference)` would succeed.
    pub fn check_insert(
        &self,
        parent: ElementId,
        child: ElementId,
        reference: Option<ElementId>,
    ) -> Result<(), TreeError> {
        if !self.contains(parent) {
            return Err(TreeError::StaleElement(parent));
        }
        if !self.contains(child) {
            return Err(TreeError::StaleElement(child));
        }
        if self.is_inclusive_ancestor(child, parent) {
            return Err(TreeError::Cycle { parent, child });
        }
        if let Some(r) = reference {
            if self.parent(r) != Some(parent) {
                return Err(TreeError::ReferenceNotChild);
            }
        }
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        self.insert_before(parent, child, None)
    }

    /// Insert `child` before `reference` (or last when `None`).
    pub fn insert_before(
        &mut self,
        parent: ElementId,
        child: ElementId,
        reference: Option<ElementId>,
    ) -> Result<(), TreeError> {
        self.check_insert(parent, child, reference)?;
        if reference == Some(child) {
            return Ok(());
        }

        self.detach(child);

        let prev = match reference {
            Some(r) => self.prev_sibling(r),
            None => self.last_child(parent),
        };

        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = reference;
        }
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next_sibling = Some(child);
                }
            }
            None => {
                if let Some(node) = self.node_mut(parent) {
                    node.first_child = Some(child);
                }
            }
        }
        match reference {
            Some(r) => {
                if let Some(node) = self.node_mut(r) {
                    node.prev_sibling = Some(child);
                }
            }
            None => {
                if let Some(node) = self.node_mut(parent) {
                    node.last_child = Some(child);
                }
            }
        }
        if let Some(node) = self.node_mut(parent) {
            node.num_children += 1;
        }
        Ok(())
    }

    /// Remove `child` from `parent`'s child list.
    pub fn remove_child(&mut self, parent: ElementId, child: ElementId) -> Result<(), TreeError> {
        if self.parent(child) != Some(parent) {
            return Err(TreeError::NotChild);
        }
        self.detach(child);
        Ok(())
    }

    /// Unlink `id` from its parent, if any.
    pub fn detach(&mut self, id: ElementId) {
        let Some(node) = self.node(id) else { return };
        let Some(parent) = node.parent else { return };
        let (prev, next) = (node.prev_sibling, node.next_sibling);

        match prev {
            Some(p) => {
                if let Some(n) = self.node_mut(p) {
                    n.next_sibling = next;
                }
            }
            None => {
                if let Some(n) = self.node_mut(parent) {
                    n.first_child = next;
                }
            }
        }
        match next {
            Some(nx) => {
                if let Some(n) = self.node_mut(nx) {
                    n.prev_sibling = prev;
                }
            }
            None => {
                if let Some(n) = self.node_mut(parent) {
                    n.last_child = prev;
                }
            }
        }
        if let Some(n) = self.node_mut(parent) {
            n.num_children = n.num_children.saturating_sub(1);
        }
        if let Some(n) = self.node_mut(id) {
            n.parent = None;
            n.prev_sibling = None;
            n.next_sibling = None;
        }
    }
}

pub struct Children<'a, T> {
    tree: &'a Tree<T>,
    next: Option<ElementId>,
}

impl<T> Iterator for Children<'_, T> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.tree.next_sibling(current);
        Some(current)
    }
}

pub struct Ancestors<'a, T> {
    tree: &'a Tree<T>,
    next: Option<ElementId>,
}

impl<T> Iterator for Ancestors<'_, T> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn family() -> (Tree<&'static str>, ElementId, [ElementId; 3]) {
        let mut tree = Tree::new();
        let parent = tree.insert("parent");
        let c1 = tree.insert("c1");
        let c2 = tree.insert("c2");
        let c3 = tree.insert("c3");
        for c in [c1, c2, c3] {
            tree.append_child(parent, c).unwrap();
        }
        (tree, parent, [c1, c2, c3])
    }

    #[test]
    fn test_tree_insert_remove() {
        let mut tree = Tree::new();
        let id = tree.insert(1);
        assert!(tree.contains(id));
        assert_eq!(tree.get(id), Some(&1));
        assert_eq!(tree.remove(id), Some(1));
        assert!(!tree.contains(id));
        assert!(tree.is_empty());
    }

    #[test]
    fn test_tree_generational_index() {
        let mut tree = Tree::new();
        let first = tree.insert("a");
        tree.remove(first);
        let second = tree.insert("b");
        assert_eq!(first.index(), second.index());
        assert_ne!(first, second);
        assert_eq!(tree.get(first), None);
        assert_eq!(tree.get(second), Some(&"b"));
    }

    #[test]
    fn test_tree_hierarchy_indices() {
        let (mut tree, parent, [c1, c2, c3]) = family();
        assert_eq!(tree.first_child(parent), Some(c1));
        assert_eq!(tree.last_child(parent), Some(c3));
        assert_eq!(tree.num_children(parent), 3);

        tree.remove_child(parent, c2).unwrap();
        assert_eq!(tree.next_sibling(c1), Some(c3));
        assert_eq!(tree.prev_sibling(c3), Some(c1));
        assert_eq!(tree.num_children(parent), 2);

        tree.remove_child(parent, c1).unwrap();
        assert_eq!(tree.first_child(parent), Some(c3));
        assert_eq!(tree.prev_sibling(c3), None);

        tree.remove_child(parent, c3).unwrap();
        assert_eq!(tree.first_child(parent), None);
        assert_eq!(tree.last_child(parent), None);
        assert_eq!(tree.num_children(parent), 0);
    }

    #[test]
    fn test_tree_remove_last_updates_last_child() {
        let (mut tree, parent, [c1, c2, c3]) = family();
        tree.remove_child(parent, c3).unwrap();
        assert_eq!(tree.last_child(parent), Some(c2));
        assert_eq!(tree.next_sibling(c2), None);
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![c1, c2]);
    }

    #[test]
    fn test_tree_insert_before() {
        let (mut tree, parent, [c1, c2, c3]) = family();
        let c0 = tree.insert("c0");
        tree.insert_before(parent, c0, Some(c1)).unwrap();
        assert_eq!(tree.first_child(parent), Some(c0));

        // Moving an existing child reorders it.
        tree.insert_before(parent, c3, Some(c2)).unwrap();
        assert_eq!(
            tree.children(parent).collect::<Vec<_>>(),
            vec![c0, c1, c3, c2]
        );
        assert_eq!(tree.index_of(c3), Some(2));
        assert_eq!(tree.num_children(parent), 4);

        let stranger = tree.insert("stranger");
        assert_eq!(
            tree.insert_before(parent, c0, Some(stranger)),
            Err(TreeError::ReferenceNotChild)
        );
    }

    #[test]
    fn test_tree_rejects_cycles() {
        let (mut tree, parent, [c1, _, _]) = family();
        let grandchild = tree.insert("g");
        tree.append_child(c1, grandchild).unwrap();
        assert!(matches!(
            tree.append_child(grandchild, parent),
            Err(TreeError::Cycle { .. })
        ));
        assert!(matches!(
            tree.append_child(c1, c1),
            Err(TreeError::Cycle { .. })
        ));
        // The failed call left the structure intact.
        assert_eq!(tree.parent(grandchild), Some(c1));
        assert_eq!(tree.depth(grandchild), 2);
    }

    #[test]
    fn test_tree_remove_not_child() {
        let (mut tree, _, [c1, c2, _]) = family();
        assert_eq!(tree.remove_child(c1, c2), Err(TreeError::NotChild));
    }

    #[test]
    fn test_tree_descendants_preorder() {
        let (mut tree, parent, [c1, c2, c3]) = family();
        let g = tree.insert("g");
        tree.append_child(c1, g).unwrap();
        assert_eq!(tree.descendants(parent), vec![parent, c1, g, c2, c3]);
        assert!(tree.is_inclusive_ancestor(parent, g));
        assert!(!tree.is_inclusive_ancestor(c2, g));
        assert_eq!(tree.root_of(g), parent);
    }

    #[test]
    fn test_tree_swap_remove_fixup() {
        let (mut tree, parent, [c1, c2, c3]) = family();
        tree.remove(c1);
        // c3 was moved into c1's dense slot and must still resolve.
        assert_eq!(tree.get(c3), Some(&"c3"));
        assert_eq!(tree.children(parent).collect::<Vec<_>>(), vec![c2, c3]);
        assert_eq!(tree.ids().len(), 3);
    }
}
