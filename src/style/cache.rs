use std::cell::RefCell;

/// A lazily computed value that can be explicitly invalidated.
///
/// `Invalidated` is kept distinct from `Uncomputed` so callers can tell a
/// value that was never needed from one that went stale after a mutation.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CacheCell<T> {
    #[default]
    Uncomputed,
    Computed(T),
    Invalidated,
}

impl<T> CacheCell<T> {
    pub fn get(&self) -> Option<&T> {
        match self {
            CacheCell::Computed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_computed(&self) -> bool {
        matches!(self, CacheCell::Computed(_))
    }

    pub fn is_invalidated(&self) -> bool {
        matches!(self, CacheCell::Invalidated)
    }

    /// Drop the cached value. A cell that was never computed stays `Uncomputed`.
    pub fn invalidate(&mut self) {
        if self.is_computed() {
            *self = CacheCell::Invalidated;
        }
    }

    /// Return the cached value, computing and storing it first if needed.
    pub fn get_or_compute(&mut self, compute: impl FnOnce() -> T) -> &T {
        if !self.is_computed() {
            *self = CacheCell::Computed(compute());
        }
        match self {
            CacheCell::Computed(value) => value,
            _ => unreachable!("cache cell was just filled"),
        }
    }
}

/// Read through a shared cell, computing outside the borrow so `compute` may
/// consult other cells freely.
pub fn cached<T: Clone>(cell: &RefCell<CacheCell<T>>, compute: impl FnOnce() -> T) -> T {
    if let Some(value) = cell.borrow().get() {
        return value.clone();
    }
    let value = compute();
    *cell.borrow_mut() = CacheCell::Computed(value.clone());
    value
}
