//! Damage tracking between frames.
//!
//! The tracker remembers the last render bounds of every element it has
//! seen. A changed element damages both its old and new bounds; a removed
//! one damages its old bounds. The union of all damage for a frame is what a
//! backend needs to clear and repaint.

use rustc_hash::FxHashMap;

use crate::math::{Aabb, Rect};
use crate::scene::ElementId;

/// What a frame has to repaint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Damage {
    None,
    Partial(Rect),
    Full,
}

impl Damage {
    /// The clip rectangle for this frame; `None` means the whole canvas.
    pub fn clip(&self) -> Option<Rect> {
        match self {
            Damage::Partial(rect) => Some(*rect),
            _ => None,
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Damage::None)
    }
}

#[derive(Debug, Default)]
pub struct DirtyRectTracker {
    last_bounds: FxHashMap<ElementId, Aabb>,
    pending: Option<Aabb>,
    full: bool,
    last_debug: Option<Rect>,
}

impl DirtyRectTracker {
    pub fn new() -> Self {
        Self {
            full: true,
            ..Default::default()
        }
    }

    /// Next frame repaints everything.
    pub fn invalidate_all(&mut self) {
        self.full = true;
    }

    /// Record the element's current bounds, damaging old and new.
    pub fn update(&mut self, id: ElementId, bounds: Option<Aabb>) {
        let old = match bounds {
            Some(b) => self.last_bounds.insert(id, b),
            None => self.last_bounds.remove(&id),
        };
        self.damage(old);
        self.damage(bounds);
    }

    /// Forget the element, damaging where it was last drawn.
    pub fn remove(&mut self, id: ElementId) {
        let old = self.last_bounds.remove(&id);
        self.damage(old);
    }

    fn damage(&mut self, bounds: Option<Aabb>) {
        let Some(b) = bounds.filter(|b| !b.is_empty()) else {
            return;
        };
        self.pending = Some(match self.pending {
            Some(p) => p.union(&b),
            None => b,
        });
    }

    /// Close the frame's damage. With `debug` set the previous overlay
    /// rectangle is included so it gets cleared before the new one is drawn.
    pub fn take(&mut self, viewport: Rect, debug: bool) -> Damage {
        let pending = self.pending.take();
        if std::mem::take(&mut self.full) {
            self.last_debug = None;
            return Damage::Full;
        }
        let mut rect = pending.map(|b| b.to_rect());
        if debug {
            if let Some(prev) = self.last_debug {
                rect = Some(rect.map_or(prev, |r| r.union(&prev)));
            }
        }
        let Some(rect) = rect.and_then(|r| clip_rect(&r, &viewport)) else {
            return Damage::None;
        };
        if debug {
            self.last_debug = Some(rect);
        }
        Damage::Partial(rect)
    }

    /// Rectangle of the overlay drawn last frame.
    pub fn last_debug_rect(&self) -> Option<Rect> {
        self.last_debug
    }

    pub fn has_pending(&self) -> bool {
        self.full || self.pending.is_some()
    }

    pub fn clear(&mut self) {
        self.last_bounds.clear();
        self.pending = None;
        self.full = true;
        self.last_debug = None;
    }
}

fn clip_rect(rect: &Rect, viewport: &Rect) -> Option<Rect> {
    let left = rect.left().max(viewport.left());
    let top = rect.top().max(viewport.top());
    let right = rect.right().min(viewport.right());
    let bottom = rect.bottom().min(viewport.bottom());
    (right > left && bottom > top).then(|| Rect::new(left, top, right - left, bottom - top))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Tree;

    fn ids(n: usize) -> Vec<ElementId> {
        let mut tree = Tree::new();
        (0..n).map(|i| tree.insert(i)).collect()
    }

    fn aabb(x: f32, y: f32, w: f32, h: f32) -> Option<Aabb> {
        Some(Rect::new(x, y, w, h).to_aabb())
    }

    #[test]
    fn test_first_frame_is_full() {
        let mut tracker = DirtyRectTracker::new();
        let viewport = Rect::from_size(100.0, 100.0);
        assert_eq!(tracker.take(viewport, false), Damage::Full);
        assert_eq!(tracker.take(viewport, false), Damage::None);
    }

    #[test]
    fn test_move_damages_old_and_new() {
        let id = ids(1)[0];
        let mut tracker = DirtyRectTracker::new();
        let viewport = Rect::from_size(200.0, 200.0);
        tracker.update(id, aabb(0.0, 0.0, 10.0, 10.0));
        tracker.take(viewport, false);

        tracker.update(id, aabb(50.0, 50.0, 10.0, 10.0));
        assert_eq!(tracker.take(viewport, false), Damage::Partial(Rect::new(0.0, 0.0, 60.0, 60.0)));

        tracker.remove(id);
        assert_eq!(tracker.take(viewport, false), Damage::Partial(Rect::new(50.0, 50.0, 10.0, 10.0)));
    }

    #[test]
    fn test_clipped_to_viewport() {
        let id = ids(1)[0];
        let mut tracker = DirtyRectTracker::new();
        let viewport = Rect::from_size(100.0, 100.0);
        tracker.take(viewport, false);
        tracker.update(id, aabb(90.0, 90.0, 50.0, 50.0));
        assert_eq!(tracker.take(viewport, false), Damage::Partial(Rect::new(90.0, 90.0, 10.0, 10.0)));
        tracker.update(id, aabb(200.0, 200.0, 5.0, 5.0));
        // old bounds still intersect
        assert!(matches!(tracker.take(viewport, false), Damage::Partial(_)));
        tracker.update(id, aabb(300.0, 300.0, 5.0, 5.0));
        assert_eq!(tracker.take(viewport, false), Damage::None);
    }

    #[test]
    fn test_debug_overlay_is_cleared_next_frame() {
        let list = ids(2);
        let mut tracker = DirtyRectTracker::new();
        let viewport = Rect::from_size(200.0, 200.0);
        tracker.take(viewport, true);

        tracker.update(list[0], aabb(0.0, 0.0, 10.0, 10.0));
        assert_eq!(tracker.take(viewport, true), Damage::Partial(Rect::new(0.0, 0.0, 10.0, 10.0)));

        tracker.update(list[1], aabb(100.0, 100.0, 10.0, 10.0));
        assert_eq!(
            tracker.take(viewport, true),
            Damage::Partial(Rect::new(0.0, 0.0, 110.0, 110.0))
        );
        assert_eq!(tracker.last_debug_rect(), Some(Rect::new(0.0, 0.0, 110.0, 110.0)));
    }
}
