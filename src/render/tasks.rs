//! Deferred work run a few tasks per frame.
//!
//! Image decoding and tile slicing are queued here instead of running inline
//! so that a large image cannot stall a frame. Sources take turns: each
//! frame pops at most one task per source per round until the budget is
//! spent. A finished task requests a re-render.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::math::Rect;

pub type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queues {
    sources: VecDeque<(String, VecDeque<Task>)>,
    rerender: bool,
}

/// Cheap to clone; clones share the same queue.
#[derive(Clone, Default)]
pub struct TaskQueue {
    inner: Rc<RefCell<Queues>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&self, source: &str, task: impl FnOnce() + 'static) {
        let mut inner = self.inner.borrow_mut();
        match inner.sources.iter_mut().find(|(name, _)| name == source) {
            Some((_, queue)) => queue.push_back(Box::new(task)),
            None => {
                let mut queue: VecDeque<Task> = VecDeque::new();
                queue.push_back(Box::new(task));
                inner.sources.push_back((source.to_string(), queue));
            }
        }
    }

    /// Run up to `budget` tasks, rotating between sources. Returns how many
    /// ran.
    pub fn run_frame(&self, budget: usize) -> usize {
        let mut ran = 0;
        while ran < budget {
            let Some(task) = self.next_task() else {
                break;
            };
            // not borrowed while running so the task can schedule more
            task();
            ran += 1;
        }
        if ran > 0 {
            self.request_rerender();
            log::debug!("Ran {} deferred tasks, {} pending", ran, self.len());
        }
        ran
    }

    fn next_task(&self) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        let (source, mut queue) = inner.sources.pop_front()?;
        let task = queue.pop_front();
        if !queue.is_empty() {
            inner.sources.push_back((source, queue));
        }
        task
    }

    /// Drop every pending task from `source`.
    pub fn cancel(&self, source: &str) -> usize {
        let mut inner = self.inner.borrow_mut();
        let mut dropped = 0;
        inner.sources.retain(|(name, queue)| {
            if name == source {
                dropped = queue.len();
                false
            } else {
                true
            }
        });
        dropped
    }

    pub fn request_rerender(&self) {
        self.inner.borrow_mut().rerender = true;
    }

    /// Whether a re-render was requested since the last call.
    pub fn take_rerender_request(&self) -> bool {
        std::mem::take(&mut self.inner.borrow_mut().rerender)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().sources.iter().map(|(_, q)| q.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().sources.is_empty()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.sources.clear();
        inner.rerender = false;
    }
}

/// One cell of a [`TileGrid`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub column: u32,
    pub row: u32,
    /// Pixel rectangle in the source image.
    pub rect: Rect,
}

impl Tile {
    /// Copy this tile's RGBA pixels out of an image `image_width` pixels
    /// wide. Rows that fall outside `pixels` are left out.
    pub fn extract_rgba(&self, pixels: &[u8], image_width: u32) -> Vec<u8> {
        let x = self.rect.x as usize;
        let y = self.rect.y as usize;
        let w = self.rect.width as usize;
        let h = self.rect.height as usize;
        let stride = image_width as usize * 4;
        let mut out = Vec::with_capacity(w * h * 4);
        for row in y..y + h {
            let start = row * stride + x * 4;
            let Some(line) = pixels.get(start..start + w * 4) else {
                break;
            };
            out.extend_from_slice(line);
        }
        out
    }
}

/// Splits a large image into GPU-friendly square tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    pub image_width: u32,
    pub image_height: u32,
    pub tile_size: u32,
    pub columns: u32,
    pub rows: u32,
}

impl TileGrid {
    pub fn new(image_width: u32, image_height: u32, tile_size: u32) -> Self {
        let tile_size = tile_size.max(1);
        Self {
            image_width,
            image_height,
            tile_size,
            columns: image_width.div_ceil(tile_size),
            rows: image_height.div_ceil(tile_size),
        }
    }

    pub fn len(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn tile(&self, column: u32, row: u32) -> Option<Tile> {
        if column >= self.columns || row >= self.rows {
            return None;
        }
        let x = column * self.tile_size;
        let y = row * self.tile_size;
        let w = self.tile_size.min(self.image_width - x);
        let h = self.tile_size.min(self.image_height - y);
        Some(Tile {
            column,
            row,
            rect: Rect::new(x as f32, y as f32, w as f32, h as f32),
        })
    }

    /// Tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.columns).filter_map(move |col| self.tile(col, row)))
    }
}
