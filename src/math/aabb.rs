use super::{Mat4, Rect, Vec3};

/// Axis-aligned bounding box stored as center plus half extents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub center: Vec3,
    pub half_extents: Vec3,
}

impl Aabb {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    pub fn from_min_max(min: (f32, f32), max: (f32, f32)) -> Self {
        Self::from_min_max3(Vec3::xy(min.0, min.1), Vec3::xy(max.0, max.1))
    }

    pub fn from_min_max3(min: Vec3, max: Vec3) -> Self {
        Self {
            center: (min + max) * 0.5,
            half_extents: (max - min) * 0.5,
        }
    }

    /// Smallest box holding every point, or `None` for an empty iterator.
    pub fn from_points<I: IntoIterator<Item = (f32, f32)>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let (mut min, mut max) = (Vec3::xy(x, y), Vec3::xy(x, y));
        for (x, y) in iter {
            min = min.min(Vec3::xy(x, y));
            max = max.max(Vec3::xy(x, y));
        }
        Some(Self::from_min_max3(min, max))
    }

    pub fn min(&self) -> Vec3 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec3 {
        self.center + self.half_extents
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Self::from_min_max3(self.min().min(other.min()), self.max().max(other.max()))
    }

    /// Grow on X and Y by `amount` on every side.
    pub fn expand(&self, amount: f32) -> Aabb {
        Aabb {
            center: self.center,
            half_extents: Vec3::new(
                (self.half_extents.x + amount).max(0.0),
                (self.half_extents.y + amount).max(0.0),
                self.half_extents.z,
            ),
        }
    }

    /// Bounds of this box after applying `m`, keeping it axis-aligned.
    pub fn transform(&self, m: &Mat4) -> Aabb {
        let d = &m.data;
        let center = m.transform_point3(self.center);
        let h = self.half_extents;
        let extent = |row: usize| {
            d[row * 4].abs() * h.x + d[row * 4 + 1].abs() * h.y + d[row * 4 + 2].abs() * h.z
        };
        Aabb {
            center,
            half_extents: Vec3::new(extent(0), extent(1), extent(2)),
        }
    }

    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        let (min, max) = (self.min(), self.max());
        x >= min.x && x <= max.x && y >= min.y && y <= max.y
    }

    pub fn intersects(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x <= b_max.x && a_max.x >= b_min.x && a_min.y <= b_max.y && a_max.y >= b_min.y
    }

    pub fn is_empty(&self) -> bool {
        self.half_extents.x <= 0.0 && self.half_extents.y <= 0.0
    }

    pub fn to_rect(&self) -> Rect {
        let min = self.min();
        Rect::new(
            min.x,
            min.y,
            self.half_extents.x * 2.0,
            self.half_extents.y * 2.0,
        )
    }
}
