mod aabb;
mod rect;
mod transform;

pub use aabb::Aabb;
pub use rect::{Point, Rect};
pub use transform::{Decomposed2d, Mat4, Quat, Vec3};
