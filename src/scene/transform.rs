//! Per-element transform component.
//!
//! Holds the local position, rotation, scale, skew and origin plus the two
//! matrices derived from them. Each matrix has its own dirty flag:
//!
//! - `local_dirty` is raised by any setter and cleared by
//!   [`Transform::update_local`].
//! - `world_dirty` is raised by the scene whenever this node's local matrix
//!   or any ancestor's matrix changes, and cleared by
//!   [`Transform::update_world`].
//!
//! Propagating world dirtiness to descendants is the scene's job; the
//! component only knows about itself.

use std::cell::Cell;

use crate::math::{Mat4, Quat, Vec3};

#[derive(Debug, Clone)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    /// Skew angles in radians along X and Y
    skew: (f32, f32),
    origin: Vec3,
    /// Matrix from the `transform` style, applied around the origin
    style_matrix: Mat4,
    local: Cell<Mat4>,
    world: Cell<Mat4>,
    local_dirty: Cell<bool>,
    world_dirty: Cell<bool>,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            skew: (0.0, 0.0),
            origin: Vec3::ZERO,
            style_matrix: Mat4::IDENTITY,
            local: Cell::new(Mat4::IDENTITY),
            world: Cell::new(Mat4::IDENTITY),
            local_dirty: Cell::new(false),
            world_dirty: Cell::new(false),
        }
    }
}

impl Transform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn skew(&self) -> (f32, f32) {
        self.skew
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn style_matrix(&self) -> Mat4 {
        self.style_matrix
    }

    /// Rotation around Z in degrees.
    pub fn euler_angle(&self) -> f32 {
        self.rotation.angle_z().to_degrees()
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.local_dirty.set(true);
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation.normalize();
        self.local_dirty.set(true);
    }

    pub fn set_euler_angle(&mut self, degrees: f32) {
        self.set_rotation(Quat::from_rotation_z(degrees.to_radians()));
    }

    pub fn rotate(&mut self, degrees: f32) {
        let delta = Quat::from_rotation_z(degrees.to_radians());
        self.set_rotation(delta.mul(&self.rotation));
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.local_dirty.set(true);
    }

    pub fn set_skew(&mut self, skew_x: f32, skew_y: f32) {
        self.skew = (skew_x, skew_y);
        self.local_dirty.set(true);
    }

    pub fn set_origin(&mut self, origin: Vec3) {
        self.origin = origin;
        self.local_dirty.set(true);
    }

    pub fn set_style_matrix(&mut self, matrix: Mat4) {
        self.style_matrix = matrix;
        self.local_dirty.set(true);
    }

    pub fn is_local_dirty(&self) -> bool {
        self.local_dirty.get()
    }

    pub fn is_world_dirty(&self) -> bool {
        self.world_dirty.get()
    }

    pub fn mark_world_dirty(&self) {
        self.world_dirty.set(true);
    }

    /// Recompute the local matrix if any input changed.
    ///
    /// Returns `true` when the matrix was rebuilt, which also leaves the world
    /// matrix dirty.
    pub fn update_local(&self) -> bool {
        if !self.local_dirty.get() {
            return false;
        }
        self.local.set(self.compose_local());
        self.local_dirty.set(false);
        self.world_dirty.set(true);
        true
    }

    /// `T(pos) * T(o) * style * R * T(-o) * Shear * T(o) * S * T(-o)`
    fn compose_local(&self) -> Mat4 {
        let o = self.origin;
        let to_origin = Mat4::from_translation(o);
        let from_origin = Mat4::from_translation(o * -1.0);

        let rotate = Mat4::from_translation(self.position)
            .then(&to_origin)
            .then(&self.style_matrix)
            .then(&Mat4::from_quat(self.rotation))
            .then(&from_origin);
        let scale = to_origin
            .then(&Mat4::from_scale(self.scale))
            .then(&from_origin);

        if self.skew.0 != 0.0 || self.skew.1 != 0.0 {
            rotate
                .then(&Mat4::shear(self.skew.0, self.skew.1))
                .then(&scale)
        } else {
            rotate.then(&scale)
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        self.update_local();
        self.local.get()
    }

    /// Recompute the world matrix from the parent's, if dirty.
    pub fn update_world(&self, parent_world: Option<&Mat4>) {
        self.update_local();
        if !self.world_dirty.get() {
            return;
        }
        let local = self.local.get();
        let world = match parent_world {
            Some(parent) => parent.then(&local),
            None => local,
        };
        self.world.set(world);
        self.world_dirty.set(false);
    }

    /// Last computed world matrix. Callers make sure it is current first.
    pub fn world_matrix(&self) -> Mat4 {
        self.world.get()
    }

    /// Copy the local fields (not the cached matrices) into a fresh component.
    pub fn clone_local(&self) -> Transform {
        let mut copy = Transform::new();
        copy.position = self.position;
        copy.rotation = self.rotation;
        copy.scale = self.scale;
        copy.skew = self.skew;
        copy.origin = self.origin;
        copy.style_matrix = self.style_matrix;
        copy.local_dirty.set(true);
        copy.world_dirty.set(true);
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: (f32, f32), b: (f32, f32)) -> bool {
        (a.0 - b.0).abs() < 1e-4 && (a.1 - b.1).abs() < 1e-4
    }

    #[test]
    fn test_local_dirty_flag() {
        let mut t = Transform::new();
        assert!(!t.update_local());
        t.set_position(Vec3::xy(10.0, 5.0));
        assert!(t.is_local_dirty());
        assert!(t.update_local());
        assert!(!t.is_local_dirty());
        assert!(t.is_world_dirty());
        assert!(!t.update_local());
    }

    #[test]
    fn test_rotation_around_origin() {
        let mut t = Transform::new();
        t.set_origin(Vec3::xy(50.0, 50.0));
        t.set_euler_angle(90.0);
        // The origin itself stays put.
        assert!(approx_eq(t.local_matrix().transform_point(50.0, 50.0), (50.0, 50.0)));
        assert!(approx_eq(t.local_matrix().transform_point(100.0, 50.0), (50.0, 100.0)));
    }

    #[test]
    fn test_scale_around_origin() {
        let mut t = Transform::new();
        t.set_origin(Vec3::xy(10.0, 10.0));
        t.set_scale(Vec3::new(2.0, 3.0, 1.0));
        assert!(approx_eq(t.local_matrix().transform_point(10.0, 10.0), (10.0, 10.0)));
        assert!(approx_eq(t.local_matrix().transform_point(11.0, 11.0), (12.0, 13.0)));
    }

    #[test]
    fn test_skew_order() {
        let mut t = Transform::new();
        t.set_skew(std::f32::consts::FRAC_PI_4, 0.0);
        t.set_scale(Vec3::new(2.0, 1.0, 1.0));
        t.set_position(Vec3::xy(100.0, 0.0));
        // Scale first, then shear, then translate.
        let expected = Mat4::translate(100.0, 0.0)
            .then(&Mat4::shear(std::f32::consts::FRAC_PI_4, 0.0))
            .then(&Mat4::scale_xy(2.0, 1.0));
        assert!(t.local_matrix().approx_eq(&expected, 1e-5));
        assert!(approx_eq(t.local_matrix().transform_point(1.0, 1.0), (103.0, 1.0)));
    }

    #[test]
    fn test_world_uses_parent() {
        let parent = Mat4::translate(10.0, 20.0);
        let mut t = Transform::new();
        t.set_position(Vec3::xy(1.0, 2.0));
        t.update_world(Some(&parent));
        assert!(approx_eq(t.world_matrix().transform_point(0.0, 0.0), (11.0, 22.0)));

        // Without a parent the local matrix is the world matrix.
        let mut root = Transform::new();
        root.set_position(Vec3::xy(3.0, 4.0));
        root.update_world(None);
        assert_eq!(root.world_matrix(), root.local_matrix());
    }

    #[test]
    fn test_rotate_accumulates() {
        let mut t = Transform::new();
        t.rotate(30.0);
        t.rotate(60.0);
        assert!((t.euler_angle() - 90.0).abs() < 1e-3);
    }
}
