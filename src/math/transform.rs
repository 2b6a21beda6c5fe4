use std::ops::{Add, Mul, Sub};

/// A 3-component vector used for positions, scales and origins.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn xy(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y), self.z.min(other.z))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y), self.z.max(other.z))
    }

    pub fn mul_elements(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }
}

impl Add for Vec3 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;

    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// A rotation quaternion stored as `(x, y, z, w)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Quat {
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };

    /// Rotation around the Z axis, which is the only axis a 2D scene rotates about.
    pub fn from_rotation_z(angle_radians: f32) -> Self {
        let half = angle_radians * 0.5;
        Self {
            x: 0.0,
            y: 0.0,
            z: half.sin(),
            w: half.cos(),
        }
    }

    pub fn from_axis_angle(axis: Vec3, angle_radians: f32) -> Self {
        let len = (axis.x * axis.x + axis.y * axis.y + axis.z * axis.z).sqrt();
        if len < f32::EPSILON {
            return Self::IDENTITY;
        }
        let half = angle_radians * 0.5;
        let s = half.sin() / len;
        Self {
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
            w: half.cos(),
        }
    }

    /// Hamilton product: the result applies `other` first, then `self`.
    pub fn mul(&self, other: &Quat) -> Quat {
        let (ax, ay, az, aw) = (self.x, self.y, self.z, self.w);
        let (bx, by, bz, bw) = (other.x, other.y, other.z, other.w);
        Quat {
            x: ax * bw + aw * bx + ay * bz - az * by,
            y: ay * bw + aw * by + az * bx - ax * bz,
            z: az * bw + aw * bz + ax * by - ay * bx,
            w: aw * bw - ax * bx - ay * by - az * bz,
        }
    }

    pub fn normalize(&self) -> Quat {
        let len = (self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w).sqrt();
        if len < f32::EPSILON {
            return Self::IDENTITY;
        }
        Quat {
            x: self.x / len,
            y: self.y / len,
            z: self.z / len,
            w: self.w / len,
        }
    }

    /// Rotation around Z in radians.
    pub fn angle_z(&self) -> f32 {
        (2.0 * (self.w * self.z + self.x * self.y))
            .atan2(1.0 - 2.0 * (self.y * self.y + self.z * self.z))
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// The pieces of a 2D affine matrix, in the order they are composed:
/// translate, rotate, shear along X, then scale.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Decomposed2d {
    pub translation: (f32, f32),
    pub rotation: f32,
    pub scale: (f32, f32),
    pub skew_x: f32,
}

/// A 4x4 transformation matrix stored in row-major order.
///
/// Points are column vectors, so the translation lives in the last column
/// and `a.then(&b)` applies `b` first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Mat4 {
    /// Matrix data in row-major order: [row0, row1, row2, row3]
    pub data: [f32; 16],
}

impl Mat4 {
    /// Identity matrix (no transformation)
    pub const IDENTITY: Self = Self {
        data: [
            1.0, 0.0, 0.0, 0.0, // row 0
            0.0, 1.0, 0.0, 0.0, // row 1
            0.0, 0.0, 1.0, 0.0, // row 2
            0.0, 0.0, 0.0, 1.0, // row 3
        ],
    };

    pub fn identity() -> Self {
        Self::IDENTITY
    }

    pub fn translate(x: f32, y: f32) -> Self {
        Self::from_translation(Vec3::xy(x, y))
    }

    pub fn from_translation(t: Vec3) -> Self {
        Self {
            data: [
                1.0, 0.0, 0.0, t.x, // row 0
                0.0, 1.0, 0.0, t.y, // row 1
                0.0, 0.0, 1.0, t.z, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Rotation around the Z axis (2D rotation)
    pub fn rotate(angle_radians: f32) -> Self {
        let cos = angle_radians.cos();
        let sin = angle_radians.sin();
        Self {
            data: [
                cos, -sin, 0.0, 0.0, // row 0
                sin, cos, 0.0, 0.0, // row 1
                0.0, 0.0, 1.0, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    pub fn rotate_degrees(angle_degrees: f32) -> Self {
        Self::rotate(angle_degrees.to_radians())
    }

    pub fn scale(s: f32) -> Self {
        Self::scale_xy(s, s)
    }

    pub fn scale_xy(sx: f32, sy: f32) -> Self {
        Self::from_scale(Vec3::new(sx, sy, 1.0))
    }

    pub fn from_scale(s: Vec3) -> Self {
        Self {
            data: [
                s.x, 0.0, 0.0, 0.0, // row 0
                0.0, s.y, 0.0, 0.0, // row 1
                0.0, 0.0, s.z, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    pub fn from_quat(q: Quat) -> Self {
        let (x2, y2, z2) = (q.x + q.x, q.y + q.y, q.z + q.z);
        let xx = q.x * x2;
        let yx = q.y * x2;
        let yy = q.y * y2;
        let zx = q.z * x2;
        let zy = q.z * y2;
        let zz = q.z * z2;
        let wx = q.w * x2;
        let wy = q.w * y2;
        let wz = q.w * z2;
        Self {
            data: [
                1.0 - yy - zz, yx - wz, zx + wy, 0.0, // row 0
                yx + wz, 1.0 - xx - zz, zy - wx, 0.0, // row 1
                zx - wy, zy + wx, 1.0 - xx - yy, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// Shear matrix: `x' = x + tan(skew_x) * y`, `y' = y + tan(skew_y) * x`.
    pub fn shear(skew_x: f32, skew_y: f32) -> Self {
        Self {
            data: [
                1.0, skew_x.tan(), 0.0, 0.0, // row 0
                skew_y.tan(), 1.0, 0.0, 0.0, // row 1
                0.0, 0.0, 1.0, 0.0, // row 2
                0.0, 0.0, 0.0, 1.0, // row 3
            ],
        }
    }

    /// `T(translation) * T(origin) * R * S * T(-origin)`.
    pub fn from_rotation_translation_scale_origin(
        rotation: Quat,
        translation: Vec3,
        scale: Vec3,
        origin: Vec3,
    ) -> Self {
        Self::from_translation(translation + origin)
            .then(&Self::from_quat(rotation))
            .then(&Self::from_scale(scale))
            .then(&Self::from_translation(origin * -1.0))
    }

    /// Re-center this transform around a pivot: `T(o) * self * T(-o)`.
    pub fn center_at(&self, ox: f32, oy: f32) -> Self {
        Self::translate(ox, oy)
            .then(self)
            .then(&Self::translate(-ox, -oy))
    }

    /// Compose this transform with another: self * other
    /// Applies `other` first, then `self`.
    pub fn then(&self, other: &Mat4) -> Mat4 {
        let a = &self.data;
        let b = &other.data;

        let mut result = [0.0f32; 16];
        for i in 0..4 {
            for j in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += a[i * 4 + k] * b[k * 4 + j];
                }
                result[i * 4 + j] = sum;
            }
        }

        Mat4 { data: result }
    }

    /// General 4x4 inverse. Returns `None` for singular matrices.
    pub fn inverse(&self) -> Option<Mat4> {
        let a = &self.data;
        let (a00, a01, a02, a03) = (a[0], a[1], a[2], a[3]);
        let (a10, a11, a12, a13) = (a[4], a[5], a[6], a[7]);
        let (a20, a21, a22, a23) = (a[8], a[9], a[10], a[11]);
        let (a30, a31, a32, a33) = (a[12], a[13], a[14], a[15]);

        let b00 = a00 * a11 - a01 * a10;
        let b01 = a00 * a12 - a02 * a10;
        let b02 = a00 * a13 - a03 * a10;
        let b03 = a01 * a12 - a02 * a11;
        let b04 = a01 * a13 - a03 * a11;
        let b05 = a02 * a13 - a03 * a12;
        let b06 = a20 * a31 - a21 * a30;
        let b07 = a20 * a32 - a22 * a30;
        let b08 = a20 * a33 - a23 * a30;
        let b09 = a21 * a32 - a22 * a31;
        let b10 = a21 * a33 - a23 * a31;
        let b11 = a22 * a33 - a23 * a32;

        let det = b00 * b11 - b01 * b10 + b02 * b09 + b03 * b08 - b04 * b07 + b05 * b06;
        if det.abs() < 1e-12 {
            return None;
        }
        let inv_det = 1.0 / det;

        Some(Mat4 {
            data: [
                (a11 * b11 - a12 * b10 + a13 * b09) * inv_det,
                (a02 * b10 - a01 * b11 - a03 * b09) * inv_det,
                (a31 * b05 - a32 * b04 + a33 * b03) * inv_det,
                (a22 * b04 - a21 * b05 - a23 * b03) * inv_det,
                (a12 * b08 - a10 * b11 - a13 * b07) * inv_det,
                (a00 * b11 - a02 * b08 + a03 * b07) * inv_det,
                (a32 * b02 - a30 * b05 - a33 * b01) * inv_det,
                (a20 * b05 - a22 * b02 + a23 * b01) * inv_det,
                (a10 * b10 - a11 * b08 + a13 * b06) * inv_det,
                (a01 * b08 - a00 * b10 - a03 * b06) * inv_det,
                (a30 * b04 - a31 * b02 + a33 * b00) * inv_det,
                (a21 * b02 - a20 * b04 - a23 * b00) * inv_det,
                (a11 * b07 - a10 * b09 - a12 * b06) * inv_det,
                (a00 * b09 - a01 * b07 + a02 * b06) * inv_det,
                (a31 * b01 - a30 * b03 - a32 * b00) * inv_det,
                (a20 * b03 - a21 * b01 + a22 * b00) * inv_det,
            ],
        })
    }

    /// Transform a 2D point by this matrix
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        let new_x = self.data[0] * x + self.data[1] * y + self.data[3];
        let new_y = self.data[4] * x + self.data[5] * y + self.data[7];
        (new_x, new_y)
    }

    pub fn transform_point3(&self, p: Vec3) -> Vec3 {
        let d = &self.data;
        Vec3::new(
            d[0] * p.x + d[1] * p.y + d[2] * p.z + d[3],
            d[4] * p.x + d[5] * p.y + d[6] * p.z + d[7],
            d[8] * p.x + d[9] * p.y + d[10] * p.z + d[11],
        )
    }

    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.data[3], self.data[7], self.data[11])
    }

    pub fn rows(&self) -> [[f32; 4]; 4] {
        [
            [self.data[0], self.data[1], self.data[2], self.data[3]],
            [self.data[4], self.data[5], self.data[6], self.data[7]],
            [self.data[8], self.data[9], self.data[10], self.data[11]],
            [self.data[12], self.data[13], self.data[14], self.data[15]],
        ]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Split the 2D part into translate * rotate * shear_x * scale.
    pub fn decompose_2d(&self) -> Decomposed2d {
        let (a, c, e) = (self.data[0], self.data[1], self.data[3]);
        let (b, d, f) = (self.data[4], self.data[5], self.data[7]);

        let sx = (a * a + b * b).sqrt();
        let rotation = b.atan2(a);
        let (sin, cos) = rotation.sin_cos();
        // Undo the rotation, leaving an upper-triangular [[sx, c'], [0, sy]].
        let c_prime = cos * c + sin * d;
        let sy = -sin * c + cos * d;
        let skew_x = if sy.abs() > f32::EPSILON {
            (c_prime / sy).atan()
        } else {
            0.0
        };

        Decomposed2d {
            translation: (e, f),
            rotation,
            scale: (sx, sy),
            skew_x,
        }
    }

    pub fn approx_eq(&self, other: &Mat4, epsilon: f32) -> bool {
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

impl Default for Mat4 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_identity() {
        let t = Mat4::identity();
        assert_eq!(t, Mat4::IDENTITY);
        assert!(t.is_identity());
    }

    #[test]
    fn test_translate() {
        let t = Mat4::translate(10.0, 20.0);
        let (x, y) = t.transform_point(5.0, 5.0);
        assert!(approx_eq(x, 15.0));
        assert!(approx_eq(y, 25.0));
    }

    #[test]
    fn test_rotate() {
        let t = Mat4::rotate_degrees(90.0);
        let (x, y) = t.transform_point(1.0, 0.0);
        assert!(approx_eq(x, 0.0));
        assert!(approx_eq(y, 1.0));
    }

    #[test]
    fn test_quat_matches_rotate() {
        let q = Quat::from_rotation_z(0.7);
        assert!(Mat4::from_quat(q).approx_eq(&Mat4::rotate(0.7), 1e-5));
        assert!(approx_eq(q.angle_z(), 0.7));
    }

    #[test]
    fn test_quat_mul_adds_angles() {
        let q = Quat::from_rotation_z(0.3).mul(&Quat::from_rotation_z(0.4));
        assert!(approx_eq(q.angle_z(), 0.7));
    }

    #[test]
    fn test_compose() {
        // scale.then(translate): first translate, then scale
        let composed = Mat4::scale(2.0).then(&Mat4::translate(10.0, 0.0));
        let (x, y) = composed.transform_point(0.0, 0.0);
        assert!(approx_eq(x, 20.0));
        assert!(approx_eq(y, 0.0));
    }

    #[test]
    fn test_shear() {
        let t = Mat4::shear(std::f32::consts::FRAC_PI_4, 0.0);
        let (x, y) = t.transform_point(0.0, 10.0);
        assert!(approx_eq(x, 10.0));
        assert!(approx_eq(y, 10.0));
    }

    #[test]
    fn test_rotation_around_origin() {
        let t = Mat4::from_rotation_translation_scale_origin(
            Quat::from_rotation_z(std::f32::consts::PI),
            Vec3::ZERO,
            Vec3::ONE,
            Vec3::xy(50.0, 50.0),
        );
        // Rotating the pivot leaves it in place.
        let (x, y) = t.transform_point(50.0, 50.0);
        assert!(approx_eq(x, 50.0));
        assert!(approx_eq(y, 50.0));
        let (x, y) = t.transform_point(0.0, 0.0);
        assert!(approx_eq(x, 100.0));
        assert!(approx_eq(y, 100.0));
    }

    #[test]
    fn test_inverse() {
        let t = Mat4::translate(10.0, 20.0)
            .then(&Mat4::rotate_degrees(30.0))
            .then(&Mat4::scale_xy(2.0, 3.0))
            .then(&Mat4::shear(0.2, 0.0));
        let inv = t.inverse().unwrap();
        assert!(t.then(&inv).approx_eq(&Mat4::IDENTITY, 1e-4));
    }

    #[test]
    fn test_singular_has_no_inverse() {
        assert!(Mat4::scale_xy(0.0, 1.0).inverse().is_none());
    }

    #[test]
    fn test_decompose_round_trip() {
        let t = Mat4::translate(5.0, -3.0)
            .then(&Mat4::rotate(0.5))
            .then(&Mat4::shear(0.25, 0.0))
            .then(&Mat4::scale_xy(2.0, 0.5));
        let d = t.decompose_2d();
        assert!(approx_eq(d.translation.0, 5.0));
        assert!(approx_eq(d.translation.1, -3.0));
        assert!(approx_eq(d.rotation, 0.5));
        assert!(approx_eq(d.scale.0, 2.0));
        assert!(approx_eq(d.scale.1, 0.5));
        assert!(approx_eq(d.skew_x, 0.25));
    }

    #[test]
    fn test_rows() {
        let rows = Mat4::translate(1.0, 2.0).rows();
        assert_eq!(rows[0], [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(rows[1], [0.0, 1.0, 0.0, 2.0]);
        assert_eq!(rows[2], [0.0, 0.0, 1.0, 0.0]);
        assert_eq!(rows[3], [0.0, 0.0, 0.0, 1.0]);
    }
}
