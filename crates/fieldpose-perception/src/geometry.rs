//! Planar and spatial rigid-body geometry.
//!
//! Field poses are 2-D ([`Pose2d`]); the detector reports full 3-D
//! camera-to-target transforms ([`Transform3d`]) which are flattened to the
//! floor plane with [`Transform3d::to_transform2d`] before use.
//!
//! Conventions: metres, counter-clockwise positive angles, radians inside
//! the types.  [`Rotation2d`] serialises as degrees so configuration files
//! stay readable.
//!
//! # Example
//!
//! ```rust
//! use fieldpose_perception::geometry::{Pose2d, Rotation2d, Transform2d, Translation2d};
//!
//! // Robot at (2, 1) facing +Y; camera 0.5 m ahead of robot centre.
//! let robot = Pose2d::new(Translation2d::new(2.0, 1.0), Rotation2d::from_degrees(90.0));
//! let mount = Transform2d::new(Translation2d::new(0.5, 0.0), Rotation2d::identity());
//!
//! let camera = robot.transform_by(mount);
//! assert!((camera.translation.x - 2.0).abs() < 1e-9);
//! assert!((camera.translation.y - 1.5).abs() < 1e-9);
//!
//! // Undo the mount offset to get back to the robot centre.
//! let back = camera.transform_by(mount.inverse());
//! assert!((back.translation.y - 1.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ────────────────────────────────────────────────────────────────────────────
// Angles
// ────────────────────────────────────────────────────────────────────────────

/// Wrap `input` into the half-open interval `[min, max)`.
pub fn input_modulus(input: f64, min: f64, max: f64) -> f64 {
    let modulus = max - min;
    min + (input - min).rem_euclid(modulus)
}

/// Shortest signed difference `a − b` in degrees, wrapped to `[-180, 180)`.
pub fn angle_difference_degrees(a: f64, b: f64) -> f64 {
    input_modulus(a - b, -180.0, 180.0)
}

/// A planar rotation (heading).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rotation2d {
    radians: f64,
}

impl Rotation2d {
    pub fn from_radians(radians: f64) -> Self {
        Self { radians }
    }

    pub fn from_degrees(degrees: f64) -> Self {
        Self::from_radians(degrees.to_radians())
    }

    /// No rotation.
    pub fn identity() -> Self {
        Self::from_radians(0.0)
    }

    pub fn radians(self) -> f64 {
        self.radians
    }

    pub fn degrees(self) -> f64 {
        self.radians.to_degrees()
    }

    pub fn cos(self) -> f64 {
        self.radians.cos()
    }

    pub fn sin(self) -> f64 {
        self.radians.sin()
    }

    /// Rotate by `other` (angles add).
    pub fn plus(self, other: Self) -> Self {
        Self::from_radians(self.radians + other.radians)
    }

    pub fn minus(self, other: Self) -> Self {
        Self::from_radians(self.radians - other.radians)
    }

    pub fn inverse(self) -> Self {
        Self::from_radians(-self.radians)
    }
}

impl Serialize for Rotation2d {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.degrees())
    }
}

impl<'de> Deserialize<'de> for Rotation2d {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Rotation2d::from_degrees)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Planar types
// ────────────────────────────────────────────────────────────────────────────

/// A 2-D translation in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation2d {
    pub x: f64,
    pub y: f64,
}

impl Translation2d {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Euclidean length.
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Self) -> f64 {
        self.minus(other).norm()
    }

    /// Rotate this vector counter-clockwise by `rotation`.
    pub fn rotate_by(self, rotation: Rotation2d) -> Self {
        let (s, c) = (rotation.sin(), rotation.cos());
        Self::new(self.x * c - self.y * s, self.x * s + self.y * c)
    }

    pub fn plus(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }

    pub fn minus(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }

    pub fn scale(self, k: f64) -> Self {
        Self::new(self.x * k, self.y * k)
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// A field-relative (or frame-relative) 2-D pose: position plus heading.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

impl Pose2d {
    pub fn new(translation: Translation2d, rotation: Rotation2d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Convenience constructor from `x`, `y` in metres and heading in degrees.
    pub fn from_xy_degrees(x: f64, y: f64, heading_deg: f64) -> Self {
        Self::new(Translation2d::new(x, y), Rotation2d::from_degrees(heading_deg))
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Apply `transform`, expressed in this pose's local frame.
    pub fn transform_by(self, transform: Transform2d) -> Self {
        Self::new(
            self.translation
                .plus(transform.translation.rotate_by(self.rotation)),
            self.rotation.plus(transform.rotation),
        )
    }

    /// Express this pose in the frame of `origin`.
    pub fn relative_to(self, origin: Self) -> Self {
        let t = Transform2d::between(origin, self);
        Self::new(t.translation, t.rotation)
    }

    pub fn is_finite(self) -> bool {
        self.translation.is_finite() && self.rotation.radians().is_finite()
    }
}

/// A 2-D rigid transform: translation then rotation, in the source frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform2d {
    pub translation: Translation2d,
    pub rotation: Rotation2d,
}

impl Transform2d {
    pub fn new(translation: Translation2d, rotation: Rotation2d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// The transform that maps `initial` onto `last`.
    pub fn between(initial: Pose2d, last: Pose2d) -> Self {
        Self::new(
            last.translation
                .minus(initial.translation)
                .rotate_by(initial.rotation.inverse()),
            last.rotation.minus(initial.rotation),
        )
    }

    pub fn inverse(self) -> Self {
        Self::new(
            self.translation.neg().rotate_by(self.rotation.inverse()),
            self.rotation.inverse(),
        )
    }

    /// `self` applied first, then `other`.
    pub fn compose(self, other: Self) -> Self {
        let pose = Pose2d::identity().transform_by(self).transform_by(other);
        Self::new(pose.translation, pose.rotation)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Spatial types
// ────────────────────────────────────────────────────────────────────────────

/// A 3-D translation vector in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Translation3d {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Translation3d {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }

    pub fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }

    /// Drop the vertical component.
    pub fn to_translation2d(self) -> Translation2d {
        Translation2d::new(self.x, self.y)
    }
}

/// A unit quaternion (w, x, y, z convention).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    /// The caller is responsible for providing a unit quaternion.
    pub fn new(w: f64, x: f64, y: f64, z: f64) -> Self {
        Self { w, x, y, z }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 0.0)
    }

    /// Hamilton product.
    pub fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y - self.x * rhs.z + self.y * rhs.w + self.z * rhs.x,
            self.w * rhs.z + self.x * rhs.y - self.y * rhs.x + self.z * rhs.w,
        )
    }

    /// Conjugate (== inverse for a unit quaternion).
    pub fn conjugate(self) -> Self {
        Self::new(self.w, -self.x, -self.y, -self.z)
    }

    /// Rotate a vector: p' = q * p * q*.
    pub fn rotate(self, v: Translation3d) -> Translation3d {
        let p = Self::new(0.0, v.x, v.y, v.z);
        let rotated = self.mul(p).mul(self.conjugate());
        Translation3d::new(rotated.x, rotated.y, rotated.z)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// A 3-D rotation backed by a unit quaternion.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation3d {
    pub quaternion: Quaternion,
}

impl Rotation3d {
    pub fn new(quaternion: Quaternion) -> Self {
        Self { quaternion }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// Build from intrinsic roll (X), pitch (Y), yaw (Z) angles in radians.
    pub fn from_euler(roll: f64, pitch: f64, yaw: f64) -> Self {
        let (sr, cr) = (roll * 0.5).sin_cos();
        let (sp, cp) = (pitch * 0.5).sin_cos();
        let (sy, cy) = (yaw * 0.5).sin_cos();
        Self::new(Quaternion::new(
            cr * cp * cy + sr * sp * sy,
            sr * cp * cy - cr * sp * sy,
            cr * sp * cy + sr * cp * sy,
            cr * cp * sy - sr * sp * cy,
        ))
    }

    /// Pure rotation about the vertical axis.
    pub fn from_yaw(yaw: f64) -> Self {
        Self::from_euler(0.0, 0.0, yaw)
    }

    /// Rotation about the vertical axis, in radians.
    pub fn yaw(self) -> f64 {
        let q = self.quaternion;
        (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z))
    }

    pub fn inverse(self) -> Self {
        Self::new(self.quaternion.conjugate())
    }

    /// Flatten to a planar heading (yaw only).
    pub fn to_rotation2d(self) -> Rotation2d {
        Rotation2d::from_radians(self.yaw())
    }
}

/// A rigid-body 3-D transform: rotate a point, then add `translation`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Transform3d {
    pub translation: Translation3d,
    pub rotation: Rotation3d,
}

impl Transform3d {
    pub fn new(translation: Translation3d, rotation: Rotation3d) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    pub fn identity() -> Self {
        Self::default()
    }

    /// If `self` = T_A_B and `other` = T_B_C, the result is T_A_C.
    pub fn compose(self, other: Self) -> Self {
        let q = self.rotation.quaternion;
        let translated = self.translation.add(q.rotate(other.translation));
        let rotated = q.mul(other.rotation.quaternion);
        Self::new(translated, Rotation3d::new(rotated))
    }

    pub fn inverse(self) -> Self {
        let inv = self.rotation.inverse();
        Self::new(inv.quaternion.rotate(self.translation).neg(), inv)
    }

    /// Project onto the floor plane: keep `x`, `y` and the yaw component.
    pub fn to_transform2d(self) -> Transform2d {
        Transform2d::new(
            self.translation.to_translation2d(),
            self.rotation.to_rotation2d(),
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
