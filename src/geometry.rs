use crate::time::Nanos;
use glam::{DMat4, DQuat, DVec3};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Position and orientation of something within a coordinate frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub orientation: DQuat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: DVec3::ZERO,
        orientation: DQuat::IDENTITY,
    };

    pub fn new(position: DVec3, orientation: DQuat) -> Self {
        Pose {
            position,
            orientation: orientation.normalize(),
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::IDENTITY
    }
}

/// A rigid transform: translation plus unit quaternion. Interpolation
/// between two of these stays on the rotation manifold.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    translation: DVec3,
    rotation: DQuat,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: DVec3::ZERO,
        rotation: DQuat::IDENTITY,
    };

    pub fn new(translation: DVec3, rotation: DQuat) -> Self {
        Transform {
            translation,
            rotation: rotation.normalize(),
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Transform {
            translation,
            rotation: DQuat::IDENTITY,
        }
    }

    pub fn from_pose(pose: &Pose) -> Self {
        Transform::new(pose.position, pose.orientation)
    }

    pub fn translation(&self) -> DVec3 {
        self.translation
    }

    pub fn rotation(&self) -> DQuat {
        self.rotation
    }

    pub fn set_translation(&mut self, translation: DVec3) {
        self.translation = translation;
    }

    pub fn set_rotation(&mut self, rotation: DQuat) {
        self.rotation = rotation.normalize();
    }

    pub fn inverse(&self) -> Transform {
        let inv_rotation = self.rotation.inverse();
        Transform {
            translation: -(inv_rotation * self.translation),
            rotation: inv_rotation,
        }
    }

    /// Apply this transform to a pose expressed in the child frame, yielding
    /// the pose expressed in the parent frame.
    pub fn transform_pose(&self, pose: &Pose) -> Pose {
        Pose {
            position: self.rotation * pose.position + self.translation,
            orientation: (self.rotation * pose.orientation).normalize(),
        }
    }

    /// Linear interpolation on translation, shortest-path spherical
    /// interpolation on rotation. `s` is expected in [0, 1].
    pub fn interpolate(a: &Transform, b: &Transform, s: f64) -> Transform {
        Transform {
            translation: a.translation.lerp(b.translation, s),
            rotation: a.rotation.slerp(b.rotation, s).normalize(),
        }
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }

    pub fn from_mat4(mat: &DMat4) -> Transform {
        let (_, rotation, translation) = mat.to_scale_rotation_translation();
        Transform::new(translation, rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Transform::IDENTITY
    }
}

// Composition: the right-most transform is applied first.
impl Mul for Transform {
    type Output = Transform;

    fn mul(self, rhs: Transform) -> Transform {
        Transform {
            translation: self.rotation * rhs.translation + self.translation,
            rotation: (self.rotation * rhs.rotation).normalize(),
        }
    }
}

/// Normalized position of `time` between `lower` and `upper`, clamped to
/// [0, 1]. A zero-width interval maps to 0.
pub fn percent_of(lower: Nanos, upper: Nanos, time: Nanos) -> f64 {
    let span = (upper - lower).as_nanos();
    if span == 0 {
        return 0.0;
    }
    let offset = (time - lower).as_nanos();
    (offset as f64 / span as f64).clamp(0.0, 1.0)
}

/// Quaternion from XYZ Euler angles in degrees, used for manual frame
/// orientation offsets.
pub fn quat_from_euler_degrees(euler_degrees: DVec3) -> DQuat {
    let radians = euler_degrees * std::f64::consts::PI / 180.0;
    DQuat::from_euler(glam::EulerRot::XYZ, radians.x, radians.y, radians.z)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compose_then_invert_is_identity() {
        let tf = Transform::new(
            DVec3::new(1.0, 2.0, 3.0),
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_3),
        );
        let product = tf * tf.inverse();
        assert_relative_eq!(product.translation().x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(product.translation().y, 0.0, epsilon = 1e-12);
        assert_relative_eq!(product.translation().z, 0.0, epsilon = 1e-12);
        assert_relative_eq!(product.rotation().w.abs(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_composition_order() {
        // Rotate 90 degrees around Z, then translate along the parent X axis.
        let rotate = Transform::new(DVec3::ZERO, DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2));
        let translate = Transform::from_translation(DVec3::new(1.0, 0.0, 0.0));
        let combined = translate * rotate;

        let p = combined.transform_pose(&Pose {
            position: DVec3::new(1.0, 0.0, 0.0),
            orientation: DQuat::IDENTITY,
        });
        assert_relative_eq!(p.position.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(p.position.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = Transform::IDENTITY;
        let b = Transform::new(
            DVec3::new(2.0, 0.0, 0.0),
            DQuat::from_rotation_z(std::f64::consts::FRAC_PI_2),
        );
        let mid = Transform::interpolate(&a, &b, 0.5);
        assert_relative_eq!(mid.translation().x, 1.0, epsilon = 1e-12);
        let expected = DQuat::from_rotation_z(std::f64::consts::FRAC_PI_4);
        assert_relative_eq!(mid.rotation().dot(expected).abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_percent_of_clamps() {
        assert_relative_eq!(percent_of(Nanos(0), Nanos(10), Nanos(5)), 0.5);
        assert_relative_eq!(percent_of(Nanos(0), Nanos(10), Nanos(-5)), 0.0);
        assert_relative_eq!(percent_of(Nanos(0), Nanos(10), Nanos(15)), 1.0);
        assert_relative_eq!(percent_of(Nanos(10), Nanos(10), Nanos(10)), 0.0);
    }

    #[test]
    fn test_mat4_round_trip() {
        let tf = Transform::new(
            DVec3::new(-1.0, 0.5, 2.0),
            DQuat::from_rotation_y(0.7),
        );
        let back = Transform::from_mat4(&tf.to_mat4());
        assert_relative_eq!(back.translation().x, -1.0, epsilon = 1e-12);
        assert_relative_eq!(back.rotation().dot(tf.rotation()).abs(), 1.0, epsilon = 1e-12);
    }
}
