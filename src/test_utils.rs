use crate::geometry::{Pose, Transform};
use crate::renderable::{PoseBinding, Renderable};
use crate::time::Nanos;
use crate::FrameIdString;
use glam::{DQuat, DVec3};

pub fn translation(x: f64, y: f64, z: f64) -> Transform {
    Transform::from_translation(DVec3::new(x, y, z))
}

pub fn yaw_degrees(degrees: f64) -> Transform {
    Transform::new(DVec3::ZERO, DQuat::from_rotation_z(degrees.to_radians()))
}

/// Minimal renderable for exercising the pose-update protocol.
pub struct TestEntity {
    pub binding: PoseBinding,
    /// Simulates an entity that was never given a pose.
    pub unbound: bool,
    pub visible: bool,
    pub hidden: bool,
    pub world_pose: Option<Pose>,
    path: Vec<String>,
}

impl TestEntity {
    pub fn new(frame: &str, timestamp: Nanos) -> Self {
        TestEntity {
            binding: PoseBinding {
                frame_id: FrameIdString::from(frame).unwrap(),
                timestamp,
                local_pose: Pose::IDENTITY,
                frame_locked: false,
            },
            unbound: false,
            visible: true,
            hidden: false,
            world_pose: None,
            path: vec!["topics".to_string(), format!("/{frame}")],
        }
    }
}

impl Renderable for TestEntity {
    fn binding(&self) -> Option<&PoseBinding> {
        (!self.unbound).then_some(&self.binding)
    }

    fn settings_path(&self) -> &[String] {
        &self.path
    }

    fn visible(&self) -> bool {
        self.visible
    }

    fn set_world_pose(&mut self, pose: Pose) {
        self.world_pose = Some(pose);
        self.hidden = false;
    }

    fn set_hidden(&mut self) {
        self.hidden = true;
    }
}
