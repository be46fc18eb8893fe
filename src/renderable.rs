use crate::frame::CoordinateFrame;
use crate::geometry::Pose;
use crate::sink::{ErrorSink, MISSING_TRANSFORM};
use crate::time::Nanos;
use crate::tree::TransformTree;
use crate::FrameIdString;

/// Where an entity's geometry lives: its source frame, the moment it was
/// produced, and its offset within that frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseBinding {
    pub frame_id: FrameIdString,
    pub timestamp: Nanos,
    pub local_pose: Pose,
    /// When set, the entity rides along with its frame: resolution uses the
    /// current tick time instead of the entity's own timestamp.
    pub frame_locked: bool,
}

/// The contract every visual entity satisfies so the transform engine can
/// place it each tick without knowing what it draws.
pub trait Renderable {
    /// The entity's pose binding. `None` means the entity has not been given
    /// a pose yet; asking the engine to place such an entity is a caller
    /// bug, not a data error.
    fn binding(&self) -> Option<&PoseBinding>;

    /// Settings-tree path under which this entity's diagnostics appear.
    fn settings_path(&self) -> &[String];

    fn visible(&self) -> bool;

    /// Resolved placement in the render frame.
    fn set_world_pose(&mut self, pose: Pose);

    /// Called instead of `set_world_pose` when resolution fails.
    fn set_hidden(&mut self);
}

/// Message for a failed resolution, distinguishing the identity case, the
/// single-chain case (render frame is the fixed frame), and the fixed-frame
/// leg by comparing frame ids.
pub fn missing_transform_message(render_frame: &str, fixed_frame: &str, src_frame: &str) -> String {
    let src = CoordinateFrame::display_name_of(src_frame);
    if src_frame == render_frame {
        format!("identity transform lookup failed for frame {src} (no sample at the requested times)")
    } else if render_frame == fixed_frame {
        format!(
            "missing transform from frame {src} to frame {}",
            CoordinateFrame::display_name_of(render_frame)
        )
    } else {
        format!(
            "missing transform from frame {src} to fixed frame {}",
            CoordinateFrame::display_name_of(fixed_frame)
        )
    }
}

/// Resolve one entity's pose into the render frame for this tick. On success
/// the entity is placed and its missing-transform diagnostic cleared; on
/// failure it is hidden and exactly one diagnostic is published at its
/// settings path. Invisible entities are skipped (and their diagnostic
/// cleared). Returns whether the entity was placed.
///
/// Panics if the entity has no pose binding; that is a programming-contract
/// violation, not a recoverable data error.
pub fn update_pose<'e>(
    entity: &mut (dyn Renderable + 'e),
    tree: &TransformTree,
    render_frame: &str,
    fixed_frame: &str,
    current_time: Nanos,
    max_delta: Nanos,
    sink: &mut ErrorSink,
) -> bool {
    if !entity.visible() {
        let path = entity.settings_path().to_vec();
        sink.remove(&path, MISSING_TRANSFORM);
        return false;
    }

    let binding = *entity
        .binding()
        .expect("update_pose called on a renderable with no pose binding");
    let src_time = if binding.frame_locked {
        current_time
    } else {
        binding.timestamp
    };

    let mut world = Pose::IDENTITY;
    let resolved = tree.apply(
        &mut world,
        &binding.local_pose,
        render_frame,
        fixed_frame,
        binding.frame_id.as_str(),
        current_time,
        src_time,
        max_delta,
    );

    let path = entity.settings_path().to_vec();
    if resolved {
        entity.set_world_pose(world);
        sink.remove(&path, MISSING_TRANSFORM);
        true
    } else {
        entity.set_hidden();
        let message =
            missing_transform_message(render_frame, fixed_frame, binding.frame_id.as_str());
        sink.add(&path, MISSING_TRANSFORM, message);
        false
    }
}

/// Run the pose-update protocol over every tracked entity. Failures hide the
/// affected entity and never abort the pass. Returns how many entities were
/// placed.
pub fn update_poses<'a, 'e: 'a>(
    entities: impl IntoIterator<Item = &'a mut (dyn Renderable + 'e)>,
    tree: &TransformTree,
    render_frame: &str,
    fixed_frame: &str,
    current_time: Nanos,
    max_delta: Nanos,
    sink: &mut ErrorSink,
) -> usize {
    let mut placed = 0;
    for entity in entities {
        if update_pose(
            entity,
            tree,
            render_frame,
            fixed_frame,
            current_time,
            max_delta,
            sink,
        ) {
            placed += 1;
        }
    }
    placed
}
