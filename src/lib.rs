//! Coordinate-frame transform tree with temporal pose resolution for
//! tick-driven 3D scene rendering: per-frame bounded transform history,
//! dual-time pose queries joined at a fixed frame, a pose-update protocol
//! for renderables, and render-frame selection with camera follow modes.

pub mod error;
pub mod frame;
pub mod geometry;
pub mod renderable;
pub mod selection;
pub mod sink;
pub mod time;
pub mod tree;

#[cfg(test)]
mod test_utils;

use arrayvec::ArrayString;

/// Frame identifier strings.
pub type FrameIdString = ArrayString<64>;

/// Fallible frame id conversion: oversized ids are rejected, not truncated.
pub fn frame_id(id: &str) -> error::TransformResult<FrameIdString> {
    FrameIdString::from(id).map_err(|_| error::TransformError::FrameIdTooLong(id.to_string()))
}

pub use error::{TransformError, TransformResult};
pub use frame::{CoordinateFrame, TimedSample, DEFAULT_MAX_CAPACITY_PER_FRAME};
pub use geometry::{percent_of, quat_from_euler_degrees, Pose, Transform};
pub use renderable::{
    missing_transform_message, update_pose, update_poses, PoseBinding, Renderable,
};
pub use selection::{
    follow_frame_path, FollowController, FollowMode, FrameSelector, SelectionState,
};
pub use sink::{
    ErrorSink, Path, BUFFER_AT_CAPACITY, CYCLE_DETECTED, FRAME_NOT_FOUND, MISSING_TRANSFORM,
    NO_FRAME_SELECTED,
};
pub use time::{Nanos, MAX_DURATION};
pub use tree::{
    transforms_path, AddEdgeResult, FrameListEntry, TransformTree, PREFERRED_FOLLOW_FRAMES,
};
