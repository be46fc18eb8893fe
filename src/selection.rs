use crate::error::TransformResult;
use crate::frame::CoordinateFrame;
use crate::geometry::Pose;
use crate::sink::{ErrorSink, Path, FRAME_NOT_FOUND, NO_FRAME_SELECTED};
use crate::time::Nanos;
use crate::tree::TransformTree;
use crate::{frame_id, FrameIdString};
use glam::DVec3;

/// Settings path under which frame-selection diagnostics are published.
pub fn follow_frame_path() -> Path {
    vec!["general".to_string(), "followFrame".to_string()]
}

/// How the current render frame was chosen.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    /// The graph holds no frames; nothing can be rendered.
    #[default]
    NoFrame,
    /// An explicitly configured follow frame that exists in the graph.
    Following(FrameIdString),
    /// A frame chosen by the default heuristic.
    Heuristic(FrameIdString),
}

impl SelectionState {
    pub fn render_frame(&self) -> Option<&str> {
        match self {
            SelectionState::NoFrame => None,
            SelectionState::Following(id) | SelectionState::Heuristic(id) => Some(id.as_str()),
        }
    }
}

/// Chooses the render and fixed frames each tick. The state is re-derived
/// from the graph every tick rather than patched incrementally; the
/// stability rule only suppresses redundant re-runs of the heuristic.
#[derive(Debug, Default, Clone)]
pub struct FrameSelector {
    follow_frame: Option<FrameIdString>,
    state: SelectionState,
    fixed_frame: Option<FrameIdString>,
    prev_frame_count: usize,
}

impl FrameSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure (or clear) the explicit follow frame. Takes effect on the
    /// next `select`.
    pub fn set_follow_frame(&mut self, id: Option<&str>) -> TransformResult<()> {
        self.follow_frame = match id {
            Some(id) => Some(frame_id(id)?),
            None => None,
        };
        Ok(())
    }

    pub fn follow_frame(&self) -> Option<&str> {
        self.follow_frame.as_deref()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn render_frame(&self) -> Option<&str> {
        self.state.render_frame()
    }

    /// Root of the current render frame; the stable world reference.
    pub fn fixed_frame(&self) -> Option<&str> {
        self.fixed_frame.as_deref()
    }

    /// Re-evaluate the selection for this tick.
    pub fn select(&mut self, tree: &TransformTree, sink: &mut ErrorSink) -> &SelectionState {
        let path = follow_frame_path();
        let frame_count = tree.frame_count();

        if frame_count == 0 {
            self.state = SelectionState::NoFrame;
            self.fixed_frame = None;
            self.prev_frame_count = 0;
            sink.remove(&path, FRAME_NOT_FOUND);
            sink.add(&path, NO_FRAME_SELECTED, "no coordinate frames found");
            return &self.state;
        }
        sink.remove(&path, NO_FRAME_SELECTED);

        match self.follow_frame {
            Some(follow) if tree.has_frame(follow.as_str()) => {
                sink.remove(&path, FRAME_NOT_FOUND);
                if self.state.render_frame() != Some(follow.as_str()) {
                    log::debug!(
                        "following frame {}",
                        CoordinateFrame::display_name_of(follow.as_str())
                    );
                }
                self.state = SelectionState::Following(follow);
            }
            Some(follow) => {
                // Configured but absent: report, then keep rendering with
                // the heuristic choice rather than going blank.
                sink.add(
                    &path,
                    FRAME_NOT_FOUND,
                    format!(
                        "configured follow frame {} not found",
                        CoordinateFrame::display_name_of(follow.as_str())
                    ),
                );
                self.reselect_heuristic(tree, frame_count);
            }
            None => {
                sink.remove(&path, FRAME_NOT_FOUND);
                self.reselect_heuristic(tree, frame_count);
            }
        }

        self.prev_frame_count = frame_count;
        self.fixed_frame = self
            .state
            .render_frame()
            .and_then(|render| tree.root_of(render))
            .and_then(|root| tree.frame(root))
            .map(|frame| frame.id_string());
        &self.state
    }

    fn reselect_heuristic(&mut self, tree: &TransformTree, frame_count: usize) {
        let current = match &self.state {
            SelectionState::NoFrame => None,
            SelectionState::Following(id) | SelectionState::Heuristic(id) => Some(*id),
        };
        // Stability: keep the current frame unless it vanished or the set of
        // frames changed under us.
        if let Some(id) = current {
            if frame_count == self.prev_frame_count && tree.has_frame(id.as_str()) {
                self.state = SelectionState::Heuristic(id);
                return;
            }
        }
        self.state = match tree.default_follow_frame() {
            Some(id) => {
                log::debug!(
                    "default frame heuristic selected {}",
                    CoordinateFrame::display_name_of(id.as_str())
                );
                SelectionState::Heuristic(id)
            }
            None => SelectionState::NoFrame,
        };
    }
}

/// Camera behavior relative to the render frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FollowMode {
    /// Rigid: the camera rides the render frame, rotating and translating
    /// with it.
    #[default]
    Pose,
    /// The camera translates with the render frame but its orientation
    /// stays fixed relative to the fixed frame.
    Position,
    /// The camera stays where it was in the fixed frame.
    Stationary,
}

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    /// Pose of the render frame in the fixed frame when following stopped.
    pose: Pose,
    render_frame: FrameIdString,
    fixed_frame: FrameIdString,
}

/// Maintains the follow snapshot and produces the per-tick camera
/// compensation pose. The compensation is expressed in the render frame and
/// is the identity while rigidly following, so mode changes are seamless at
/// the moment they happen.
#[derive(Debug, Default, Clone)]
pub struct FollowController {
    mode: FollowMode,
    snapshot: Option<Snapshot>,
    compensation: Pose,
}

impl FollowController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> FollowMode {
        self.mode
    }

    /// Changing mode drops the snapshot; the next `update` captures a fresh
    /// one where needed.
    pub fn set_mode(&mut self, mode: FollowMode) {
        if mode != self.mode {
            self.mode = mode;
            self.snapshot = None;
            self.compensation = Pose::IDENTITY;
        }
    }

    /// The captured render-frame-in-fixed-frame pose, if any.
    pub fn snapshot_pose(&self) -> Option<Pose> {
        self.snapshot.as_ref().map(|s| s.pose)
    }

    /// Compute this tick's camera compensation. A failed resolution leaves
    /// the previous compensation in place; it is retried naturally next
    /// tick as new samples arrive.
    pub fn update(
        &mut self,
        tree: &TransformTree,
        render_frame: &str,
        fixed_frame: &str,
        current_time: Nanos,
        max_delta: Nanos,
    ) -> Pose {
        if self.mode == FollowMode::Pose {
            self.snapshot = None;
            self.compensation = Pose::IDENTITY;
            return self.compensation;
        }

        let stale = match &self.snapshot {
            Some(s) => {
                s.render_frame.as_str() != render_frame || s.fixed_frame.as_str() != fixed_frame
            }
            None => true,
        };
        if stale {
            let mut pose = Pose::IDENTITY;
            if tree.apply_local(
                &mut pose,
                &Pose::IDENTITY,
                fixed_frame,
                render_frame,
                current_time,
                max_delta,
            ) {
                if let (Ok(render_id), Ok(fixed_id)) =
                    (frame_id(render_frame), frame_id(fixed_frame))
                {
                    self.snapshot = Some(Snapshot {
                        pose,
                        render_frame: render_id,
                        fixed_frame: fixed_id,
                    });
                }
            }
        }

        // Only resolve a snapshot that matches the current frame pair; a
        // stale one (capture failed above) waits for the next tick.
        if let Some(snapshot) = &self.snapshot {
            if snapshot.render_frame.as_str() == render_frame
                && snapshot.fixed_frame.as_str() == fixed_frame
            {
                let mut resolved = Pose::IDENTITY;
                if tree.apply(
                    &mut resolved,
                    &snapshot.pose,
                    render_frame,
                    fixed_frame,
                    fixed_frame,
                    current_time,
                    current_time,
                    max_delta,
                ) {
                    self.compensation = match self.mode {
                        FollowMode::Stationary => resolved,
                        FollowMode::Position => Pose {
                            position: DVec3::ZERO,
                            orientation: resolved.orientation,
                        },
                        FollowMode::Pose => Pose::IDENTITY,
                    };
                }
            }
        }
        self.compensation
    }
}
