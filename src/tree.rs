use crate::error::{TransformError, TransformResult};
use crate::frame::{CoordinateFrame, DEFAULT_MAX_CAPACITY_PER_FRAME};
use crate::geometry::{Pose, Transform};
use crate::sink::{ErrorSink, Path, BUFFER_AT_CAPACITY, CYCLE_DETECTED};
use crate::time::Nanos;
use crate::{frame_id, FrameIdString};
use std::collections::BTreeMap;

/// Conventional frame names preferred by the default-follow-frame heuristic,
/// checked in this order (REP-105 naming).
pub const PREFERRED_FOLLOW_FRAMES: [&str; 4] = ["base_link", "odom", "map", "earth"];

/// Ancestor walks bail out after this many hops. The ingestion path refuses
/// cycles, so this is a backstop, not a policy.
const MAX_TREE_DEPTH: usize = 256;

/// Outcome of feeding one transform edge into the tree. `Updated` is what
/// callers forward as their "graph changed" notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddEdgeResult {
    /// The graph or a sample buffer changed.
    Updated,
    /// Exact duplicate of an existing sample; nothing changed.
    Unchanged,
}

impl AddEdgeResult {
    pub fn updated(self) -> bool {
        self == AddEdgeResult::Updated
    }
}

/// One row of the UI frame list: the frame id plus a depth-indented label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameListEntry {
    pub label: String,
    pub id: FrameIdString,
}

/// Settings path under which per-frame ingestion diagnostics (cycles, full
/// buffers) are published.
pub fn transforms_path(frame_id: &str) -> Path {
    vec![
        "transforms".to_string(),
        CoordinateFrame::display_name_of(frame_id),
    ]
}

/// A registry of coordinate frames forming a tree, with time-varying edges.
/// Frames are created lazily when first referenced; each frame holds at most
/// one parent at a time, stored as an id and resolved through this registry.
#[derive(Debug, Clone)]
pub struct TransformTree {
    frames: BTreeMap<FrameIdString, CoordinateFrame>,
    max_capacity_per_frame: usize,
}

impl Default for TransformTree {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformTree {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY_PER_FRAME)
    }

    /// A tree whose frames each retain at most `max_capacity_per_frame`
    /// samples.
    pub fn with_capacity(max_capacity_per_frame: usize) -> Self {
        TransformTree {
            frames: BTreeMap::new(),
            max_capacity_per_frame: max_capacity_per_frame.max(1),
        }
    }

    pub fn has_frame(&self, id: &str) -> bool {
        self.frames.contains_key(id)
    }

    pub fn frame(&self, id: &str) -> Option<&CoordinateFrame> {
        self.frames.get(id)
    }

    /// Mutable access, used by interactive settings edits (manual offsets).
    pub fn frame_mut(&mut self, id: &str) -> Option<&mut CoordinateFrame> {
        self.frames.get_mut(id)
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> impl Iterator<Item = &CoordinateFrame> {
        self.frames.values()
    }

    /// Idempotent creation: referencing an id brings the frame into
    /// existence, parentless until an edge names its parent.
    pub fn get_or_create_frame(&mut self, id: &str) -> TransformResult<&mut CoordinateFrame> {
        let key = frame_id(id)?;
        Ok(self.ensure_frame(key))
    }

    fn ensure_frame(&mut self, id: FrameIdString) -> &mut CoordinateFrame {
        let capacity = self.max_capacity_per_frame;
        self.frames
            .entry(id)
            .or_insert_with(|| CoordinateFrame::new(id, capacity))
    }

    /// Ingest one `(parent, child, time, transform)` edge. Frame ids must be
    /// pre-normalized by the caller. Re-parenting replaces the previous
    /// parent (clearing that frame's history); a would-be cycle is rejected
    /// with an error and reported. Capacity overflow is reported once per
    /// frame via `sink`.
    pub fn add_edge(
        &mut self,
        child: &str,
        parent: &str,
        time: Nanos,
        transform: Transform,
        sink: &mut ErrorSink,
    ) -> TransformResult<AddEdgeResult> {
        let child_id = frame_id(child)?;
        let parent_id = frame_id(parent)?;

        let mut updated = !self.frames.contains_key(child_id.as_str());
        let needs_parent = self.ensure_frame(child_id).parent_id() != Some(parent_id);

        if needs_parent {
            if self.would_create_cycle(child, parent) {
                sink.add(
                    &transforms_path(child),
                    CYCLE_DETECTED,
                    format!(
                        "transform {} -> {} would create a cycle and was ignored",
                        CoordinateFrame::display_name_of(parent),
                        CoordinateFrame::display_name_of(child),
                    ),
                );
                return Err(TransformError::CycleDetected(child.to_string()));
            }
            self.ensure_frame(parent_id);
            if let Some(frame) = self.frames.get_mut(child_id.as_str()) {
                frame.set_parent(parent_id);
            }
            updated = true;
        }

        let outcome = match self.frames.get_mut(child_id.as_str()) {
            Some(frame) => frame.insert(time, transform),
            None => return Err(TransformError::FrameNotFound(child.to_string())),
        };
        if outcome.first_overflow {
            sink.add(
                &transforms_path(child),
                BUFFER_AT_CAPACITY,
                format!(
                    "transform history for {} is full ({} samples); oldest samples are dropped",
                    CoordinateFrame::display_name_of(child),
                    self.max_capacity_per_frame,
                ),
            );
        }

        Ok(if updated || outcome.changed {
            AddEdgeResult::Updated
        } else {
            AddEdgeResult::Unchanged
        })
    }

    fn would_create_cycle(&self, child: &str, parent: &str) -> bool {
        if child == parent {
            return true;
        }
        // Walk up from the prospective parent; crossing the child means the
        // new edge would close a loop.
        let mut cur = self.frames.get(parent).and_then(|f| f.parent());
        for _ in 0..MAX_TREE_DEPTH {
            match cur {
                Some(id) if id == child => return true,
                Some(id) => cur = self.frames.get(id).and_then(|f| f.parent()),
                None => return false,
            }
        }
        true
    }

    /// Remove the sample at `time` from the `parent`->`child` edge, pruning
    /// frames left with no history and no children. Does nothing if the
    /// child does not exist or has a different parent.
    pub fn remove_edge_sample(&mut self, child: &str, parent: &str, time: Nanos) -> bool {
        let Some(frame) = self.frames.get_mut(child) else {
            return false;
        };
        if frame.parent() != Some(parent) {
            return false;
        }
        let start = frame.id_string();
        let removed = frame.remove_sample_at(time);
        if removed {
            // Walk upward from the child, deleting frames left with no
            // history and no children.
            let mut current = Some(start);
            let mut hops = 0;
            while let Some(id) = current {
                hops += 1;
                if hops > MAX_TREE_DEPTH || !self.is_prunable(id.as_str()) {
                    break;
                }
                let parent_id = self.frames.get(id.as_str()).and_then(|f| f.parent_id());
                self.frames.remove(id.as_str());
                current = parent_id;
            }
        }
        removed
    }

    fn is_prunable(&self, id: &str) -> bool {
        match self.frames.get(id) {
            Some(frame) => {
                frame.samples_len() == 0 && !self.frames.values().any(|f| f.parent() == Some(id))
            }
            None => false,
        }
    }

    /// Full scene reset. Frame identities are re-created by the surrounding
    /// system's immediate re-ingestion.
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Drop every sample newer than `time` from every frame (seeking
    /// backward through a recording).
    pub fn clear_after(&mut self, time: Nanos) {
        for frame in self.frames.values_mut() {
            frame.remove_samples_after(time);
        }
    }

    /// The rootless ancestor of `id`, or `None` if the frame is unknown (or
    /// the walk trips the depth backstop).
    pub fn root_of(&self, id: &str) -> Option<&str> {
        self.root_frame(id).map(CoordinateFrame::id)
    }

    fn root_frame(&self, id: &str) -> Option<&CoordinateFrame> {
        let mut cur = self.frames.get(id)?;
        for _ in 0..MAX_TREE_DEPTH {
            match cur.parent().and_then(|pid| self.frames.get(pid)) {
                Some(parent) => cur = parent,
                None => return Some(cur),
            }
        }
        None
    }

    fn is_strict_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        let mut cur = self.frames.get(descendant).and_then(|f| f.parent());
        for _ in 0..MAX_TREE_DEPTH {
            match cur {
                Some(id) if id == ancestor => return true,
                Some(id) => cur = self.frames.get(id).and_then(|f| f.parent()),
                None => return false,
            }
        }
        false
    }

    /// Composed child-to-`parent` transform at `time`, walking `child` up
    /// the ancestor chain. Fails if any edge lacks a sample within
    /// `max_delta` of `time`.
    fn chain_transform(
        &self,
        parent: &str,
        child: &str,
        time: Nanos,
        max_delta: Nanos,
    ) -> TransformResult<Transform> {
        let not_found = || TransformError::TransformNotFound {
            from: child.to_string(),
            to: parent.to_string(),
        };
        let mut acc = Transform::IDENTITY;
        let mut cur = self
            .frames
            .get(child)
            .ok_or_else(|| TransformError::FrameNotFound(child.to_string()))?;
        for _ in 0..=MAX_TREE_DEPTH {
            if cur.id() == parent {
                return Ok(acc);
            }
            let edge = cur
                .edge_transform_at(time, max_delta)
                .ok_or(TransformError::SampleTimeNotAvailable(time))?;
            // The right-most transform is applied first.
            acc = edge * acc;
            cur = cur
                .parent()
                .and_then(|pid| self.frames.get(pid))
                .ok_or_else(not_found)?;
        }
        Err(not_found())
    }

    /// Resolve the transform carrying poses from `from` into `to` at a
    /// single point in time (`to_T_from`), going up through parents, down
    /// through children, or both via the closest common ancestor.
    pub fn lookup_transform(
        &self,
        to: &str,
        from: &str,
        time: Nanos,
        max_delta: Nanos,
    ) -> TransformResult<Transform> {
        if to == from {
            return Ok(Transform::IDENTITY);
        }
        for id in [to, from] {
            if !self.frames.contains_key(id) {
                return Err(TransformError::FrameNotFound(id.to_string()));
            }
        }
        if self.is_strict_ancestor(to, from) {
            return self.chain_transform(to, from, time, max_delta);
        }
        if self.is_strict_ancestor(from, to) {
            return Ok(self.chain_transform(from, to, time, max_delta)?.inverse());
        }
        // Neither contains the other: go up from `from` until an ancestor
        // of `to` appears, then down into `to`.
        let mut cur = Some(from);
        let mut hops = 0;
        while let Some(cur_id) = cur {
            if self.is_strict_ancestor(cur_id, to) {
                let up = self.chain_transform(cur_id, from, time, max_delta)?;
                let down = self.chain_transform(cur_id, to, time, max_delta)?;
                return Ok(down.inverse() * up);
            }
            cur = self.frames.get(cur_id).and_then(|f| f.parent());
            hops += 1;
            if hops > MAX_TREE_DEPTH {
                break;
            }
        }
        Err(TransformError::TransformNotFound {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    /// Transform a pose from `src` into `dst` at a single point in time.
    /// Returns false (leaving `out` unspecified) when no path resolves;
    /// `lookup_transform` is the error-reporting counterpart.
    pub fn apply_local(
        &self,
        out: &mut Pose,
        input: &Pose,
        dst: &str,
        src: &str,
        time: Nanos,
        max_delta: Nanos,
    ) -> bool {
        if dst == src {
            *out = *input;
            return true;
        }
        match self.lookup_transform(dst, src, time, max_delta) {
            Ok(tf) => {
                *out = tf.transform_pose(input);
                true
            }
            Err(_) => false,
        }
    }

    /// The dual-time resolution every consumer uses: carry `input` from
    /// `src` at `src_time` up into `fixed`, then from `fixed` at `dst_time`
    /// into `dst`. The two time axes are independent and meet only at the
    /// fixed frame, so an entity stamped in the past can be placed in a
    /// render frame evaluated at the current playback time.
    #[allow(clippy::too_many_arguments)]
    pub fn apply(
        &self,
        out: &mut Pose,
        input: &Pose,
        dst: &str,
        fixed: &str,
        src: &str,
        dst_time: Nanos,
        src_time: Nanos,
        max_delta: Nanos,
    ) -> bool {
        if src == dst && src_time == dst_time {
            *out = *input;
            return true;
        }
        let mut in_fixed = Pose::IDENTITY;
        if !self.apply_local(&mut in_fixed, input, fixed, src, src_time, max_delta) {
            return false;
        }
        self.apply_local(out, &in_fixed, dst, fixed, dst_time, max_delta)
    }

    /// Heuristically most useful frame to follow: a conventionally named
    /// frame if present, otherwise the root owning the most frames
    /// (lexicographically first root on ties).
    pub fn default_follow_frame(&self) -> Option<FrameIdString> {
        for preferred in PREFERRED_FOLLOW_FRAMES {
            if let Some(frame) = self.frames.get(preferred) {
                return Some(frame.id_string());
            }
        }

        let mut counts: BTreeMap<FrameIdString, usize> = BTreeMap::new();
        for id in self.frames.keys() {
            if let Some(root) = self.root_frame(id.as_str()) {
                *counts.entry(root.id_string()).or_insert(0) += 1;
            }
        }
        let mut best: Option<(FrameIdString, usize)> = None;
        for (root, count) in counts {
            if best.as_ref().map_or(true, |(_, c)| count > *c) {
                best = Some((root, count));
            }
        }
        best.map(|(root, _)| root)
    }

    /// Flat, depth-indented frame list for UI dropdowns: roots first,
    /// siblings sorted by id.
    pub fn frame_list(&self) -> Vec<FrameListEntry> {
        let mut children: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        let mut roots: Vec<&str> = Vec::new();
        for frame in self.frames.values() {
            match frame.parent() {
                Some(parent) if self.frames.contains_key(parent) => {
                    children.entry(parent).or_default().push(frame.id());
                }
                _ => roots.push(frame.id()),
            }
        }

        fn push_subtree(
            out: &mut Vec<FrameListEntry>,
            frames: &BTreeMap<FrameIdString, CoordinateFrame>,
            children: &BTreeMap<&str, Vec<&str>>,
            id: &str,
            depth: usize,
        ) {
            if depth > MAX_TREE_DEPTH {
                return;
            }
            let Some(frame) = frames.get(id) else {
                return;
            };
            out.push(FrameListEntry {
                label: format!(
                    "{}{}",
                    "  ".repeat(depth),
                    CoordinateFrame::display_name_of(id)
                ),
                id: frame.id_string(),
            });
            if let Some(kids) = children.get(id) {
                for kid in kids {
                    push_subtree(out, frames, children, kid, depth + 1);
                }
            }
        }

        let mut out = Vec::with_capacity(self.frames.len());
        for root in roots {
            push_subtree(&mut out, &self.frames, &children, root, 0);
        }
        out
    }
}
