use crate::geometry::{percent_of, quat_from_euler_degrees, Transform};
use crate::time::Nanos;
use crate::FrameIdString;
use glam::DVec3;

/// Default bound on the number of transform samples retained per frame.
/// Larger values give renderables a deeper history to resolve against at the
/// cost of memory and insert time; how much wall-clock history that covers
/// depends entirely on the publish rate of the edge.
pub const DEFAULT_MAX_CAPACITY_PER_FRAME: usize = 5_000;

/// A timestamped transform sample relating this frame to its parent.
pub type TimedSample = (Nanos, Transform);

#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct InsertOutcome {
    /// Whether the buffer content changed (false for an exact duplicate).
    pub changed: bool,
    /// Set on the insert that first pushed the buffer over capacity.
    pub first_overflow: bool,
}

/// A named 3D coordinate frame with an optional parent and a bounded,
/// time-ordered history of transforms from this frame to its parent. The
/// parent/child hierarchy and the history let poses be carried between
/// frames while interpolating over time.
#[derive(Debug, Clone)]
pub struct CoordinateFrame {
    id: FrameIdString,
    parent: Option<FrameIdString>,
    samples: Vec<TimedSample>,
    max_capacity: usize,
    at_capacity: bool,
    /// Manual translation override, composed onto every resolved edge
    /// transform. Does not consume buffer capacity.
    pub offset_position: Option<DVec3>,
    /// Manual XYZ Euler (degrees) orientation override, composed onto every
    /// resolved edge transform.
    pub offset_euler_degrees: Option<DVec3>,
}

impl CoordinateFrame {
    pub(crate) fn new(id: FrameIdString, max_capacity: usize) -> Self {
        CoordinateFrame {
            id,
            parent: None,
            samples: Vec::new(),
            max_capacity: max_capacity.max(1),
            at_capacity: false,
            offset_position: None,
            offset_euler_degrees: None,
        }
    }

    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    pub(crate) fn id_string(&self) -> FrameIdString {
        self.id
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn parent_id(&self) -> Option<FrameIdString> {
        self.parent
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn samples_len(&self) -> usize {
        self.samples.len()
    }

    /// Sticky: once the buffer has evicted a sample this stays set until the
    /// tree is reset.
    pub fn at_capacity(&self) -> bool {
        self.at_capacity
    }

    pub fn earliest(&self) -> Option<&TimedSample> {
        self.samples.first()
    }

    pub fn latest(&self) -> Option<&TimedSample> {
        self.samples.last()
    }

    /// Set the parent frame. Changing to a different parent invalidates the
    /// recorded history, which related this frame to the old parent.
    pub(crate) fn set_parent(&mut self, parent: FrameIdString) {
        if self.parent.is_some_and(|prev| prev != parent) {
            self.samples.clear();
        }
        self.parent = Some(parent);
    }

    /// Insert or overwrite the sample at `time`. Out-of-order insertion is
    /// supported; the buffer stays sorted. Returns whether the content
    /// changed and whether this insert first exceeded capacity (the caller
    /// publishes the overflow diagnostic).
    pub(crate) fn insert(&mut self, time: Nanos, transform: Transform) -> InsertOutcome {
        match self.samples.binary_search_by_key(&time, |(t, _)| *t) {
            Ok(index) => {
                if self.samples[index].1 == transform {
                    return InsertOutcome {
                        changed: false,
                        first_overflow: false,
                    };
                }
                self.samples[index].1 = transform;
                InsertOutcome {
                    changed: true,
                    first_overflow: false,
                }
            }
            Err(index) => {
                self.samples.insert(index, (time, transform));
                let mut first_overflow = false;
                if self.samples.len() > self.max_capacity {
                    self.samples.remove(0);
                    if !self.at_capacity {
                        self.at_capacity = true;
                        first_overflow = true;
                        log::warn!(
                            "transform history for frame {} reached capacity ({}), evicting oldest samples",
                            self.display_name(),
                            self.max_capacity
                        );
                    }
                }
                InsertOutcome {
                    changed: true,
                    first_overflow,
                }
            }
        }
    }

    /// Remove the sample at exactly `time`. Returns whether one was removed.
    pub(crate) fn remove_sample_at(&mut self, time: Nanos) -> bool {
        match self.samples.binary_search_by_key(&time, |(t, _)| *t) {
            Ok(index) => {
                self.samples.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Remove all samples with timestamps strictly greater than `time`
    /// (seek-backward support).
    pub(crate) fn remove_samples_after(&mut self, time: Nanos) {
        let keep = self.samples.partition_point(|(t, _)| *t <= time);
        self.samples.truncate(keep);
    }

    /// Find the two samples bracketing `time`. An exact hit yields an
    /// empty-width bracket. Outside the recorded range the nearest sample is
    /// used as both ends iff the gap is within `max_delta`; otherwise the
    /// search fails (bounded extrapolation).
    pub fn find_bracket(&self, time: Nanos, max_delta: Nanos) -> Option<(TimedSample, TimedSample)> {
        let first = *self.samples.first()?;
        let last = *self.samples.last()?;

        if time < first.0 {
            return (first.0.abs_diff(time) <= max_delta).then_some((first, first));
        }
        if time > last.0 {
            return (time.abs_diff(last.0) <= max_delta).then_some((last, last));
        }

        match self.samples.binary_search_by_key(&time, |(t, _)| *t) {
            Ok(index) => {
                let exact = self.samples[index];
                Some((exact, exact))
            }
            // `time` is strictly inside the range, so both neighbors exist.
            Err(index) => Some((self.samples[index - 1], self.samples[index])),
        }
    }

    /// Interpolate between the two ends of a bracket at `time`. A degenerate
    /// bracket returns its sample verbatim.
    pub fn interpolate(lower: &TimedSample, upper: &TimedSample, time: Nanos) -> Transform {
        if lower.0 == upper.0 {
            return upper.1;
        }
        let s = percent_of(lower.0, upper.0, time);
        Transform::interpolate(&lower.1, &upper.1, s)
    }

    /// The resolved child-to-parent transform at `time`, with any manual
    /// offset composed on.
    pub(crate) fn edge_transform_at(&self, time: Nanos, max_delta: Nanos) -> Option<Transform> {
        let (lower, upper) = self.find_bracket(time, max_delta)?;
        let mut tf = Self::interpolate(&lower, &upper, time);
        if let Some(euler) = self.offset_euler_degrees {
            tf.set_rotation(tf.rotation() * quat_from_euler_degrees(euler));
        }
        if let Some(offset) = self.offset_position {
            tf.set_translation(tf.translation() + offset);
        }
        Some(tf)
    }

    pub fn display_name(&self) -> String {
        Self::display_name_of(self.id.as_str())
    }

    /// Display-friendly rendition of a frame id, quoted if empty or padded
    /// with whitespace so it stays visible in UI text.
    pub fn display_name_of(id: &str) -> String {
        if id.is_empty() || id.starts_with(' ') || id.ends_with(' ') {
            format!("\"{id}\"")
        } else {
            id.to_string()
        }
    }
}
