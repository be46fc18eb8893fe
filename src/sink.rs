use std::collections::BTreeMap;

pub const MISSING_TRANSFORM: &str = "MISSING_TRANSFORM";
pub const NO_FRAME_SELECTED: &str = "NO_FRAME_SELECTED";
pub const FRAME_NOT_FOUND: &str = "FRAME_NOT_FOUND";
pub const CYCLE_DETECTED: &str = "CYCLE_DETECTED";
pub const BUFFER_AT_CAPACITY: &str = "BUFFER_AT_CAPACITY";

/// Ordered settings-tree path identifying where a diagnostic is displayed.
pub type Path = Vec<String>;

/// Path-keyed aggregator for human-readable diagnostics. Every component of
/// the transform pipeline publishes and clears its errors here; a settings UI
/// consumes them. Multiple error ids may coexist under one path.
#[derive(Debug, Default, Clone)]
pub struct ErrorSink {
    entries: BTreeMap<Path, BTreeMap<String, String>>,
}

impl ErrorSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a diagnostic. Idempotent: returns true only when the entry is
    /// new or its message changed, so callers can re-publish every tick
    /// without spamming notifications.
    pub fn add(&mut self, path: &[String], error_id: &str, message: impl Into<String>) -> bool {
        let message = message.into();
        let errors = self.entries.entry(path.to_vec()).or_default();
        match errors.get(error_id) {
            Some(existing) if *existing == message => false,
            _ => {
                log::warn!("[{}] {error_id}: {message}", path.join("/"));
                errors.insert(error_id.to_string(), message);
                true
            }
        }
    }

    /// Clear one diagnostic. Returns whether it was present.
    pub fn remove(&mut self, path: &[String], error_id: &str) -> bool {
        let Some(errors) = self.entries.get_mut(path) else {
            return false;
        };
        let removed = errors.remove(error_id).is_some();
        if errors.is_empty() {
            self.entries.remove(path);
        }
        removed
    }

    /// Clear every diagnostic under `path`.
    pub fn clear_path(&mut self, path: &[String]) {
        self.entries.remove(path);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn errors_at<'a>(
        &'a self,
        path: &[String],
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.entries
            .get(path)
            .into_iter()
            .flat_map(|errors| errors.iter().map(|(id, msg)| (id.as_str(), msg.as_str())))
    }

    pub fn has_error(&self, path: &[String], error_id: &str) -> bool {
        self.entries
            .get(path)
            .is_some_and(|errors| errors.contains_key(error_id))
    }

    /// All diagnostics, in deterministic path order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &str, &str)> {
        self.entries.iter().flat_map(|(path, errors)| {
            errors
                .iter()
                .map(move |(id, msg)| (path, id.as_str(), msg.as_str()))
        })
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }
}
