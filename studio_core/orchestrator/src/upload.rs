use common::types::FileEntry;

/// Ordered batch of files staged for upload, keyed by name. Adding a
/// name that is already present replaces the earlier entry in place, so
/// the batch behaves as a mapping from name to descriptor while keeping
/// first-added order for display.
#[derive(Debug, Default, Clone)]
pub struct UploadBatch {
    entries: Vec<FileEntry>,
}

impl UploadBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last-added wins; replacement is a policy, not an error.
    pub fn add(&mut self, entry: FileEntry) {
        match self.entries.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    /// No-op when the name is absent.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.name != name);
        self.entries.len() != before
    }

    pub fn files(&self) -> Vec<FileEntry> {
        self.entries.clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
