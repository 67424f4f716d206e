//! Uploads left behind by failed registrations. Recorded, never deleted
//! from the content store.

use parking_lot::Mutex;

use super::entities::OrphanedUpload;

#[derive(Debug, Default)]
pub struct OrphanRegistry {
    entries: Mutex<Vec<OrphanedUpload>>,
}

impl OrphanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, orphan: OrphanedUpload) {
        self.entries.lock().push(orphan);
    }

    pub fn list(&self) -> Vec<OrphanedUpload> {
        self.entries.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
