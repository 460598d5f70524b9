//! Ordered collection of the current session's records.

use super::video::Video;
use uuid::Uuid;

/// Records in arrival order. Included batches keep the order the catalog
/// returned them in.
#[derive(Debug, Default)]
pub(super) struct VideoCollection {
    entries: Vec<Video>,
}

impl VideoCollection {
    pub fn include(&mut self, batch: Vec<Video>) {
        self.entries.extend(batch);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, uuid: Uuid) -> Option<&Video> {
        self.entries.iter().find(|video| video.uuid == uuid)
    }

    pub fn get_mut(&mut self, uuid: Uuid) -> Option<&mut Video> {
        self.entries.iter_mut().find(|video| video.uuid == uuid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Video> {
        self.entries.iter()
    }

    pub fn snapshot(&self) -> Vec<Video> {
        self.entries.clone()
    }

    /// Marks a record as an active download: progress zero, edits locked.
    pub fn begin_download(&mut self, uuid: Uuid) {
        if let Some(video) = self.get_mut(uuid) {
            video.progress = Some(0);
            video.locked = true;
        }
    }

    pub fn set_progress(&mut self, uuid: Uuid, progress: u8) {
        if let Some(video) = self.get_mut(uuid) {
            video.progress = Some(progress.min(100));
        }
    }

    /// Returns a record to idle: no progress, edits unlocked.
    pub fn reset_download(&mut self, uuid: Uuid) {
        if let Some(video) = self.get_mut(uuid) {
            video.progress = None;
            video.locked = false;
        }
    }
}
