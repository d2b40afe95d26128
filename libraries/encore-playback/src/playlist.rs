//! Ordered, observable playlist
//!
//! Every mutation runs under the internal mutex and returns the structural
//! change it caused. The same change is broadcast to subscribers before the
//! lock is released, so every listener sees changes in mutation order.

use crate::error::{PlaybackError, Result};
use encore_core::MediaEntry;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Structural change emitted by a playlist mutation
///
/// `location` is the identity of the affected entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaylistChange {
    /// Entry inserted at `index`
    Added { index: usize, location: String },

    /// Entry removed from `index`
    Removed { index: usize, location: String },

    /// Entry taken from `from` and reinserted before the entry that was at `to`
    Moved {
        from: usize,
        to: usize,
        location: String,
    },

    /// Whole content replaced
    Replaced { len: usize },

    /// All entries removed
    Cleared,
}

/// Ordered sequence of media entries
///
/// Readers (`len`, `get`, `snapshot`) may be called from any task. Only the
/// orchestrator's worker mutates it.
#[derive(Debug)]
pub struct Playlist {
    entries: Mutex<Vec<MediaEntry>>,
    changes: broadcast::Sender<PlaylistChange>,
}

impl Playlist {
    /// Create an empty playlist
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(256);
        Self {
            entries: Mutex::new(Vec::new()),
            changes,
        }
    }

    /// Subscribe to structural changes
    pub fn subscribe(&self) -> broadcast::Receiver<PlaylistChange> {
        self.changes.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<MediaEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, change: &PlaylistChange) {
        // No subscribers is fine
        let _ = self.changes.send(change.clone());
    }

    /// Append an entry
    pub fn add(&self, entry: MediaEntry) -> PlaylistChange {
        let mut entries = self.lock();
        let change = PlaylistChange::Added {
            index: entries.len(),
            location: entry.location.clone(),
        };
        entries.push(entry);
        self.emit(&change);
        change
    }

    /// Insert an entry at `index` (`index == len` appends)
    pub fn insert(&self, index: usize, entry: MediaEntry) -> Result<PlaylistChange> {
        let mut entries = self.lock();
        if index > entries.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                size: entries.len(),
            });
        }

        let change = PlaylistChange::Added {
            index,
            location: entry.location.clone(),
        };
        entries.insert(index, entry);
        self.emit(&change);
        Ok(change)
    }

    /// Remove the entry at `index`
    pub fn remove(&self, index: usize) -> Result<PlaylistChange> {
        let mut entries = self.lock();
        if index >= entries.len() {
            return Err(PlaybackError::IndexOutOfRange {
                index,
                size: entries.len(),
            });
        }

        let entry = entries.remove(index);
        let change = PlaylistChange::Removed {
            index,
            location: entry.location,
        };
        self.emit(&change);
        Ok(change)
    }

    /// Remove every entry whose location matches
    ///
    /// Returns one change per removed entry, in the order they were applied.
    pub fn remove_location(&self, location: &str) -> Vec<PlaylistChange> {
        let mut entries = self.lock();
        let mut changes = Vec::new();
        let mut index = 0;

        while index < entries.len() {
            if entries[index].location == location {
                let entry = entries.remove(index);
                let change = PlaylistChange::Removed {
                    index,
                    location: entry.location,
                };
                self.emit(&change);
                changes.push(change);
                // The next candidate slid into `index`
            } else {
                index += 1;
            }
        }

        changes
    }

    /// Move the entry at `from` so it lands before the entry currently at `to`
    ///
    /// Valid ranges are `from < len` and `to <= len`. `to == from` changes
    /// nothing but still emits the change.
    pub fn move_entry(&self, from: usize, to: usize) -> Result<PlaylistChange> {
        let mut entries = self.lock();
        let size = entries.len();
        if from >= size {
            return Err(PlaybackError::IndexOutOfRange { index: from, size });
        }
        if to > size {
            return Err(PlaybackError::IndexOutOfRange { index: to, size });
        }

        let entry = entries.remove(from);
        let location = entry.location.clone();
        let destination = if to > from { to - 1 } else { to };
        entries.insert(destination, entry);

        let change = PlaylistChange::Moved { from, to, location };
        self.emit(&change);
        Ok(change)
    }

    /// Replace the whole content
    pub fn replace_all(&self, new_entries: Vec<MediaEntry>) -> PlaylistChange {
        let mut entries = self.lock();
        *entries = new_entries;
        let change = PlaylistChange::Replaced { len: entries.len() };
        self.emit(&change);
        change
    }

    /// Remove everything
    pub fn clear(&self) -> PlaylistChange {
        let mut entries = self.lock();
        entries.clear();
        let change = PlaylistChange::Cleared;
        self.emit(&change);
        change
    }

    /// Mutate one entry in place (flags, resume point) without a structural change
    ///
    /// Returns `false` when `index` is out of range.
    pub fn update(&self, index: usize, f: impl FnOnce(&mut MediaEntry)) -> bool {
        let mut entries = self.lock();
        match entries.get_mut(index) {
            Some(entry) => {
                f(entry);
                true
            }
            None => false,
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the playlist is empty
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Copy of the entry at `index`
    pub fn get(&self, index: usize) -> Option<MediaEntry> {
        self.lock().get(index).cloned()
    }

    /// Copy of every entry
    pub fn snapshot(&self) -> Vec<MediaEntry> {
        self.lock().clone()
    }

    /// Locations of every entry, in order
    pub fn locations(&self) -> Vec<String> {
        self.lock().iter().map(|e| e.location.clone()).collect()
    }

    /// Sum of known lengths for the given indices (unknown lengths count as 0)
    pub fn total_length_ms(&self, indices: impl IntoIterator<Item = usize>) -> i64 {
        let entries = self.lock();
        indices
            .into_iter()
            .filter_map(|i| entries.get(i))
            .map(|e| e.length_ms.max(0))
            .sum()
    }
}

impl Default for Playlist {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> MediaEntry {
        MediaEntry::new(format!("file:///music/{}.mp3", name))
    }

    fn names(playlist: &Playlist) -> Vec<String> {
        playlist
            .snapshot()
            .iter()
            .map(|e| e.display_title().trim_end_matches(".mp3").to_string())
            .collect()
    }

    fn filled(items: &[&str]) -> Playlist {
        let playlist = Playlist::new();
        playlist.replace_all(items.iter().map(|n| entry(n)).collect());
        playlist
    }

    #[test]
    fn add_and_insert_report_indices() {
        let playlist = Playlist::new();
        assert!(matches!(playlist.add(entry("a")), PlaylistChange::Added { index: 0, .. }));
        assert!(matches!(playlist.add(entry("c")), PlaylistChange::Added { index: 1, .. }));

        let change = playlist.insert(1, entry("b")).unwrap();
        assert_eq!(
            change,
            PlaylistChange::Added {
                index: 1,
                location: "file:///music/b.mp3".to_string()
            }
        );
        assert_eq!(names(&playlist), vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_past_end_is_rejected() {
        let playlist = filled(&["a"]);
        let err = playlist.insert(3, entry("x")).unwrap_err();
        assert!(matches!(err, PlaybackError::IndexOutOfRange { index: 3, size: 1 }));
        assert_eq!(playlist.len(), 1);
    }

    #[test]
    fn remove_out_of_range_is_rejected() {
        let playlist = filled(&["a", "b"]);
        assert!(playlist.remove(2).is_err());
        assert_eq!(playlist.len(), 2);
    }

    #[test]
    fn remove_location_removes_every_match() {
        let playlist = filled(&["a", "b", "b", "c", "b"]);
        let changes = playlist.remove_location("file:///music/b.mp3");

        let indices: Vec<usize> = changes
            .iter()
            .map(|c| match c {
                PlaylistChange::Removed { index, .. } => *index,
                other => panic!("unexpected change {:?}", other),
            })
            .collect();
        // Adjacent matches are removed at the same slot
        assert_eq!(indices, vec![1, 1, 2]);
        assert_eq!(names(&playlist), vec!["a", "c"]);
    }

    #[test]
    fn move_forward_lands_before_target() {
        let playlist = filled(&["a", "b", "c", "d"]);
        playlist.move_entry(0, 3).unwrap();
        assert_eq!(names(&playlist), vec!["b", "c", "a", "d"]);

        playlist.move_entry(1, 4).unwrap();
        assert_eq!(names(&playlist), vec!["b", "a", "d", "c"]);
    }

    #[test]
    fn move_backward() {
        let playlist = filled(&["a", "b", "c", "d"]);
        playlist.move_entry(3, 0).unwrap();
        assert_eq!(names(&playlist), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn move_to_same_index_still_emits() {
        let playlist = filled(&["a", "b"]);
        let mut rx = playlist.subscribe();

        let change = playlist.move_entry(1, 1).unwrap();
        assert!(matches!(change, PlaylistChange::Moved { from: 1, to: 1, .. }));
        assert_eq!(rx.try_recv().unwrap(), change);
        assert_eq!(names(&playlist), vec!["a", "b"]);
    }

    #[test]
    fn move_validates_bounds() {
        let playlist = filled(&["a", "b"]);
        assert!(playlist.move_entry(2, 0).is_err());
        assert!(playlist.move_entry(0, 3).is_err());
        assert!(playlist.move_entry(0, 2).is_ok());
        assert_eq!(names(&playlist), vec!["b", "a"]);
    }

    #[test]
    fn subscribers_see_changes_in_order() {
        let playlist = Playlist::new();
        let mut rx = playlist.subscribe();

        playlist.add(entry("a"));
        playlist.add(entry("b"));
        playlist.remove(0).unwrap();
        playlist.clear();

        assert!(matches!(rx.try_recv().unwrap(), PlaylistChange::Added { index: 0, .. }));
        assert!(matches!(rx.try_recv().unwrap(), PlaylistChange::Added { index: 1, .. }));
        assert!(matches!(rx.try_recv().unwrap(), PlaylistChange::Removed { index: 0, .. }));
        assert_eq!(rx.try_recv().unwrap(), PlaylistChange::Cleared);
    }

    #[test]
    fn update_changes_flags_in_place() {
        let playlist = filled(&["a"]);
        assert!(playlist.update(0, |e| e.flags.from_start = true));
        assert!(!playlist.update(5, |e| e.flags.from_start = true));
        assert!(playlist.get(0).unwrap().flags.from_start);
    }

    #[test]
    fn snapshot_is_a_copy() {
        let playlist = filled(&["a"]);
        let mut copy = playlist.snapshot();
        copy.clear();
        assert_eq!(playlist.len(), 1);
    }
}
