use crate::metadata::{self, FileMetadata};

/// Selected file names plus the listing they were chosen from.
///
/// Selection keeps insertion order; a batch walks files in that order.
#[derive(Debug, Clone, Default)]
pub struct SelectionState {
    metadata: Vec<FileMetadata>,
    selected: Vec<String>,
}

impl SelectionState {
    pub fn new(metadata: Vec<FileMetadata>) -> Self {
        Self {
            metadata,
            selected: Vec::new(),
        }
    }

    pub fn metadata(&self) -> &[FileMetadata] {
        &self.metadata
    }

    /// Replaces the listing wholesale. The selection is left alone; names
    /// that vanished are skipped when a batch starts.
    pub fn set_metadata(&mut self, metadata: Vec<FileMetadata>) {
        self.metadata = metadata;
    }

    pub fn lookup(&self, file_name: &str) -> Option<&FileMetadata> {
        metadata::find(&self.metadata, file_name)
    }

    pub fn selected(&self) -> &[String] {
        &self.selected
    }

    pub fn is_selected(&self, file_name: &str) -> bool {
        self.selected.iter().any(|name| name == file_name)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Flips membership of `file_name`; returns whether it is now selected.
    pub fn toggle(&mut self, file_name: &str) -> bool {
        if let Some(position) = self.selected.iter().position(|name| name == file_name) {
            self.selected.remove(position);
            false
        } else {
            self.selected.push(file_name.to_string());
            true
        }
    }

    /// Selects exactly the names in the current listing.
    pub fn select_all(&mut self) {
        self.selected = self
            .metadata
            .iter()
            .map(|entry| entry.file_name.clone())
            .collect();
    }

    pub fn deselect_all(&mut self) {
        self.selected.clear();
    }

    pub fn all_selected(&self) -> bool {
        !self.metadata.is_empty()
            && self
                .metadata
                .iter()
                .all(|entry| self.is_selected(&entry.file_name))
    }

    /// Header-checkbox behaviour: clear when everything is selected,
    /// otherwise select the whole listing.
    pub fn toggle_all(&mut self) {
        if self.all_selected() {
            self.deselect_all();
        } else {
            self.select_all();
        }
    }
}
