//! In-memory history of generated images, most recent first.

use crate::image::GeneratedImage;
use uuid::Uuid;

/// Ordered list of past results.
///
/// New entries go to the front. Entries are only removed on explicit delete,
/// and nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct SessionHistory {
    images: Vec<GeneratedImage>,
}

impl SessionHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `image` as the most recent entry.
    pub fn append(&mut self, image: GeneratedImage) {
        self.images.insert(0, image);
    }

    /// Removes the entry with `id`, returning it if it was present.
    pub fn remove(&mut self, id: Uuid) -> Option<GeneratedImage> {
        let index = self.images.iter().position(|img| img.id == id)?;
        Some(self.images.remove(index))
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: Uuid) -> Option<&GeneratedImage> {
        self.images.iter().find(|img| img.id == id)
    }

    /// Returns true if an entry with `id` exists.
    pub fn contains(&self, id: Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Entry at a zero-based position (0 is the most recent).
    pub fn get_index(&self, index: usize) -> Option<&GeneratedImage> {
        self.images.get(index)
    }

    /// Resolves a user reference: a 1-based position, or a unique id prefix.
    ///
    /// A numeric reference is always a position; an out-of-range number
    /// resolves to nothing rather than to an id that happens to start with it.
    pub fn resolve(&self, reference: &str) -> Option<&GeneratedImage> {
        let reference = reference.trim();
        if reference.is_empty() {
            return None;
        }
        if let Ok(position) = reference.parse::<usize>() {
            return self.images.get(position.checked_sub(1)?);
        }

        let needle = reference.to_lowercase();
        let mut matches = self
            .images
            .iter()
            .filter(|img| img.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(image), None) => Some(image),
            _ => None,
        }
    }

    /// Iterates from most recent to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &GeneratedImage> {
        self.images.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}
