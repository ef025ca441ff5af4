//! Tag registry for the generic game tree.
//!
//! A [`Schema`] is an ordered, append-only list of named tags. Each tag asks
//! for a fixed number of bytes per node ("state tag") and per legal move of
//! that node ("move tags"), and may hook node creation and deletion. The
//! schema precomputes where each tag lives inside a node's tag storage:
//!
//! ```text
//! | state tag 0 | state tag 1 | ... | move tags 0 (n * size0) | move tags 1 (n * size1) | ...
//! ```
//!
//! where `n` is the node's move count.

use std::ops::Range;

use thiserror::Error;

use crate::board::{Board, Move};
use crate::constants::MAX_TAGS;

/// Storage requirements and lifecycle hooks of a kind of tag.
///
/// Both hooks receive the tag's own slices only. Storage is zeroed before
/// `init` runs.
pub trait TagType: Send + Sync {
    /// Bytes per node.
    fn state_size(&self) -> usize;

    /// Bytes per legal move of a node.
    fn move_size(&self) -> usize;

    /// Called once when a node is created.
    fn init(&self, _state_tag: &mut [u8], _move_tags: &mut [u8], _state: &Board, _moves: &[Move]) {
    }

    /// Called once before a node is deleted.
    fn free(&self, _state_tag: &mut [u8], _move_tags: &mut [u8]) {}
}

/// Zero-initialised storage with no hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlainTag {
    pub state_size: usize,
    pub move_size: usize,
}

impl TagType for PlainTag {
    fn state_size(&self) -> usize {
        self.state_size
    }

    fn move_size(&self) -> usize {
        self.move_size
    }
}

/// Handle to a registered tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TagId(usize);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("tag `{0}` is already registered")]
    DuplicateName(String),
    #[error("schema already holds the maximum of {} tags", MAX_TAGS)]
    TooManyTags,
}

struct SchemaTag {
    name: String,
    kind: Box<dyn TagType>,
    state_size: usize,
    state_offset: usize,
    move_size: usize,
    /// Sum of the move sizes of every earlier tag
    move_prefix: usize,
}

/// An append-only registry of tags, shared read-only by a tree.
#[derive(Default)]
pub struct Schema {
    tags: Vec<SchemaTag>,
    state_size: usize,
    move_size: usize,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag under a unique name.
    pub fn add(
        &mut self,
        name: impl Into<String>,
        kind: impl TagType + 'static,
    ) -> Result<TagId, SchemaError> {
        let name = name.into();
        if self.get(&name).is_some() {
            return Err(SchemaError::DuplicateName(name));
        }
        if self.tags.len() >= MAX_TAGS {
            return Err(SchemaError::TooManyTags);
        }

        let state_size = kind.state_size();
        let move_size = kind.move_size();
        self.tags.push(SchemaTag {
            name,
            kind: Box::new(kind),
            state_size,
            state_offset: self.state_size,
            move_size,
            move_prefix: self.move_size,
        });
        self.state_size += state_size;
        self.move_size += move_size;
        Ok(TagId(self.tags.len() - 1))
    }

    /// Look a tag up by name.
    pub fn get(&self, name: &str) -> Option<TagId> {
        self.tags.iter().position(|t| t.name == name).map(TagId)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Bytes of tag storage needed by a node with `num_moves` moves.
    pub(crate) fn storage_size(&self, num_moves: usize) -> usize {
        self.state_size + num_moves * self.move_size
    }

    fn tag(&self, id: TagId) -> Option<&SchemaTag> {
        self.tags.get(id.0)
    }

    pub(crate) fn state_range(&self, id: TagId) -> Option<Range<usize>> {
        let tag = self.tag(id)?;
        Some(tag.state_offset..tag.state_offset + tag.state_size)
    }

    pub(crate) fn move_tags_range(&self, id: TagId, num_moves: usize) -> Option<Range<usize>> {
        let tag = self.tag(id)?;
        let start = self.state_size + num_moves * tag.move_prefix;
        Some(start..start + num_moves * tag.move_size)
    }

    pub(crate) fn move_tag_range(
        &self,
        id: TagId,
        num_moves: usize,
        index: usize,
    ) -> Option<Range<usize>> {
        let tag = self.tag(id)?;
        if index >= num_moves {
            return None;
        }
        let start = self.state_size + num_moves * tag.move_prefix + index * tag.move_size;
        Some(start..start + tag.move_size)
    }

    /// Split node storage into one tag's state slice and move-tags slice.
    fn split<'a>(
        &self,
        tag: &SchemaTag,
        storage: &'a mut [u8],
        num_moves: usize,
    ) -> (&'a mut [u8], &'a mut [u8]) {
        let (states, moves) = storage.split_at_mut(self.state_size);
        let state_tag = &mut states[tag.state_offset..tag.state_offset + tag.state_size];
        let start = num_moves * tag.move_prefix;
        let move_tags = &mut moves[start..start + num_moves * tag.move_size];
        (state_tag, move_tags)
    }

    /// Run every tag's construct hook, in registration order.
    pub(crate) fn init_tags(&self, storage: &mut [u8], state: &Board, moves: &[Move]) {
        for tag in &self.tags {
            let (state_tag, move_tags) = self.split(tag, storage, moves.len());
            tag.kind.init(state_tag, move_tags, state, moves);
        }
    }

    /// Run every tag's destroy hook, in registration order.
    pub(crate) fn free_tags(&self, storage: &mut [u8], num_moves: usize) {
        for tag in &self.tags {
            let (state_tag, move_tags) = self.split(tag, storage, num_moves);
            tag.kind.free(state_tag, move_tags);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get() {
        let mut schema = Schema::new();
        let a = schema.add("a", PlainTag { state_size: 4, move_size: 2 }).unwrap();
        let b = schema.add("b", PlainTag { state_size: 8, move_size: 1 }).unwrap();
        assert_ne!(a, b);
        assert_eq!(schema.get("a"), Some(a));
        assert_eq!(schema.get("b"), Some(b));
        assert_eq!(schema.get("c"), None);
        assert_eq!(schema.len(), 2);
    }

    #[test]
    fn test_duplicate_name() {
        let mut schema = Schema::new();
        schema.add("visits", PlainTag { state_size: 4, move_size: 4 }).unwrap();
        assert_eq!(
            schema.add("visits", PlainTag { state_size: 1, move_size: 1 }),
            Err(SchemaError::DuplicateName("visits".into()))
        );
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_tag_cap() {
        let mut schema = Schema::new();
        for i in 0..MAX_TAGS {
            schema.add(format!("t{i}"), PlainTag { state_size: 1, move_size: 0 }).unwrap();
        }
        assert_eq!(
            schema.add("one too many", PlainTag { state_size: 1, move_size: 0 }),
            Err(SchemaError::TooManyTags)
        );
    }

    #[test]
    fn test_offsets() {
        let mut schema = Schema::new();
        let a = schema.add("a", PlainTag { state_size: 4, move_size: 2 }).unwrap();
        let b = schema.add("b", PlainTag { state_size: 8, move_size: 1 }).unwrap();

        // 3 moves: states take 12 bytes, a's move tags 6, b's 3
        assert_eq!(schema.storage_size(3), 21);
        assert_eq!(schema.state_range(a), Some(0..4));
        assert_eq!(schema.state_range(b), Some(4..12));
        assert_eq!(schema.move_tags_range(a, 3), Some(12..18));
        assert_eq!(schema.move_tags_range(b, 3), Some(18..21));
        assert_eq!(schema.move_tag_range(a, 3, 2), Some(16..18));
        assert_eq!(schema.move_tag_range(b, 3, 1), Some(19..20));
        assert_eq!(schema.move_tag_range(b, 3, 3), None);
        assert_eq!(schema.state_range(TagId(2)), None);
    }
}
