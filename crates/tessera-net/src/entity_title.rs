//! Entity label synchronization.
//!
//! An [`EntityTitle`] either sets the floating label above an entity or, when
//! it carries the reserved [`RESET_TITLE`] payload, removes it. This
//! identifier-keyed replace-or-delete rule is shared by every entity metadata
//! message; [`EntityLabels`] is the receiving side.

use std::collections::HashMap;
use std::io::{Read, Write};

use tessera_wire::{MAX_TEXT_LENGTH, WireError, WireRead, WireWrite, size_of_text};

use crate::packet::{PacketTag, WireMessage};

/// Reserved title meaning "remove this entity's label". It is never displayed.
pub const RESET_TITLE: &str = "reset";

/// Sets or clears the label of one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTitle {
    /// Entity identifier.
    pub entity_id: i32,
    /// New label, or [`RESET_TITLE`].
    pub title: String,
}

impl EntityTitle {
    /// Creates a message that sets `entity_id`'s label to `title`.
    ///
    /// A `title` equal to [`RESET_TITLE`] is indistinguishable from
    /// [`EntityTitle::reset`]; the literal word cannot be used as a label.
    pub fn new(entity_id: i32, title: impl Into<String>) -> Self {
        Self {
            entity_id,
            title: title.into(),
        }
    }

    /// Creates a message that removes `entity_id`'s label.
    pub fn reset(entity_id: i32) -> Self {
        Self::new(entity_id, RESET_TITLE)
    }

    /// Returns `true` if this message clears the label.
    pub fn is_reset(&self) -> bool {
        self.title == RESET_TITLE
    }
}

impl WireMessage for EntityTitle {
    const TAG: PacketTag = PacketTag::ENTITY_TITLE;

    fn num_bytes(&self) -> usize {
        4 + size_of_text(&self.title)
    }

    fn write_data<W: Write + ?Sized>(&self, out: &mut W) -> Result<(), WireError> {
        out.write_i32(self.entity_id)?;
        out.write_text(&self.title)
    }

    fn read_data<R: Read + ?Sized>(input: &mut R) -> Result<Self, WireError> {
        let entity_id = input.read_i32()?;
        let title = input.read_text(MAX_TEXT_LENGTH)?;
        Ok(Self { entity_id, title })
    }
}

// ---------------------------------------------------------------------------
// EntityLabels
// ---------------------------------------------------------------------------

/// Receiver-side label table keyed by entity identifier.
#[derive(Debug, Default, Clone)]
pub struct EntityLabels {
    labels: HashMap<i32, String>,
}

impl EntityLabels {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies one message: a reset removes the label, anything else sets or
    /// replaces it. Returns the label that was there before.
    pub fn apply(&mut self, msg: &EntityTitle) -> Option<String> {
        if msg.is_reset() {
            self.labels.remove(&msg.entity_id)
        } else {
            self.labels.insert(msg.entity_id, msg.title.clone())
        }
    }

    /// Returns the current label of `entity_id`.
    pub fn get(&self, entity_id: i32) -> Option<&str> {
        self.labels.get(&entity_id).map(String::as_str)
    }

    /// Number of labelled entities.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Returns `true` if no entity has a label.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
