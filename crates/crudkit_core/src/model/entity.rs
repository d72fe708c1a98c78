//! Model contract: a serializable entity with a typed identifier.

use super::identifier::Identifier;
use serde::Serialize;

/// Entity type persisted through a data source.
pub trait Model: Serialize + Send + Sync + 'static {
    type Id: Identifier;

    /// Returns the identifier field.
    fn id(&self) -> &Self::Id;

    /// Overwrites the identifier field.
    ///
    /// Used by in-process backends when they assign identifiers on create.
    fn set_id(&mut self, id: Self::Id);
}
