//! Row-mapper contract for models stored in the relational backend.
//!
//! # Invariants
//! - Relational identifiers are `Option<i64>` and map onto the SQLite rowid.
//! - `to_fields` never includes the identifier column; the store assigns it.

use super::entity::Model;
use crate::db::FieldMap;
use crate::serialization::{encode_fields, EncodeResult};
use rusqlite::Row;

/// A model the generic relational data source can persist without
/// per-model code.
pub trait RelationalModel: Model<Id = Option<i64>> + Sized {
    /// Rebuilds a model from one `SELECT *` row.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Storage table name. Defaults to the lower-cased type name.
    fn table_name() -> String {
        default_table_name::<Self>()
    }

    /// Primary-key column, expected to alias the rowid.
    fn id_column() -> &'static str {
        "id"
    }

    /// Column definitions used to create the table when a data source is
    /// constructed. Empty means the table is managed elsewhere.
    fn columns() -> &'static [&'static str] {
        &[]
    }

    /// Insert parameters for this model, without the identifier column.
    ///
    /// The default goes through the serde bridge. Override with an explicit
    /// `FieldMap` when a model needs blob columns or custom encodings.
    fn to_fields(&self) -> EncodeResult<FieldMap> {
        encode_fields(self, &[Self::id_column()])
    }
}

/// Lower-cased final path segment of `T`'s type name, generics stripped.
///
/// `app::models::Contact` -> `contact`, `Wrapper<u8>` -> `wrapper`.
pub fn default_table_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
        .to_lowercase()
}
