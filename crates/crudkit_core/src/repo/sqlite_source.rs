//! Generic relational data source.
//!
//! # Responsibility
//! - Provide CRUD for any `RelationalModel` using only store primitives.
//!
//! # Invariants
//! - Lookup filters interpolate 64-bit integers only.
//! - The identifier column aliases the SQLite rowid, so deleting by rowid
//!   deletes by identifier.
//! - `update` encodes the replacement before deleting the stored row.

use super::data_source::{CrudDataSource, RepoResult};
use crate::db::{ensure_identifier, FieldMap, SqliteStore};
use crate::model::location::PersistenceLocation;
use crate::model::relational::RelationalModel;
use log::debug;
use std::marker::PhantomData;
use std::sync::Arc;

/// Persistence-location data source for relational model `M`.
pub struct SqliteDataSource<M> {
    store: Arc<SqliteStore>,
    table: String,
    _model: PhantomData<fn() -> M>,
}

impl<M: RelationalModel> SqliteDataSource<M> {
    /// Binds a data source to a shared store.
    ///
    /// Creates `M`'s table when the model declares column definitions.
    pub fn try_new(store: Arc<SqliteStore>) -> RepoResult<Self> {
        let table = M::table_name();
        ensure_identifier(&table)?;
        ensure_identifier(M::id_column())?;

        let columns = M::columns();
        if !columns.is_empty() {
            store.create_table(&table, columns)?;
        }

        Ok(Self {
            store,
            table,
            _model: PhantomData,
        })
    }

    /// Storage table this source reads and writes.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Number of stored rows.
    pub fn count(&self) -> RepoResult<i64> {
        Ok(self.store.count_from(&self.table)?)
    }

    fn insert_fields(&self, mut fields: FieldMap) -> RepoResult<Option<i64>> {
        fields.remove(M::id_column());
        let row_id = self.store.insert_into(&self.table, &fields)?;
        debug!(
            "event=datasource_create module=repo status=ok location=persistence table={} id={row_id}",
            self.table
        );
        Ok(Some(row_id))
    }

    fn select_by_id(&self, id: i64) -> RepoResult<Option<M>> {
        let filter = format!("{} = {id}", M::id_column());
        let rows = self
            .store
            .select_from(&self.table, Some(&filter), M::from_row)?;
        Ok(rows.into_iter().next())
    }
}

impl<M: RelationalModel> CrudDataSource for SqliteDataSource<M> {
    type Model = M;
    type Location = PersistenceLocation;

    fn read(&self, id: &Option<i64>) -> RepoResult<Option<M>> {
        match id {
            Some(id) => self.select_by_id(*id),
            None => Ok(None),
        }
    }

    fn read_all(&self) -> RepoResult<Vec<M>> {
        Ok(self.store.select_from(&self.table, None, M::from_row)?)
    }

    fn create(&self, model: &M) -> RepoResult<Option<i64>> {
        self.insert_fields(model.to_fields()?)
    }

    /// Delete-then-recreate, with the model encoded before anything is
    /// deleted so an unencodable model leaves the stored row untouched.
    fn update(&self, model: &M) -> RepoResult<Option<M>> {
        let fields = model.to_fields()?;
        let previous = self.delete(model.id())?;
        let id = self.insert_fields(fields)?;
        debug!(
            "event=datasource_update module=repo status=ok location=persistence table={} replaced={}",
            self.table,
            previous.is_some()
        );
        self.read(&id)
    }

    fn delete(&self, id: &Option<i64>) -> RepoResult<Option<M>> {
        let Some(id) = *id else {
            return Ok(None);
        };

        let existing = self.select_by_id(id)?;
        if existing.is_some() {
            self.store.delete_from(&self.table, &[id])?;
            debug!(
                "event=datasource_delete module=repo status=ok location=persistence table={} id={id}",
                self.table
            );
        }
        Ok(existing)
    }
}
