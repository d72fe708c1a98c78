//! In-process data source for mock and memory locations.
//!
//! # Invariants
//! - Identifiers come from a counter starting at 1 and are never reused,
//!   even after the row holding them is deleted.
//! - `read_all` returns models in identifier order.

use super::data_source::{CrudDataSource, RepoResult};
use crate::db::StoreError;
use crate::model::entity::Model;
use crate::model::location::{InProcessLocation, MemoryLocation, MockLocation};
use log::debug;
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::{Mutex, MutexGuard};

/// Test double holding fixture data.
pub type MockDataSource<M> = InMemoryDataSource<M, MockLocation>;
/// Owned in-process dataset.
pub type MemoryDataSource<M> = InMemoryDataSource<M, MemoryLocation>;

struct MemoryState<M> {
    records: BTreeMap<i64, M>,
    /// `None` once `i64::MAX` has been handed out.
    next_id: Option<i64>,
}

/// Dataset kept in an owned ordered map keyed by identifier.
pub struct InMemoryDataSource<M, L> {
    state: Mutex<MemoryState<M>>,
    _location: PhantomData<fn() -> L>,
}

impl<M, L> Default for InMemoryDataSource<M, L>
where
    M: Model<Id = Option<i64>> + Clone,
    L: InProcessLocation,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<M, L> InMemoryDataSource<M, L>
where
    M: Model<Id = Option<i64>> + Clone,
    L: InProcessLocation,
{
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                records: BTreeMap::new(),
                next_id: Some(1),
            }),
            _location: PhantomData,
        }
    }

    /// Seeds the dataset.
    ///
    /// Records that already carry an identifier keep it; the others receive
    /// the next free one, in iteration order. Fails with
    /// `StoreError::IdentifiersExhausted` when a record needs an identifier
    /// past `i64::MAX`.
    pub fn with_records(records: impl IntoIterator<Item = M>) -> RepoResult<Self> {
        let mut records_by_id = BTreeMap::new();
        let mut pending = Vec::new();
        for record in records {
            match *record.id() {
                Some(id) => {
                    records_by_id.insert(id, record);
                }
                None => pending.push(record),
            }
        }

        let mut next_id = match records_by_id.keys().next_back() {
            Some(max_id) => max_id.checked_add(1),
            None => Some(1),
        };
        for mut record in pending {
            let id = next_id.ok_or(StoreError::IdentifiersExhausted)?;
            record.set_id(Some(id));
            records_by_id.insert(id, record);
            next_id = id.checked_add(1);
        }

        Ok(Self {
            state: Mutex::new(MemoryState {
                records: records_by_id,
                next_id,
            }),
            _location: PhantomData,
        })
    }

    pub fn len(&self) -> RepoResult<usize> {
        Ok(self.state()?.records.len())
    }

    pub fn is_empty(&self) -> RepoResult<bool> {
        Ok(self.state()?.records.is_empty())
    }

    fn state(&self) -> RepoResult<MutexGuard<'_, MemoryState<M>>> {
        self.state
            .lock()
            .map_err(|_| StoreError::LockPoisoned.into())
    }
}

impl<M, L> CrudDataSource for InMemoryDataSource<M, L>
where
    M: Model<Id = Option<i64>> + Clone,
    L: InProcessLocation,
{
    type Model = M;
    type Location = L;

    fn read(&self, id: &Option<i64>) -> RepoResult<Option<M>> {
        let Some(id) = id else {
            return Ok(None);
        };
        Ok(self.state()?.records.get(id).cloned())
    }

    fn read_all(&self) -> RepoResult<Vec<M>> {
        Ok(self.state()?.records.values().cloned().collect())
    }

    fn create(&self, model: &M) -> RepoResult<Option<i64>> {
        let mut state = self.state()?;
        let id = state.next_id.ok_or(StoreError::IdentifiersExhausted)?;
        state.next_id = id.checked_add(1);

        let mut record = model.clone();
        record.set_id(Some(id));
        state.records.insert(id, record);
        debug!(
            "event=datasource_create module=repo status=ok location={} id={id}",
            L::LOCATION
        );
        Ok(Some(id))
    }

    fn delete(&self, id: &Option<i64>) -> RepoResult<Option<M>> {
        let Some(id) = id else {
            return Ok(None);
        };
        let removed = self.state()?.records.remove(id);
        if removed.is_some() {
            debug!(
                "event=datasource_delete module=repo status=ok location={} id={id}",
                L::LOCATION
            );
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::{MemoryDataSource, MockDataSource};
    use crate::db::StoreError;
    use crate::model::entity::Model;
    use crate::repo::data_source::{CrudDataSource, RepoError};
    use serde::Serialize;

    #[derive(Debug, Clone, PartialEq, Serialize)]
    struct Dog {
        id: Option<i64>,
        name: String,
        age: u8,
    }

    impl Dog {
        fn new(name: &str, age: u8) -> Self {
            Self {
                id: None,
                name: name.to_string(),
                age,
            }
        }
    }

    impl Model for Dog {
        type Id = Option<i64>;

        fn id(&self) -> &Option<i64> {
            &self.id
        }

        fn set_id(&mut self, id: Option<i64>) {
            self.id = id;
        }
    }

    #[test]
    fn seeded_records_keep_ids_and_fill_gaps_after_max() {
        let mut rex = Dog::new("Rex", 10);
        rex.id = Some(5);
        let source = MockDataSource::with_records(vec![Dog::new("Cat", 20), rex])
            .expect("seeding should succeed");

        let all = source.read_all().expect("read_all should succeed");
        let ids: Vec<_> = all.iter().map(|dog| dog.id).collect();
        assert_eq!(ids, vec![Some(5), Some(6)]);
        assert_eq!(all[1].name, "Cat");

        let created = source
            .create(&Dog::new("Jamie", 5))
            .expect("create should succeed");
        assert_eq!(created, Some(7));
    }

    #[test]
    fn identifiers_are_not_reused_after_delete() {
        let source = MemoryDataSource::<Dog>::new();
        let first = source.create(&Dog::new("Rex", 10)).unwrap();
        source.delete(&first).unwrap();
        let second = source.create(&Dog::new("Cat", 20)).unwrap();
        assert_eq!(first, Some(1));
        assert_eq!(second, Some(2));
        assert_eq!(source.len().unwrap(), 1);
    }

    #[test]
    fn absent_identifier_never_matches() {
        let source = MemoryDataSource::<Dog>::new();
        source.create(&Dog::new("Rex", 10)).unwrap();
        assert_eq!(source.read(&None).unwrap(), None);
        assert_eq!(source.delete(&None).unwrap(), None);
        assert!(!source.is_empty().unwrap());
    }

    #[test]
    fn seeding_at_max_identifier_exhausts_counter() {
        let mut last = Dog::new("Rex", 10);
        last.id = Some(i64::MAX);
        let source =
            MockDataSource::with_records(vec![last.clone()]).expect("seeded id is kept as is");
        assert_eq!(source.read(&Some(i64::MAX)).unwrap(), Some(last.clone()));

        let err = source
            .create(&Dog::new("Cat", 20))
            .expect_err("no identifier left after i64::MAX");
        assert!(matches!(
            err,
            RepoError::Store(StoreError::IdentifiersExhausted)
        ));
        assert_eq!(source.len().unwrap(), 1);

        let err = MockDataSource::with_records(vec![last, Dog::new("Cat", 20)])
            .err()
            .expect("pending record cannot be numbered");
        assert!(matches!(
            err,
            RepoError::Store(StoreError::IdentifiersExhausted)
        ));
    }
}
