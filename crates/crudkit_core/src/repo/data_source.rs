//! CRUD data-source contract shared by every backend.
//!
//! # Invariants
//! - Implementations never retry; every failure surfaces to the caller.
//! - A read or delete that matches nothing returns `Ok(None)`.

use crate::db::StoreError;
use crate::model::entity::Model;
use crate::model::location::LocationTag;
use crate::serialization::EncodingError;
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Classified failure of a CRUD operation.
#[derive(Debug)]
pub enum RepoError {
    /// Store rejected a write because of a schema constraint.
    ConstraintViolation(StoreError),
    Encoding(EncodingError),
    /// Any other store or connection failure.
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation(err) => write!(f, "constraint violation: {err}"),
            Self::Encoding(err) => write!(f, "{err}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::ConstraintViolation(err) => Some(err),
            Self::Encoding(err) => Some(err),
            Self::Store(err) => Some(err),
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        if value.is_constraint_violation() {
            Self::ConstraintViolation(value)
        } else {
            Self::Store(value)
        }
    }
}

impl From<EncodingError> for RepoError {
    fn from(value: EncodingError) -> Self {
        Self::Encoding(value)
    }
}

/// CRUD capability for one model type at one location.
///
/// Calls are synchronous and run to completion or failure. Implementations
/// are shared through the container, hence `Send + Sync`.
pub trait CrudDataSource: Send + Sync {
    type Model: Model;
    type Location: LocationTag;

    /// Returns the model with this identifier, or `None`.
    fn read(&self, id: &<Self::Model as Model>::Id) -> RepoResult<Option<Self::Model>>;

    /// Returns every stored model; empty when nothing is stored.
    fn read_all(&self) -> RepoResult<Vec<Self::Model>>;

    /// Persists `model` and returns the identifier assigned to it.
    ///
    /// The identifier carried by `model` is ignored.
    fn create(&self, model: &Self::Model) -> RepoResult<<Self::Model as Model>::Id>;

    /// Replaces the stored model by deleting the row for `model.id()` and
    /// creating a new one from `model`, then reading it back.
    ///
    /// The returned model's identifier may differ from `model.id()`; callers
    /// must use the returned identifier afterwards. The two store calls are
    /// not atomic: a concurrent reader can observe the row as absent.
    fn update(&self, model: &Self::Model) -> RepoResult<Option<Self::Model>> {
        let location = <Self::Location as LocationTag>::LOCATION;
        let previous = self.delete(model.id())?;
        let id = self.create(model)?;
        debug!(
            "event=datasource_update module=repo status=ok location={location} replaced={}",
            previous.is_some()
        );
        self.read(&id)
    }

    /// Removes the model with this identifier and returns it as it was just
    /// before removal, or `None` when nothing matched.
    fn delete(&self, id: &<Self::Model as Model>::Id) -> RepoResult<Option<Self::Model>>;
}
