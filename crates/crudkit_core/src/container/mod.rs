//! Process-scoped registry resolving data sources by (model, location).
//!
//! # Responsibility
//! - Hold configuration and environment for the running process.
//! - Map each (model type, location) key to one data-source instance or
//!   factory and resolve it with its concrete CRUD signature.
//!
//! # Invariants
//! - The last registration for a key wins.
//! - Resolution never synthesizes a default; unknown keys fail with
//!   `RegistryError::Unregistered`.
//! - Once resolved, a key returns the same `Arc` until it is re-registered.
//! - Registration takes `&mut self`, so all registrations finish before the
//!   container can be shared for concurrent resolution.

pub mod config;

use crate::db::{SqliteStore, StoreResult};
use crate::model::entity::Model;
use crate::model::location::{Location, LocationTag};
use crate::repo::data_source::{CrudDataSource, RepoError};
use config::{ContainerConfig, Environment};
use log::{debug, info};
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, PoisonError};

/// Resolved data source for model `M` at location `L`.
pub type SharedDataSource<M, L> = Arc<dyn CrudDataSource<Model = M, Location = L>>;

/// Deferred constructor for a data source, run on first resolution.
pub type DataSourceFactory<M, L> =
    Box<dyn Fn(&ContainerConfig) -> Result<SharedDataSource<M, L>, RepoError> + Send + Sync>;

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Registry lookup errors.
#[derive(Debug)]
pub enum RegistryError {
    /// Nothing was registered for this exact (model, location) pair.
    Unregistered {
        location: Location,
        model: &'static str,
    },
    /// A registered factory failed to build its data source.
    Factory {
        location: Location,
        model: &'static str,
        source: RepoError,
    },
}

impl Display for RegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unregistered { location, model } => {
                write!(f, "no data source registered for {model} at location {location}")
            }
            Self::Factory {
                location,
                model,
                source,
            } => write!(
                f,
                "data source factory for {model} at location {location} failed: {source}"
            ),
        }
    }
}

impl Error for RegistryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Unregistered { .. } => None,
            Self::Factory { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct ServiceKey {
    location: Location,
    model: TypeId,
    model_name: &'static str,
}

impl ServiceKey {
    fn of<M: Model, L: LocationTag>() -> Self {
        Self {
            location: L::LOCATION,
            model: TypeId::of::<M>(),
            model_name: type_name::<M>(),
        }
    }
}

/// Type-erased registration. Always holds `SharedDataSource<M, L>` or
/// `DataSourceFactory<M, L>` for the `M`/`L` named by its key.
enum ServiceEntry {
    Instance(Box<dyn Any + Send + Sync>),
    Factory(Box<dyn Any + Send + Sync>),
}

/// Data-source registry plus the configuration it was built from.
pub struct Container {
    config: ContainerConfig,
    environment: Environment,
    services: HashMap<ServiceKey, ServiceEntry>,
    cache: Mutex<HashMap<ServiceKey, Box<dyn Any + Send + Sync>>>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new(ContainerConfig::default(), Environment::default())
    }
}

impl Container {
    pub fn new(config: ContainerConfig, environment: Environment) -> Self {
        Self {
            config,
            environment,
            services: HashMap::new(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Opens the relational store described by `config.store`.
    pub fn open_store(&self) -> StoreResult<SqliteStore> {
        SqliteStore::open_with(&self.config.store)
    }

    /// Registers a data source under its own (model, location) key.
    pub fn register<D>(&mut self, source: D)
    where
        D: CrudDataSource + 'static,
    {
        let shared: SharedDataSource<D::Model, D::Location> = Arc::new(source);
        self.register_shared(shared);
    }

    /// Registers an already shared data source.
    pub fn register_shared<M: Model, L: LocationTag>(&mut self, source: SharedDataSource<M, L>) {
        self.insert_entry(
            ServiceKey::of::<M, L>(),
            ServiceEntry::Instance(Box::new(source)),
        );
    }

    /// Registers a factory run once, on the first `get` for its key.
    pub fn register_factory<M, L, F>(&mut self, factory: F)
    where
        M: Model,
        L: LocationTag,
        F: Fn(&ContainerConfig) -> Result<SharedDataSource<M, L>, RepoError>
            + Send
            + Sync
            + 'static,
    {
        let factory: DataSourceFactory<M, L> = Box::new(factory);
        self.insert_entry(
            ServiceKey::of::<M, L>(),
            ServiceEntry::Factory(Box::new(factory)),
        );
    }

    /// Resolves the data source for model `M` at location `L`.
    ///
    /// # Errors
    /// - `Unregistered` when no instance or factory exists for the pair.
    /// - `Factory` when a registered factory fails; the failure is not
    ///   cached, so a later call runs the factory again.
    pub fn get<M: Model, L: LocationTag>(&self) -> RegistryResult<SharedDataSource<M, L>> {
        let key = ServiceKey::of::<M, L>();
        let mut cache = self.cache.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = cache
            .get(&key)
            .and_then(|entry| entry.downcast_ref::<SharedDataSource<M, L>>())
        {
            return Ok(Arc::clone(cached));
        }

        let resolved = match self.services.get(&key) {
            Some(ServiceEntry::Instance(instance)) => instance
                .downcast_ref::<SharedDataSource<M, L>>()
                .map(Arc::clone),
            Some(ServiceEntry::Factory(factory)) => {
                match factory.downcast_ref::<DataSourceFactory<M, L>>() {
                    Some(factory) => {
                        Some(factory(&self.config).map_err(|source| RegistryError::Factory {
                            location: key.location,
                            model: key.model_name,
                            source,
                        })?)
                    }
                    None => None,
                }
            }
            None => None,
        };

        let Some(resolved) = resolved else {
            debug!(
                "event=container_resolve module=container status=error error_code=unregistered location={} model={}",
                key.location, key.model_name
            );
            return Err(RegistryError::Unregistered {
                location: key.location,
                model: key.model_name,
            });
        };

        cache.insert(key, Box::new(Arc::clone(&resolved)));
        debug!(
            "event=container_resolve module=container status=ok location={} model={}",
            key.location, key.model_name
        );
        Ok(resolved)
    }

    /// Returns whether an instance or factory exists for the pair.
    pub fn is_registered<M: Model, L: LocationTag>(&self) -> bool {
        self.services.contains_key(&ServiceKey::of::<M, L>())
    }

    /// Number of registered (model, location) keys.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    fn insert_entry(&mut self, key: ServiceKey, entry: ServiceEntry) {
        let replaced = self.services.insert(key, entry).is_some();
        self.cache
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        info!(
            "event=container_register module=container status=ok location={} model={} replaced={}",
            key.location, key.model_name, replaced
        );
    }
}
