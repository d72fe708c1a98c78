//! Storage-agnostic CRUD contracts and backends.
//!
//! Models declare a typed identifier; data sources provide CRUD for one
//! (model, location) pair; the container resolves the right data source for
//! a model and location at runtime.

pub mod container;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod serialization;

pub use container::config::{
    ConfigError, ContainerConfig, Environment, LogConfig, LogLevel, StoreConfig,
};
pub use container::{
    Container, DataSourceFactory, RegistryError, RegistryResult, SharedDataSource,
};
pub use db::{FieldMap, SqliteStore, StoreError, StoreResult};
pub use logging::{init_logging, logging_status};
pub use model::entity::Model;
pub use model::identifier::Identifier;
pub use model::location::{
    InProcessLocation, Location, LocationTag, MemoryLocation, MockLocation, PersistenceLocation,
    RemoteLocation,
};
pub use model::relational::{default_table_name, RelationalModel};
pub use repo::data_source::{CrudDataSource, RepoError, RepoResult};
pub use repo::memory_source::{InMemoryDataSource, MemoryDataSource, MockDataSource};
pub use repo::sqlite_source::SqliteDataSource;
pub use serialization::{encode_fields, EncodeResult, EncodingError};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
