//! Data-source contracts and backend implementations.
//!
//! # Responsibility
//! - Define the CRUD contract bound to one (model, location) pair.
//! - Provide the generic relational implementation and the in-process
//!   implementation used for mock and memory locations.
//!
//! # Invariants
//! - Absence is a value (`Ok(None)`), never an error.
//! - `update` is delete-then-recreate for every backend; the identifier of
//!   the returned model may differ from the one passed in.

pub mod data_source;
pub mod memory_source;
pub mod sqlite_source;
