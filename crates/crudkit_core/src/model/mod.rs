//! Contracts every persisted model satisfies.
//!
//! # Responsibility
//! - Describe "a model with a typed, possibly optional identifier".
//! - Describe the extra capabilities a relational backend needs to map any
//!   conforming model to and from rows without per-model repository code.
//! - Provide the location tags that select a backend at the type level.
//!
//! # Invariants
//! - An identifier assigned by `create` is never reassigned to another row.
//! - A model's identifier is absent only before its first persistence.

pub mod entity;
pub mod identifier;
pub mod location;
pub mod relational;
