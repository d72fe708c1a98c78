//! Backend location tags.
//!
//! A location never carries data. It exists so that several data-source
//! implementations for the same model can coexist and be resolved by type.

use std::fmt::{Display, Formatter};

/// Closed set of backend variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Location {
    /// Fixture-backed test double.
    Mock,
    /// Owned in-process dataset.
    Memory,
    /// Relational store.
    Persistence,
    /// Remote service. Declared only; no built-in implementation.
    Remote,
}

impl Location {
    /// Stable string id used in log events and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mock => "mock",
            Self::Memory => "memory",
            Self::Persistence => "persistence",
            Self::Remote => "remote",
        }
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Type-level stand-in for one `Location` variant.
///
/// Sealed: the four marker types below are the only implementors.
pub trait LocationTag: sealed::Sealed + Send + Sync + 'static {
    const LOCATION: Location;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MockLocation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryLocation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistenceLocation;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoteLocation;

impl sealed::Sealed for MockLocation {}
impl sealed::Sealed for MemoryLocation {}
impl sealed::Sealed for PersistenceLocation {}
impl sealed::Sealed for RemoteLocation {}

impl LocationTag for MockLocation {
    const LOCATION: Location = Location::Mock;
}

impl LocationTag for MemoryLocation {
    const LOCATION: Location = Location::Memory;
}

impl LocationTag for PersistenceLocation {
    const LOCATION: Location = Location::Persistence;
}

impl LocationTag for RemoteLocation {
    const LOCATION: Location = Location::Remote;
}

/// Locations served by an owned in-process dataset.
pub trait InProcessLocation: LocationTag {}

impl InProcessLocation for MockLocation {}
impl InProcessLocation for MemoryLocation {}
