//! Identifier kind shared by every model primary key.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use uuid::Uuid;

/// Capability required of any type used as a model's primary key.
///
/// `Option<T>` qualifies whenever `T` does, so a not-yet-persisted model
/// (`None`) and a persisted one (`Some(id)`) share one identifier type.
/// Equality is lifted member-wise: `None == None`, `None != Some(_)`.
pub trait Identifier:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl Identifier for i32 {}
impl Identifier for i64 {}
impl Identifier for u32 {}
impl Identifier for String {}
impl Identifier for Uuid {}

impl<T: Identifier> Identifier for Option<T> {}
