#![allow(dead_code)]

use crudkit_core::{Model, RelationalModel, SqliteDataSource, SqliteStore};
use rusqlite::Row;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Contact {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub email: String,
}

impl Contact {
    pub fn new(name: &str, email: &str) -> Self {
        Self {
            id: None,
            name: Some(name.to_string()),
            email: email.to_string(),
        }
    }

    pub fn amelia() -> Self {
        Self::new("Amelia Grey", "amelia@gastrobot.xyz")
    }
}

impl Model for Contact {
    type Id = Option<i64>;

    fn id(&self) -> &Option<i64> {
        &self.id
    }

    fn set_id(&mut self, id: Option<i64>) {
        self.id = id;
    }
}

impl RelationalModel for Contact {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
        })
    }

    fn columns() -> &'static [&'static str] {
        &[
            "id INTEGER PRIMARY KEY",
            "name TEXT",
            "email TEXT NOT NULL UNIQUE",
        ]
    }
}

pub fn memory_store() -> Arc<SqliteStore> {
    Arc::new(SqliteStore::open_in_memory().unwrap())
}

pub fn contact_source() -> SqliteDataSource<Contact> {
    SqliteDataSource::try_new(memory_store()).unwrap()
}
