mod common;

use common::Contact;
use crudkit_core::{
    Container, ContainerConfig, CrudDataSource, Environment, MemoryLocation, MockDataSource,
    MockLocation, PersistenceLocation, RegistryError, RemoteLocation, RepoResult,
    SharedDataSource, SqliteDataSource, SqliteStore,
};
use std::sync::Arc;
use std::thread;

/// Storage-agnostic caller: works against any contact data source.
fn rename_all<D>(source: &D, name: &str) -> RepoResult<Vec<Contact>>
where
    D: CrudDataSource<Model = Contact> + ?Sized,
{
    let mut renamed = Vec::new();
    for mut contact in source.read_all()? {
        contact.name = Some(name.to_string());
        if let Some(updated) = source.update(&contact)? {
            renamed.push(updated);
        }
    }
    Ok(renamed)
}

fn file_container() -> (tempfile::TempDir, Container) {
    let dir = tempfile::tempdir().unwrap();
    let config = ContainerConfig::default().with_store_path(dir.path().join("crudkit.sqlite3"));
    (dir, Container::new(config, Environment::Testing))
}

#[test]
fn same_model_resolves_per_location() {
    let (_dir, mut container) = file_container();
    let store = Arc::new(container.open_store().unwrap());
    container.register(SqliteDataSource::<Contact>::try_new(store).unwrap());
    container.register(
        MockDataSource::with_records(vec![Contact::new("Fixture", "fixture@example.com")])
            .unwrap(),
    );

    let persistent = container.get::<Contact, PersistenceLocation>().unwrap();
    let mock = container.get::<Contact, MockLocation>().unwrap();

    persistent.create(&Contact::amelia()).unwrap();
    assert_eq!(persistent.read_all().unwrap().len(), 1);
    assert_eq!(
        mock.read_all().unwrap()[0].email,
        "fixture@example.com".to_string()
    );
    assert_eq!(container.len(), 2);
    assert_eq!(container.environment(), Environment::Testing);
}

#[test]
fn generic_callers_work_against_any_location() {
    let (_dir, mut container) = file_container();
    let store = Arc::new(container.open_store().unwrap());
    container.register(SqliteDataSource::<Contact>::try_new(store).unwrap());
    container.register(MockDataSource::with_records(vec![Contact::amelia()]).unwrap());

    let persistent = container.get::<Contact, PersistenceLocation>().unwrap();
    persistent.create(&Contact::amelia()).unwrap();
    let mock = container.get::<Contact, MockLocation>().unwrap();

    for renamed in [
        rename_all(&*persistent, "A. Grey").unwrap(),
        rename_all(&*mock, "A. Grey").unwrap(),
    ] {
        assert_eq!(renamed.len(), 1);
        assert_eq!(renamed[0].name.as_deref(), Some("A. Grey"));
    }
}

#[test]
fn factory_builds_persistence_source_from_config() {
    let (_dir, mut container) = file_container();
    container.register_factory::<Contact, PersistenceLocation, _>(|config| {
        let store = Arc::new(SqliteStore::open_with(&config.store)?);
        let source: SharedDataSource<Contact, PersistenceLocation> =
            Arc::new(SqliteDataSource::<Contact>::try_new(store)?);
        Ok(source)
    });

    let first = container.get::<Contact, PersistenceLocation>().unwrap();
    first.create(&Contact::amelia()).unwrap();

    let second = container.get::<Contact, PersistenceLocation>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.read(&Some(1)).unwrap().unwrap().email, "amelia@gastrobot.xyz");
}

#[test]
fn unregistered_pairs_fail_without_default() {
    let mut container = Container::default();
    container.register(MockDataSource::<Contact>::new());

    for err in [
        container.get::<Contact, MemoryLocation>().err(),
        container.get::<Contact, RemoteLocation>().err(),
        container.get::<Contact, PersistenceLocation>().err(),
    ] {
        assert!(matches!(err, Some(RegistryError::Unregistered { .. })));
    }
}

#[test]
fn second_registration_replaces_first() {
    let mut container = Container::default();
    container.register(
        MockDataSource::with_records(vec![Contact::new("First", "first@example.com")]).unwrap(),
    );
    container.register(
        MockDataSource::with_records(vec![Contact::new("Second", "second@example.com")]).unwrap(),
    );

    let source = container.get::<Contact, MockLocation>().unwrap();
    let all = source.read_all().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].email, "second@example.com");
}

#[test]
fn resolution_is_shareable_across_threads_after_registration() {
    let mut container = Container::default();
    let store = Arc::new(container.open_store().unwrap());
    container.register(SqliteDataSource::<Contact>::try_new(store).unwrap());
    let container = Arc::new(container);

    let handles: Vec<_> = (0..4)
        .map(|index| {
            let container = Arc::clone(&container);
            thread::spawn(move || {
                let source = container.get::<Contact, PersistenceLocation>().unwrap();
                source
                    .create(&Contact::new(
                        &format!("Worker {index}"),
                        &format!("worker{index}@example.com"),
                    ))
                    .unwrap()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    ids.sort();
    assert_eq!(ids, vec![Some(1), Some(2), Some(3), Some(4)]);

    let source = container.get::<Contact, PersistenceLocation>().unwrap();
    assert_eq!(source.read_all().unwrap().len(), 4);
}
