//! Building storage from YAML configuration

use metastore_storage::{
    BackendConfig, BackendRegistry, StorageController, StorageError, StorageSection, FOLDER_TYPE,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::tempdir;

fn fixtures() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .to_string_lossy()
        .to_string()
}

#[test]
fn test_single_storage_from_yaml() {
    let yaml = format!(
        "storage:\n  type: folder\n  id: main\n  root: {}\n  cache: true\n",
        fixtures()
    );
    let section = StorageSection::from_yaml(&yaml).unwrap();
    let storage = StorageController::default().from_section(&section).unwrap();

    assert_eq!(storage.instance_id(), "main");
    assert_eq!(storage.backend_name(), FOLDER_TYPE);
    assert_eq!(
        storage.record("henrik-hertz.xml").unwrap().start_date(),
        Some("2021-05-01")
    );
}

#[test]
fn test_storage_list_from_yaml_file() {
    let overlay = tempdir().unwrap();
    fs::write(overlay.path().join("henrik-hertz.xml"), "<XIP>overlay</XIP>").unwrap();
    fs::write(overlay.path().join("extra.xml"), "<XIP/>").unwrap();

    let config_dir = tempdir().unwrap();
    let config_path = config_dir.path().join("metastore.yaml");
    fs::write(
        &config_path,
        format!(
            "storages:\n  - type: folder\n    id: overlay\n    root: {}\n  - type: folder\n    id: base\n    root: {}\n",
            overlay.path().display(),
            fixtures()
        ),
    )
    .unwrap();

    let section = StorageSection::load(&config_path).unwrap();
    let storage = StorageController::default().from_section(&section).unwrap();

    assert_eq!(storage.raw_record("henrik-hertz.xml").unwrap().as_ref(), b"<XIP>overlay</XIP>");
    assert!(storage.record("no-date.xml").is_ok());
    assert!(storage.record("nowhere.xml").unwrap_err().is_not_found());

    let ids = storage.record_ids().unwrap();
    assert!(ids.contains(&"extra.xml".to_string()));
    assert!(ids.contains(&"no-date.xml".to_string()));
}

#[test]
fn test_storage_list_with_unknown_type_fails_whole_call() {
    let yaml = format!(
        "storages:\n  - type: folder\n    id: good\n    root: {}\n  - type: does-not-exist\n    id: bad\n",
        fixtures()
    );
    let section = StorageSection::from_yaml(&yaml).unwrap();
    let controller = StorageController::default();

    let err = controller.create_storages(&section.storages).unwrap_err();
    assert!(matches!(err, StorageError::UnknownType(ref t) if t == "does-not-exist"));
    assert!(err.is_config_error());

    assert!(controller.from_section(&section).is_err());
}

#[test]
fn test_missing_root_fails_closed() {
    let section = StorageSection::from_yaml("storage:\n  type: folder\n  id: main\n").unwrap();
    let err = StorageController::default().from_section(&section).unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
}

#[test]
fn test_nonexistent_root_fails_closed() {
    let temp = tempdir().unwrap();
    let config = BackendConfig::new(FOLDER_TYPE)
        .with_option("root", temp.path().join("gone").to_string_lossy().to_string());

    let err = StorageController::default().create_storage(&config).unwrap_err();
    assert!(matches!(err, StorageError::Config(_)));
}

#[test]
fn test_supported_storage_ids_contains_folder() {
    assert!(StorageController::default()
        .supported_storage_ids()
        .contains(FOLDER_TYPE));
}

#[test]
fn test_custom_registry_per_controller() {
    let mut registry = BackendRegistry::with_builtins();
    registry
        .register("archive", |config: &BackendConfig| {
            let mut config = config.clone();
            config.kind = FOLDER_TYPE.to_string();
            config.options.insert("recursive".to_string(), true.into());
            BackendRegistry::global().create(FOLDER_TYPE, &config)
        })
        .unwrap();
    let controller = StorageController::new(Arc::new(registry));

    let ids = controller.supported_storage_ids();
    assert!(ids.contains("archive"));
    assert!(ids.contains(FOLDER_TYPE));
    assert!(!StorageController::default()
        .supported_storage_ids()
        .contains("archive"));

    let storage = controller
        .create_storage(&BackendConfig::new("archive").with_option("root", fixtures()))
        .unwrap();
    assert!(storage.record("henrik-hertz.xml").is_ok());
}
