//! Configuration Tests
//!
//! `recordfake.toml` handling: default file creation, custom values flowing
//! into a context, and rejection of invalid files.

use crate::common::*;
use recordfake::{Context, ContextConfig, Error, NoSchema, QueryExpression, CONFIG_FILE_NAME};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_open_writes_default_config() {
    let dir = TempDir::new().unwrap();
    let ctx = Context::open(dir.path(), Arc::new(NoSchema)).unwrap();

    let path = dir.path().join(CONFIG_FILE_NAME);
    assert!(path.exists());
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        ContextConfig::default_toml()
    );
    assert_eq!(ctx.config(), &ContextConfig::default());
}

#[test]
fn test_open_reads_existing_config() {
    let dir = TempDir::new().unwrap();
    let config = ContextConfig {
        default_page_size: 2,
        ..ContextConfig::default()
    };
    config
        .write_to_file(&dir.path().join(CONFIG_FILE_NAME))
        .unwrap();

    let ctx = Context::open(dir.path(), Arc::new(NoSchema)).unwrap();
    assert_eq!(ctx.config().default_page_size, 2);

    for name in ["a", "b", "c"] {
        account(&ctx, name);
    }
    let page = ctx
        .retrieve_multiple(&QueryExpression::new("account").into())
        .unwrap();
    assert_eq!(page.records.len(), 2);
    assert!(page.more_records);
}

#[test]
fn test_write_default_keeps_existing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join(CONFIG_FILE_NAME);
    std::fs::write(&path, "max_hierarchy_depth = 7\n").unwrap();

    ContextConfig::write_default_if_missing(&path).unwrap();
    let config = ContextConfig::from_file(&path).unwrap();
    assert_eq!(config.max_hierarchy_depth, 7);
    assert_eq!(config.default_page_size, 5000);
}

#[test]
fn test_invalid_config_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join(CONFIG_FILE_NAME), "default_page_size = [").unwrap();
    let err = Context::open(dir.path(), Arc::new(NoSchema)).err().unwrap();
    assert!(matches!(err, Error::Config { .. }));
}

#[test]
fn test_missing_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let err = ContextConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
}
