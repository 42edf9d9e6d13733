//! Shared helpers for integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub const LAYOUT: &str = "Account-Account_Layout.layout-meta.xml";
pub const FIELD: &str = "Region__c.field-meta.xml";
pub const PERMISSION_SET: &str = "Account.permissionset-meta.xml";

/// Get the path to a fixture file
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Read a fixture file as text
pub fn fixture(name: &str) -> String {
    fs::read_to_string(fixture_path(name)).unwrap()
}

/// Copy fixtures into a fresh temporary directory, keeping relative paths
pub fn project(files: &[(&str, &str)]) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (relative, name) in files {
        let target = dir.path().join(relative);
        fs::create_dir_all(target.parent().unwrap()).unwrap();
        fs::copy(fixture_path(name), target).unwrap();
    }
    dir
}
