// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Vela Contributors

use super::*;

#[test]
fn absolute_path_passes_through_unchanged() {
    let resolved = resolve_path("/tmp/helper.vl", Some("/home/user/main.vl"));
    assert_eq!(resolved, PathBuf::from("/tmp/helper.vl"));
}

#[test]
fn relative_path_resolves_against_importer_directory() {
    let resolved = resolve_path("helper.vl", Some("/home/user/project/main.vl"));
    assert_eq!(resolved, PathBuf::from("/home/user/project/helper.vl"));
}

#[test]
fn relative_path_with_no_importer_is_left_as_is() {
    let resolved = resolve_path("helper.vl", None);
    assert_eq!(resolved, PathBuf::from("helper.vl"));
}

#[test]
fn importer_with_no_parent_directory_leaves_path_unchanged() {
    let resolved = resolve_path("helper.vl", Some("main.vl"));
    assert_eq!(resolved, PathBuf::from("helper.vl"));
}

#[test]
fn nested_relative_path_joins_under_importer_directory() {
    let resolved = resolve_path("../lib/helper.vl", Some("/home/user/project/main.vl"));
    assert_eq!(resolved, PathBuf::from("/home/user/project/../lib/helper.vl"));
}
