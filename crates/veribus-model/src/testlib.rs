//! Test fixtures for parser and generator tests.
//!
//! Builds a small on-disk app library in a temporary directory: a presence
//! sensor and a hall switch shared by a `lights` app (switch mirrors the
//! sensor or its INT_0 counter reaching 42) and a `night_guard` app that
//! forbids the switch being on.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Package name used by all fixtures
pub const PACKAGE: &str = "app_library";

const CLASSES: &str = r#"{
  "classes": [
    {
      "name": "binary_sensor",
      "methods": {
        "is_on": {
          "post": {"cmp": {"op": "eq", "lhs": {"slot": "state"}, "rhs": "result"}},
          "body": {"read": {"slot": "state"}}
        }
      }
    },
    {
      "name": "switch",
      "methods": {
        "on": {
          "post": {"slot": "state"},
          "body": {"write": {"slot": "state", "value": true}}
        },
        "off": {
          "post": {"not": {"slot": "state"}},
          "body": {"write": {"slot": "state", "value": false}}
        },
        "is_on": {
          "post": {"cmp": {"op": "eq", "lhs": {"slot": "state"}, "rhs": "result"}},
          "body": {"read": {"slot": "state"}}
        }
      }
    }
  ]
}"#;

const LIGHTS: &str = r#"{
  "group_addresses": [
    {"address": "0/0/1", "datapoint": "bool"},
    {"address": "0/0/2", "datapoint": "bool"}
  ],
  "state": {"INT_0": {"datapoint": "int"}},
  "devices": [
    {"name": "presence", "class": "binary_sensor", "bindings": {"state": "0/0/1"}},
    {"name": "hall_switch", "class": "switch", "bindings": {"state": "0/0/2"}}
  ],
  "invariant": {
    "cmp": {
      "op": "eq",
      "lhs": {
        "any": [
          {"read": {"instance": "presence", "method": "is_on"}},
          {"cmp": {"op": "eq", "lhs": {"field": "INT_0"}, "rhs": {"lit": 42}}}
        ]
      },
      "rhs": {"read": {"instance": "hall_switch", "method": "is_on"}}
    }
  },
  "iteration": {
    "rules": [
      {
        "when": {
          "any": [
            {"read": {"instance": "presence", "method": "is_on"}},
            {"cmp": {"op": "eq", "lhs": {"field": "INT_0"}, "rhs": {"lit": 42}}}
          ]
        },
        "then": [{"invoke": {"instance": "hall_switch", "method": "on"}}],
        "otherwise": [{"invoke": {"instance": "hall_switch", "method": "off"}}]
      }
    ]
  }
}"#;

const NIGHT_GUARD: &str = r#"{
  "group_addresses": [
    {"address": "0/0/2", "datapoint": "bool"}
  ],
  "invariant": {"not": {"address": "0/0/2"}},
  "iteration": {"rules": []}
}"#;

/// An app library rooted in a temporary directory
pub struct TestLibrary {
    dir: TempDir,
}

impl TestLibrary {
    /// The two-app example library
    pub fn example() -> Self {
        let lib = Self::empty();
        write_manifest(&lib.app_dir("lights"), LIGHTS);
        write_manifest(&lib.app_dir("night_guard"), NIGHT_GUARD);
        lib
    }

    /// A package with the class catalog but no apps
    pub fn empty() -> Self {
        let dir = TempDir::new().expect("create temp library");
        let lib = Self { dir };
        fs::create_dir_all(lib.package_dir()).expect("create package dir");
        write_classes(&lib.package_dir(), CLASSES);
        lib
    }

    /// Library root (the parser's source directory)
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// The package directory
    pub fn package_dir(&self) -> PathBuf {
        self.dir.path().join(PACKAGE)
    }

    /// An app's directory, created on first use
    pub fn app_dir(&self, name: &str) -> PathBuf {
        let dir = self.package_dir().join(name);
        fs::create_dir_all(&dir).expect("create app dir");
        dir
    }
}

/// (Over)write an app manifest
pub fn write_manifest(app_dir: &Path, json: &str) {
    fs::write(app_dir.join(crate::parser::MANIFEST_FILE), json).expect("write app manifest");
}

/// (Over)write the class catalog
pub fn write_classes(package_dir: &Path, json: &str) {
    fs::write(package_dir.join(crate::parser::CLASSES_FILE), json).expect("write class catalog");
}
