//! Veribus Model - App Library Parser and Model Generator
//!
//! Build-time half of Veribus: reads every app's declarations (group
//! addresses with types, device instances, contract-annotated device
//! classes, invariants and iteration rules) from an app library directory
//! and merges them into the single verification model consumed by both
//! the offline prover and the runtime verifier.
//!
//! Apps are authored in isolation and cannot see each other's contracts;
//! this crate is where their declarations first meet, so it is also where
//! cross-app conflicts are caught: address type conflicts at parse time,
//! name collisions and structural validation failures at generation time.
//! All failures are fatal and happen before any artifact is written.
//!
//! - `parser` - reads `classes.json` and per-app `app.json` manifests
//! - `generator` - merges declarations, validates, emits the canonical
//!   artifact (atomic write, byte-identical across runs)
//! - `testlib` - on-disk library fixtures for tests

pub mod generator;
pub mod parser;
pub mod testlib;

pub use generator::{generate, load_artifact, to_canonical_json, GenerateError, Generator};
pub use parser::{
    AppDecl, DeviceInstance, ParseError, ParsedLibrary, Parser, CLASSES_FILE, MANIFEST_FILE,
};
