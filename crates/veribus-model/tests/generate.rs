//! End-to-end parse-and-generate tests over an on-disk app library.

use std::collections::BTreeSet;
use std::fs;

use veribus_model::testlib::{write_manifest, TestLibrary, PACKAGE};
use veribus_model::{generate, load_artifact, to_canonical_json, Generator, Parser};

#[test]
fn generation_is_deterministic() {
    let lib = TestLibrary::example();
    let parser = Parser::new(lib.root(), PACKAGE);

    // Two full parse-and-generate runs over the same library.
    let first = generate(&parser.parse().unwrap()).unwrap();
    let second = generate(&parser.parse().unwrap()).unwrap();
    assert_eq!(
        to_canonical_json(&first).unwrap(),
        to_canonical_json(&second).unwrap()
    );

    // And the artifacts on disk are byte-identical.
    let out_a = lib.root().join("generated-a").join("verification_model.json");
    let out_b = lib.root().join("generated-b").join("verification_model.json");
    Generator::new(&out_a).write_model(&first).unwrap();
    Generator::new(&out_b).write_model(&second).unwrap();
    assert_eq!(fs::read(&out_a).unwrap(), fs::read(&out_b).unwrap());
}

#[test]
fn artifact_round_trips() {
    let lib = TestLibrary::example();
    let model = generate(&Parser::new(lib.root(), PACKAGE).parse().unwrap()).unwrap();

    let out = lib.root().join("generated").join("verification_model.json");
    let written = Generator::new(&out).write_model(&model).unwrap();
    assert_eq!(written, out);

    let loaded = load_artifact(&out).unwrap();
    assert_eq!(loaded, model);
}

#[test]
fn wrapper_addresses_and_declared_addresses_round_trip() {
    let lib = TestLibrary::example();
    let parser = Parser::new(lib.root(), PACKAGE);
    let library = parser.parse().unwrap();
    let model = generate(&library).unwrap();

    // Every address referenced by a generated device wrapper exists in the
    // parser's declared address set.
    let mut wrapper_addresses = BTreeSet::new();
    for app in model.apps.values() {
        for wrapper in app.devices.values() {
            wrapper_addresses.extend(wrapper.bindings.values().copied());
        }
    }
    for address in &wrapper_addresses {
        assert!(
            library.addresses.contains_key(address),
            "wrapper references undeclared address {address}"
        );
    }

    // And every declared address is carried into the model's shape.
    for address in library.addresses.keys() {
        assert!(
            model.addresses.contains_key(address),
            "declared address {address} missing from the model"
        );
    }
}

#[test]
fn failed_generation_writes_no_artifact() {
    let lib = TestLibrary::example();
    // Break the lights manifest: invariant references an undeclared field.
    write_manifest(
        &lib.app_dir("lights"),
        r#"{
            "group_addresses": [
                {"address": "0/0/1", "datapoint": "bool"},
                {"address": "0/0/2", "datapoint": "bool"}
            ],
            "devices": [
                {"name": "presence", "class": "binary_sensor", "bindings": {"state": "0/0/1"}},
                {"name": "hall_switch", "class": "switch", "bindings": {"state": "0/0/2"}}
            ],
            "invariant": {"cmp": {"op": "eq", "lhs": {"field": "INT_9"}, "rhs": {"lit": 0}}},
            "iteration": {"rules": []}
        }"#,
    );

    let out = lib.root().join("generated").join("verification_model.json");
    let library = Parser::new(lib.root(), PACKAGE).parse().unwrap();
    let result = generate(&library);
    assert!(result.is_err());

    // Generation aborted before anything reached the output path.
    assert!(!out.exists());
}

#[test]
fn parse_errors_surface_before_generation() {
    let lib = TestLibrary::example();
    write_manifest(
        &lib.app_dir("night_guard"),
        r#"{
            "group_addresses": [
                {"address": "0/0/2", "datapoint": "float"}
            ],
            "invariant": {"lit": true},
            "iteration": {"rules": []}
        }"#,
    );

    let parser = Parser::new(lib.root(), PACKAGE);
    assert!(parser.parse().is_err());
}
