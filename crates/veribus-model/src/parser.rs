//! App library parser
//!
//! Reads the declarations of every app in a library directory:
//!
//! ```text
//! <root>/<package>/classes.json      shared device-class catalog
//! <root>/<package>/<app>/app.json    one manifest per app
//! ```
//!
//! Each manifest declares the app's group addresses with types, its
//! private state shape, its device instances with slot bindings, its
//! safety invariant and its iteration rules. Apps are authored in
//! isolation; the parser is where cross-app declaration conflicts (the
//! same address declared with different types) surface, before any
//! generation begins.
//!
//! App directories are visited in name order, so parsing is deterministic
//! regardless of filesystem iteration order.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use thiserror::Error;

use veribus_core::{
    AddressSpec, AppName, DatapointType, DeviceClass, Expr, FieldSpec, GroupAddress, Iteration,
    Value,
};

/// File name of the shared device-class catalog
pub const CLASSES_FILE: &str = "classes.json";
/// File name of a per-app manifest
pub const MANIFEST_FILE: &str = "app.json";

/// Configuration error while reading an app library
#[derive(Debug, Error)]
pub enum ParseError {
    /// File or directory could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Malformed JSON
    #[error("malformed declarations in {}: {source}", .path.display())]
    Json {
        /// Offending path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: serde_json::Error,
    },
    /// The package directory contains no app manifests
    #[error("no app manifests under {}", .path.display())]
    NoApps {
        /// Package directory
        path: PathBuf,
    },
    /// Two catalog entries share a name
    #[error("device class {class} declared twice")]
    DuplicateClass {
        /// Class name
        class: String,
    },
    /// An instance references a class the catalog does not declare
    #[error("app {app}: device instance {instance} references undeclared class {class}")]
    UndeclaredClass {
        /// Declaring app
        app: AppName,
        /// Instance name
        instance: String,
        /// Missing class
        class: String,
    },
    /// The same address is declared with different types
    #[error(
        "group address {address} declared as {first} by {first_app} and as {second} by {second_app}"
    )]
    AddressTypeConflict {
        /// Conflicting address
        address: GroupAddress,
        /// First declared type
        first: DatapointType,
        /// App that declared it first
        first_app: AppName,
        /// Second declared type
        second: DatapointType,
        /// App that declared it second
        second_app: AppName,
    },
    /// The same address is declared with different defaults
    #[error("group address {address} declared with conflicting defaults by {first_app} and {second_app}")]
    AddressDefaultConflict {
        /// Conflicting address
        address: GroupAddress,
        /// App that declared it first
        first_app: AppName,
        /// App that declared it second
        second_app: AppName,
    },
    /// A declared default does not conform to the declared type
    #[error("app {app}: default for {name} does not conform to declared type {datapoint}")]
    DefaultTypeMismatch {
        /// Declaring app
        app: AppName,
        /// Address or field name
        name: String,
        /// Declared type
        datapoint: DatapointType,
    },
    /// An instance misses a slot its class requires
    #[error("app {app}: instance {instance} does not bind slot {slot} of class {class}")]
    MissingSlotBinding {
        /// Declaring app
        app: AppName,
        /// Instance name
        instance: String,
        /// Class name
        class: String,
        /// Unbound slot
        slot: String,
    },
    /// An instance binds a slot its class does not define
    #[error("app {app}: instance {instance} binds unknown slot {slot} of class {class}")]
    UnknownSlotBinding {
        /// Declaring app
        app: AppName,
        /// Instance name
        instance: String,
        /// Class name
        class: String,
        /// Unknown slot
        slot: String,
    },
}

/// A declared device instance: a class bound to concrete addresses
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct DeviceInstance {
    /// Instance name (global namespace across apps)
    pub name: String,
    /// Class name
    pub class: String,
    /// Slot to address bindings
    pub bindings: BTreeMap<String, GroupAddress>,
}

/// Everything one app declares
#[derive(Clone, Debug, PartialEq)]
pub struct AppDecl {
    /// App name (the library subdirectory name)
    pub name: AppName,
    /// Declared addresses with types and defaults
    pub addresses: BTreeMap<GroupAddress, AddressSpec>,
    /// Declared private state shape
    pub state_shape: BTreeMap<String, FieldSpec>,
    /// Declared device instances
    pub instances: Vec<DeviceInstance>,
    /// Safety invariant
    pub invariant: Expr,
    /// Control logic
    pub iteration: Iteration,
}

/// Fully parsed library, ready for generation
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedLibrary {
    /// Device class catalog by name
    pub classes: BTreeMap<String, DeviceClass>,
    /// Merged address declarations of all apps
    pub addresses: BTreeMap<GroupAddress, AddressSpec>,
    /// App declarations in name order
    pub apps: Vec<AppDecl>,
}

// ============================================================================
// Manifest wire shapes
// ============================================================================

#[derive(Deserialize)]
struct ClassCatalog {
    classes: Vec<DeviceClass>,
}

#[derive(Deserialize)]
struct AppManifest {
    #[serde(default)]
    group_addresses: Vec<AddressDecl>,
    #[serde(default)]
    state: BTreeMap<String, FieldDecl>,
    #[serde(default)]
    devices: Vec<DeviceInstance>,
    invariant: Expr,
    iteration: Iteration,
}

#[derive(Deserialize)]
struct AddressDecl {
    address: GroupAddress,
    datapoint: DatapointType,
    #[serde(default)]
    default: Option<Value>,
}

#[derive(Deserialize)]
struct FieldDecl {
    datapoint: DatapointType,
    #[serde(default)]
    default: Option<Value>,
}

// ============================================================================
// Parser
// ============================================================================

/// Reads one app library package
pub struct Parser {
    root: PathBuf,
    package: String,
}

impl Parser {
    /// Parser over `<root>/<package>`
    pub fn new(root: impl Into<PathBuf>, package: &str) -> Self {
        Self {
            root: root.into(),
            package: package.into(),
        }
    }

    /// The package directory this parser reads
    pub fn package_dir(&self) -> PathBuf {
        self.root.join(&self.package)
    }

    /// Extract the device-class catalog with its contract-annotated
    /// methods.
    pub fn parse_device_classes(&self) -> Result<BTreeMap<String, DeviceClass>, ParseError> {
        let path = self.package_dir().join(CLASSES_FILE);
        let catalog: ClassCatalog = read_json(&path)?;
        let mut classes = BTreeMap::new();
        for class in catalog.classes {
            let name = class.name.clone();
            if classes.insert(name.clone(), class).is_some() {
                return Err(ParseError::DuplicateClass { class: name });
            }
        }
        Ok(classes)
    }

    /// Extract the full set of declared group addresses with their types,
    /// merged across apps. Fails when two apps disagree on a type or a
    /// default.
    pub fn parse_group_addresses(
        &self,
    ) -> Result<BTreeMap<GroupAddress, AddressSpec>, ParseError> {
        let apps = self.load_apps()?;
        merge_addresses(&apps)
    }

    /// Extract every app's device instances with their bound addresses and
    /// classes. Fails on undeclared classes and slot-binding mismatches.
    pub fn parse_device_instances(
        &self,
    ) -> Result<Vec<(AppName, DeviceInstance)>, ParseError> {
        let classes = self.parse_device_classes()?;
        let apps = self.load_apps()?;
        let mut instances = Vec::new();
        for app in &apps {
            for instance in &app.instances {
                check_instance(app, instance, &classes)?;
                instances.push((app.name.clone(), instance.clone()));
            }
        }
        Ok(instances)
    }

    /// Parse the whole library: classes, merged addresses and every app's
    /// declarations, with all cross-declaration checks applied.
    pub fn parse(&self) -> Result<ParsedLibrary, ParseError> {
        let classes = self.parse_device_classes()?;
        let apps = self.load_apps()?;
        let addresses = merge_addresses(&apps)?;
        for app in &apps {
            for instance in &app.instances {
                check_instance(app, instance, &classes)?;
            }
        }
        Ok(ParsedLibrary {
            classes,
            addresses,
            apps,
        })
    }

    /// Load every app manifest, in app-name order.
    fn load_apps(&self) -> Result<Vec<AppDecl>, ParseError> {
        let package_dir = self.package_dir();
        let entries = fs::read_dir(&package_dir).map_err(|source| ParseError::Io {
            path: package_dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| ParseError::Io {
                path: package_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();

        if names.is_empty() {
            return Err(ParseError::NoApps { path: package_dir });
        }

        let mut apps = Vec::new();
        for name in names {
            let manifest_path = package_dir.join(&name).join(MANIFEST_FILE);
            let manifest: AppManifest = read_json(&manifest_path)?;
            apps.push(into_decl(name, manifest)?);
        }
        Ok(apps)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ParseError> {
    let text = fs::read_to_string(path).map_err(|source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| ParseError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Convert a manifest into an app declaration, checking declared defaults
/// against their declared types.
fn into_decl(name: AppName, manifest: AppManifest) -> Result<AppDecl, ParseError> {
    let mut addresses = BTreeMap::new();
    for decl in manifest.group_addresses {
        let spec = make_spec(&name, &decl.address.to_string(), decl.datapoint, decl.default)?;
        if let Some(existing) = addresses.get(&decl.address) {
            if *existing != spec {
                // The same manifest disagreeing with itself is still a
                // cross-declaration conflict.
                return conflict(&name, &name, decl.address, existing, &spec);
            }
        }
        addresses.insert(decl.address, spec);
    }

    let mut state_shape = BTreeMap::new();
    for (field, decl) in manifest.state {
        let spec = make_spec(&name, &field, decl.datapoint, decl.default)?;
        state_shape.insert(
            field,
            FieldSpec {
                datapoint: spec.datapoint,
                default: spec.default,
            },
        );
    }

    Ok(AppDecl {
        name,
        addresses,
        state_shape,
        instances: manifest.devices,
        invariant: manifest.invariant,
        iteration: manifest.iteration,
    })
}

fn make_spec(
    app: &str,
    name: &str,
    datapoint: DatapointType,
    default: Option<Value>,
) -> Result<AddressSpec, ParseError> {
    let default = default.unwrap_or_else(|| Value::default_for(datapoint));
    if default.datapoint_type() != datapoint {
        return Err(ParseError::DefaultTypeMismatch {
            app: app.into(),
            name: name.into(),
            datapoint,
        });
    }
    Ok(AddressSpec { datapoint, default })
}

fn merge_addresses(
    apps: &[AppDecl],
) -> Result<BTreeMap<GroupAddress, AddressSpec>, ParseError> {
    let mut merged: BTreeMap<GroupAddress, (AddressSpec, AppName)> = BTreeMap::new();
    for app in apps {
        for (address, spec) in &app.addresses {
            match merged.get(address) {
                None => {
                    merged.insert(*address, (spec.clone(), app.name.clone()));
                }
                Some((existing, first_app)) => {
                    if existing != spec {
                        return conflict(first_app, &app.name, *address, existing, spec);
                    }
                }
            }
        }
    }
    Ok(merged
        .into_iter()
        .map(|(address, (spec, _))| (address, spec))
        .collect())
}

fn conflict<T>(
    first_app: &str,
    second_app: &str,
    address: GroupAddress,
    first: &AddressSpec,
    second: &AddressSpec,
) -> Result<T, ParseError> {
    if first.datapoint != second.datapoint {
        Err(ParseError::AddressTypeConflict {
            address,
            first: first.datapoint,
            first_app: first_app.into(),
            second: second.datapoint,
            second_app: second_app.into(),
        })
    } else {
        Err(ParseError::AddressDefaultConflict {
            address,
            first_app: first_app.into(),
            second_app: second_app.into(),
        })
    }
}

fn check_instance(
    app: &AppDecl,
    instance: &DeviceInstance,
    classes: &BTreeMap<String, DeviceClass>,
) -> Result<(), ParseError> {
    let class = classes
        .get(&instance.class)
        .ok_or_else(|| ParseError::UndeclaredClass {
            app: app.name.clone(),
            instance: instance.name.clone(),
            class: instance.class.clone(),
        })?;

    let required = class.slots();
    for slot in &required {
        if !instance.bindings.contains_key(slot) {
            return Err(ParseError::MissingSlotBinding {
                app: app.name.clone(),
                instance: instance.name.clone(),
                class: class.name.clone(),
                slot: slot.clone(),
            });
        }
    }
    for slot in instance.bindings.keys() {
        if !required.contains(slot) {
            return Err(ParseError::UnknownSlotBinding {
                app: app.name.clone(),
                instance: instance.name.clone(),
                class: class.name.clone(),
                slot: slot.clone(),
            });
        }
    }
    Ok(())
}
