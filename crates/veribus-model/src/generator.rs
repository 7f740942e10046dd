//! Verification model generator
//!
//! Merges every app's parsed declarations into one verification model:
//! the shared physical shape, per-app state shapes, device wrappers with
//! class contracts substituted down to concrete addresses, and one
//! invariant and one iteration per app keyed by app name.
//!
//! Generation is deterministic - identical parser output yields a
//! byte-identical artifact - and all-or-nothing: name collisions and
//! validation failures abort before any artifact is written, and the
//! artifact itself is written to a temporary file and atomically renamed
//! into place, so a partial artifact never exists at the output path.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use thiserror::Error;

use veribus_core::{
    check_all_invariants, AppModel, AppName, BindError, DeviceWrapper, InvariantViolation,
    VerificationModel,
};

use crate::parser::ParsedLibrary;

/// Fatal generation error; no artifact is emitted
#[derive(Debug, Error)]
pub enum GenerateError {
    /// Two declarations share an app name
    #[error("app {app} declared twice")]
    DuplicateApp {
        /// Colliding name
        app: AppName,
    },
    /// Two apps declare the same device-instance name
    #[error("device instance {instance} declared by both {first_app} and {second_app}")]
    DeviceNameCollision {
        /// Colliding instance name
        instance: String,
        /// First declaring app
        first_app: AppName,
        /// Second declaring app
        second_app: AppName,
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
    /// A class slot remained unbound while instantiating a wrapper
    #[error("app {app}: instance {instance} of class {class}: slot {slot} is not bound")]
    UnboundSlot {
        /// Declaring app
        app: AppName,
        /// Instance name
        instance: String,
        /// Class name
        class: String,
        /// Unbound slot
        slot: String,
    },
    /// The merged model failed structural validation
    #[error("generated model failed validation ({} violations)", .violations.len())]
    InvalidModel {
        /// All violations, most useful first
        violations: Vec<InvariantViolation>,
    },
    /// Artifact I/O failed
    #[error("failed to write artifact {}: {source}", .path.display())]
    Io {
        /// Artifact path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// Model (de)serialization failed
    #[error("failed to encode model: {0}")]
    Json(#[from] serde_json::Error),
}

/// Merge a parsed library into a verification model.
///
/// Deterministic: the library's maps are ordered, so identical inputs
/// always produce an identical model. Fails without partial output on app
/// or device-instance name collisions, undeclared classes, unbound slots
/// and structural validation failures.
pub fn generate(library: &ParsedLibrary) -> Result<VerificationModel, GenerateError> {
    let mut apps: BTreeMap<AppName, AppModel> = BTreeMap::new();
    // Device instances share one global namespace: the runtime and the
    // offline prover address them by bare instance name.
    let mut instance_owners: BTreeMap<String, AppName> = BTreeMap::new();

    for decl in &library.apps {
        if apps.contains_key(&decl.name) {
            return Err(GenerateError::DuplicateApp {
                app: decl.name.clone(),
            });
        }

        let mut devices = BTreeMap::new();
        for instance in &decl.instances {
            if let Some(first_app) = instance_owners.get(&instance.name) {
                return Err(GenerateError::DeviceNameCollision {
                    instance: instance.name.clone(),
                    first_app: first_app.clone(),
                    second_app: decl.name.clone(),
                });
            }
            instance_owners.insert(instance.name.clone(), decl.name.clone());

            let class = library.classes.get(&instance.class).ok_or_else(|| {
                GenerateError::UndeclaredClass {
                    app: decl.name.clone(),
                    instance: instance.name.clone(),
                    class: instance.class.clone(),
                }
            })?;
            let wrapper = DeviceWrapper::bind(class, instance.bindings.clone()).map_err(
                |BindError::UnboundSlot { slot }| GenerateError::UnboundSlot {
                    app: decl.name.clone(),
                    instance: instance.name.clone(),
                    class: class.name.clone(),
                    slot,
                },
            )?;
            devices.insert(instance.name.clone(), wrapper);
        }

        apps.insert(
            decl.name.clone(),
            AppModel {
                state_shape: decl.state_shape.clone(),
                devices,
                invariant: decl.invariant.clone(),
                iteration: decl.iteration.clone(),
            },
        );
    }

    let model = VerificationModel {
        addresses: library.addresses.clone(),
        apps,
    };

    let violations = check_all_invariants(&model);
    if !violations.is_empty() {
        return Err(GenerateError::InvalidModel { violations });
    }

    Ok(model)
}

/// Canonical artifact encoding: pretty JSON with a trailing newline.
///
/// Every collection in the model is a `BTreeMap`, so this is byte-stable
/// across runs and machines.
pub fn to_canonical_json(model: &VerificationModel) -> Result<String, GenerateError> {
    let mut json = serde_json::to_string_pretty(model)?;
    json.push('\n');
    Ok(json)
}

/// Read a model artifact back.
pub fn load_artifact(path: &Path) -> Result<VerificationModel, GenerateError> {
    let text = fs::read_to_string(path).map_err(|source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// Writes model artifacts to a fixed output path
pub struct Generator {
    output_path: PathBuf,
}

impl Generator {
    /// Generator emitting to `output_path`
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// The path artifacts are written to
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    /// Serialize the model and atomically move it into place. The output
    /// path never holds a partial artifact.
    pub fn write_model(&self, model: &VerificationModel) -> Result<PathBuf, GenerateError> {
        let json = to_canonical_json(model)?;

        let parent = match self.output_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent).map_err(|source| GenerateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;

        let mut tmp = NamedTempFile::new_in(parent).map_err(|source| GenerateError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        tmp.write_all(json.as_bytes())
            .map_err(|source| GenerateError::Io {
                path: self.output_path.clone(),
                source,
            })?;
        tmp.persist(&self.output_path)
            .map_err(|e| GenerateError::Io {
                path: self.output_path.clone(),
                source: e.error,
            })?;

        Ok(self.output_path.clone())
    }
}
