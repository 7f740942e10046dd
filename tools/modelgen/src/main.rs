//! Model generation entrypoint
//!
//! Parses an app library package and writes the merged verification model
//! artifact to the fixed output path under the source directory. Prints
//! the artifact path on success; exits non-zero on any parse or
//! generation failure, leaving no partial artifact behind.

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use veribus_model::{generate, Generator, Parser};

/// Artifact location, relative to the source directory
const ARTIFACT_PATH: &str = "generated/verification_model.json";

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let (source_dir, package) = match args.as_slice() {
        [_, source_dir, package] => (PathBuf::from(source_dir), package.as_str()),
        _ => {
            eprintln!("usage: modelgen <source-dir> <package>");
            return ExitCode::from(2);
        }
    };

    let parser = Parser::new(&source_dir, package);
    let library = match parser.parse() {
        Ok(library) => library,
        Err(e) => {
            eprintln!("modelgen: {e}");
            return ExitCode::FAILURE;
        }
    };

    let model = match generate(&library) {
        Ok(model) => model,
        Err(e) => {
            eprintln!("modelgen: {e}");
            return ExitCode::FAILURE;
        }
    };

    match Generator::new(source_dir.join(ARTIFACT_PATH)).write_model(&model) {
        Ok(path) => {
            println!("{}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("modelgen: {e}");
            ExitCode::FAILURE
        }
    }
}
