//! Runs every `fixtures/*.json` case through the library.
//!
//! ```text
//! cargo run -p dev-test-runner -- [FILTER_REGEX] [FIXTURE_DIR]
//! ```
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use json_rec::schema_doc::SchemaDoc;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Case {
    #[serde(default)]
    description: Option<String>,
    schema: SchemaDoc,
    #[serde(rename = "type")]
    record_type: String,
    input: Value,
    /// Merged into the built record, in order.
    #[serde(default)]
    patches: Vec<Value>,
    #[serde(default)]
    expect: Option<Value>,
    /// Error kind name, e.g. `MissingField`.
    #[serde(default)]
    expect_error: Option<String>,
}

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let filter = match args.next().map(|src| Regex::new(&src)).transpose() {
        Ok(filter) => filter,
        Err(error) => {
            eprintln!("invalid filter regex: {error}");
            return ExitCode::FAILURE;
        }
    };
    let dir = args.next().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("fixtures"));

    let cases = match fixture_paths(&dir) {
        Ok(cases) => cases,
        Err(error) => {
            eprintln!("{error:#}");
            return ExitCode::FAILURE;
        }
    };

    let (mut passed, mut failed) = (0usize, 0usize);
    for path in cases {
        let name = path.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
        if filter.as_ref().is_some_and(|re| !re.is_match(&name)) {
            continue;
        }
        match run_case(&path) {
            Ok(()) => {
                passed += 1;
                println!("PASS {name}");
            }
            Err(error) => {
                failed += 1;
                println!("FAIL {name}: {error:#}");
            }
        }
    }

    println!("{passed} passed, {failed} failed");
    if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn fixture_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read fixture directory {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect::<Vec<_>>();
    out.sort();
    Ok(out)
}

fn load_case(path: &Path) -> Result<Case> {
    let src = std::fs::read_to_string(path)?;
    let de = &mut serde_json::Deserializer::from_str(&src);
    serde_path_to_error::deserialize(de)
        .map_err(|error| anyhow!("invalid case at {}: {}", error.path(), error.inner()))
}

fn run_case(path: &Path) -> Result<()> {
    let case = load_case(path)?;
    if let Some(description) = &case.description {
        println!("  {description}");
    }
    let registry = case.schema.into_registry()?;

    let outcome = registry.from_dict(&case.record_type, &case.input).and_then(|mut record| {
        for patch in &case.patches {
            registry.update_record(&mut record, patch)?;
        }
        Ok(registry.to_dict(&record))
    });

    match (outcome, case.expect, case.expect_error) {
        (Ok(actual), Some(expect), None) => {
            if actual != expect {
                bail!(
                    "output mismatch\n  expected: {}\n  actual:   {}",
                    serde_json::to_string(&expect)?,
                    serde_json::to_string(&actual)?,
                );
            }
            Ok(())
        }
        (Err(error), None, Some(kind)) => {
            if error.kind() != kind {
                bail!("expected a {kind} error, got {}: {error}", error.kind());
            }
            Ok(())
        }
        (Ok(actual), None, Some(kind)) => {
            bail!("expected a {kind} error, got {}", serde_json::to_string(&actual)?)
        }
        (Err(error), Some(_), None) => Err(error).context("unexpected error"),
        _ => bail!("a case needs exactly one of `expect` and `expect_error`"),
    }
}
