//! CLI: load | patch | check | schema
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde_json::Value;
use tracing::debug;

use json_rec::schema_doc::SchemaDoc;
use json_rec::{json_schema, Registry, RequiredCheck};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// build typed records from JSON documents, merge partial updates into them, and project them back
#[derive(Parser, Debug)]
#[command(name = "json-rec", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// build a record from each input document and print its projection
    Load(LoadOut),
    /// build a record from --base, then merge every input document into it, in order
    Patch(PatchOut),
    /// build a record from every input document and report the failures
    Check(CheckOut),
    /// print a JSON Schema for the record type
    Schema(SchemaOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// schema document declaring the record types
    #[arg(long, short)]
    schema: PathBuf,

    /// record type to build
    #[arg(long = "type", short = 't')]
    record_type: String,

    /// only check required fields on the top-level record (overrides the schema document)
    #[arg(long, default_value_t = false)]
    shallow_required: bool,

    /// leave the `__type__` tag out of projected output (overrides the schema document)
    #[arg(long, default_value_t = false)]
    no_type_tag: bool,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document; every output becomes a document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct LoadOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct PatchOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// JSON document the record is first built from
    #[arg(long)]
    base: PathBuf,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct SchemaOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,
}

/// One input document and where it came from (`file`, `file:line`, `file#n`).
#[derive(Debug, Clone)]
struct Document {
    source: String,
    value: Value,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn registry(&self) -> Result<Registry> {
        let src = std::fs::read_to_string(&self.schema)
            .with_context(|| format!("failed to read schema document {}", self.schema.display()))?;
        let doc = SchemaDoc::parse(&src)
            .with_context(|| format!("invalid schema document {}", self.schema.display()))?;
        let mut registry = doc.into_registry()?;
        if self.shallow_required {
            registry.options_mut().required = RequiredCheck::Shallow;
        }
        if self.no_type_tag {
            registry.options_mut().emit_type_tag = false;
        }
        if !registry.is_record_type(&self.record_type) {
            bail!("schema document does not declare record type `{}`", self.record_type);
        }
        debug!(options = ?registry.options(), "schema loaded");
        Ok(registry)
    }
}

impl InputSettings {
    fn load_documents(&self) -> Result<Vec<Document>> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .map_err(|error| anyhow!("failed to resolve input file paths: {error}"))?;
        let mut out = Vec::new();
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            if self.ndjson {
                for (ix, line) in source.lines().enumerate() {
                    if line.trim().is_empty() {
                        continue;
                    }
                    let label = format!("{source_path_str}:{}", ix + 1);
                    let json_value = serde_json::from_str::<Value>(line)
                        .with_context(|| format!("failed to parse JSON ({label})"))?;
                    self.select(label, json_value, &mut out)?;
                }
            } else {
                let json_value = serde_json::from_str::<Value>(&source)
                    .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                self.select(source_path_str, json_value, &mut out)?;
            }
        }
        Ok(out)
    }

    /// Apply the JSON pointer, then the jq filter.
    fn select(&self, label: String, json_value: Value, out: &mut Vec<Document>) -> Result<()> {
        let json_value = match self.json_pointer.as_deref() {
            None => json_value,
            Some(ptr) => json_value
                .pointer(ptr)
                .cloned()
                .ok_or_else(|| anyhow!("JSON pointer {ptr} matched nothing in {label}"))?,
        };
        match self.jq_expr.as_ref() {
            None => out.push(Document { source: label, value: json_value }),
            Some(jq_expr) => {
                let results = crate::jq_exec::run_jaq(jq_expr, &json_value)
                    .with_context(|| format!("failed to apply jq expression to {label}"))?;
                for (ix, value) in results.into_iter().enumerate() {
                    out.push(Document { source: format!("{label}#{ix}"), value });
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Load(target) => {
                let settings = &target.schema_settings;
                let registry = settings.registry()?;
                let docs = target.input_settings.load_documents()?;
                let mut projected = Vec::with_capacity(docs.len());
                for doc in &docs {
                    let record = registry
                        .from_dict(&settings.record_type, &doc.value)
                        .with_context(|| format!("failed to build `{}` from {}", settings.record_type, doc.source))?;
                    projected.push(registry.to_dict(&record));
                }
                let output = match projected.len() {
                    1 => projected.remove(0),
                    _ => Value::Array(projected),
                };
                write_json(target.out.as_deref(), &output)?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Patch(target) => {
                let settings = &target.schema_settings;
                let registry = settings.registry()?;
                let base_src = std::fs::read_to_string(&target.base)
                    .with_context(|| format!("failed to read base document {}", target.base.display()))?;
                let base = serde_json::from_str::<Value>(&base_src)
                    .with_context(|| format!("failed to parse base document {}", target.base.display()))?;
                let mut record = registry
                    .from_dict(&settings.record_type, &base)
                    .with_context(|| format!("failed to build `{}` from the base document", settings.record_type))?;
                for doc in target.input_settings.load_documents()? {
                    registry
                        .update_record(&mut record, &doc.value)
                        .with_context(|| format!("failed to apply patch {}", doc.source))?;
                }
                write_json(target.out.as_deref(), &registry.to_dict(&record))?;
                Ok(ExitCode::SUCCESS)
            }
            Command::Check(target) => {
                let settings = &target.schema_settings;
                let registry = settings.registry()?;
                let docs = target.input_settings.load_documents()?;

                // independent documents, shared read-only registry
                let results = docs
                    .par_iter()
                    .map(|doc| (doc, registry.from_dict(&settings.record_type, &doc.value)))
                    .collect::<Vec<_>>();

                let mut failed = 0usize;
                for (doc, result) in &results {
                    match result {
                        Ok(_) => println!("{} {}", "ok  ".green(), doc.source),
                        Err(error) => {
                            failed += 1;
                            println!("{} {} ({}): {error}", "FAIL".red().bold(), doc.source, error.kind());
                        }
                    }
                }
                let summary = format!("{} passed, {failed} failed", results.len() - failed);
                if failed == 0 {
                    println!("{}", summary.green());
                    Ok(ExitCode::SUCCESS)
                } else {
                    println!("{}", summary.red());
                    Ok(ExitCode::FAILURE)
                }
            }
            Command::Schema(target) => {
                let settings = &target.schema_settings;
                let registry = settings.registry()?;
                let schema = json_schema::schema_for(&registry, &settings.record_type)?;
                write_json(target.out.as_deref(), &schema)?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn write_json(out: Option<&Path>, value: &Value) -> Result<()> {
    let src = serde_json::to_string_pretty(value)?;
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, &src).with_context(|| format!("failed to write {}", out.display()))?;
        }
        None => println!("{src}"),
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{' ))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                match entry {
                    Ok(p) => {
                        matched_any = true;
                        out.push(p);
                    }
                    Err(e) => return Err(Box::new(e)),
                }
            }
            if !matched_any {
                return Err(format!("glob pattern matched no files: {pattern}").into());
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CommandLineInterface::command().debug_assert();
    }

    #[test]
    fn parses_patch_invocation() {
        let cli = CommandLineInterface::try_parse_from([
            "json-rec", "patch", "-s", "schema.json", "-t", "Person",
            "--base", "base.json", "-i", "p1.json", "p2.json", "--no-type-tag",
        ])
        .unwrap();
        match cli.cmd {
            Command::Patch(p) => {
                assert_eq!(p.schema_settings.record_type, "Person");
                assert!(p.schema_settings.no_type_tag);
                assert_eq!(p.input_settings.input, ["p1.json", "p2.json"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn literal_paths_pass_through_unglobbed() {
        let paths = resolve_file_path_patterns(["a.json", "dir/b.json"]).unwrap();
        assert_eq!(paths, [PathBuf::from("a.json"), PathBuf::from("dir/b.json")]);
    }
}
