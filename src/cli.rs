//! CLI: check JSON documents against a description (check | describe)
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use checktype::{check_json, Error, Schema, TypeId, TypeMismatch};

use crate::jq::JqFilter;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// check JSON/NDJSON documents against a type description and print the corrected documents
#[derive(Parser, Debug)]
#[command(name = "checktype", version, about)]
pub struct CommandLineInterface {
    /// more logging; repeat for more (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// check every input document and print the coerced result
    Check(CheckOut),
    /// parse a description and print it back
    Describe(DescribeOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON); output is NDJSON too
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns or '-' for stdin
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct CheckOut {
    /// description file, in JSON notation
    #[arg(long)]
    schema: PathBuf,

    #[command(flatten)]
    input_settings: InputSettings,

    /// output file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// also write every mismatch to this file as a JSON array
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct DescribeOut {
    /// description file, in JSON notation
    #[arg(long)]
    schema: PathBuf,
}

/// One input document, labelled for the report.
#[derive(Debug)]
struct Document {
    label: String,
    value: Value,
}

/// A `--report` entry.
#[derive(Debug, Serialize)]
struct Failure {
    document: String,
    message: String,
    #[serde(flatten)]
    mismatch: TypeMismatch,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn load(&self) -> Result<Vec<Document>> {
        let filter = self.jq_expr.as_deref().map(JqFilter::compile).transpose()?;
        let mut docs = Vec::new();
        for source_path in resolve_file_path_patterns(&self.input)? {
            let label = source_path.display().to_string();
            let source = read_source(&source_path)?;
            for (label, value) in self.parse(&label, &source)? {
                let value = match self.json_pointer.as_deref() {
                    Some(ptr) => value
                        .pointer(ptr)
                        .cloned()
                        .with_context(|| format!("{label}: nothing at JSON pointer {ptr}"))?,
                    None => value,
                };
                match filter.as_ref() {
                    None => docs.push(Document { label, value }),
                    Some(filter) => {
                        let outputs = filter
                            .run(&value)
                            .with_context(|| format!("failed to apply jq expression to {label}"))?;
                        for (i, value) in outputs.into_iter().enumerate() {
                            docs.push(Document { label: format!("{label}#{i}"), value });
                        }
                    }
                }
            }
        }
        debug!(documents = docs.len(), "inputs loaded");
        Ok(docs)
    }

    fn parse(&self, label: &str, source: &str) -> Result<Vec<(String, Value)>> {
        if !self.ndjson {
            let value = serde_json::from_str(source)
                .with_context(|| format!("failed to parse JSON source file ({label})"))?;
            return Ok(vec![(label.to_string(), value)]);
        }
        source
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(i, line)| {
                let label = format!("{label}:{}", i + 1);
                let value = serde_json::from_str(line)
                    .with_context(|| format!("failed to parse NDJSON line ({label})"))?;
                Ok((label, value))
            })
            .collect()
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<ExitCode> {
        match &self.cmd {
            Command::Check(target) => {
                let matched = target.run()?;
                Ok(if matched { ExitCode::SUCCESS } else { ExitCode::FAILURE })
            }
            Command::Describe(target) => {
                let (schema, root) = load_schema(&target.schema)?;
                println!("{}", schema.render(root));
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

impl CheckOut {
    /// True when every document matched.
    fn run(&self) -> Result<bool> {
        let (schema, root) = load_schema(&self.schema)?;
        let docs = self.input_settings.load()?;
        info!(documents = docs.len(), schema = %self.schema.display(), "checking");

        let results: Vec<(String, Result<Value, Error>)> = docs
            .into_par_iter()
            .map(|doc| {
                let result = check_json(&doc.value, &schema, root);
                (doc.label, result)
            })
            .collect();

        let total = results.len();
        let mut accepted = Vec::with_capacity(total);
        let mut failures = Vec::new();
        for (label, result) in results {
            match result {
                Ok(value) => accepted.push(value),
                Err(Error::Mismatch(mismatch)) => {
                    eprintln!("{} {label}: {mismatch}", "✗".red().bold());
                    failures.push(Failure { document: label, message: mismatch.to_string(), mismatch });
                }
                Err(error) => return Err(error).with_context(|| format!("cannot check {label}")),
            }
        }
        let failed = failures.len();

        let rendered = self.render(&accepted)?;
        write_output(self.out.as_deref(), &rendered)?;
        if let Some(report) = self.report.as_deref() {
            let text = serde_json::to_string_pretty(&failures)?;
            write_output(Some(report), &format!("{text}\n"))?;
        }

        if failed == 0 {
            eprintln!("{} {total} document(s) matched", "✓".green().bold());
        } else {
            eprintln!("{} {failed} of {total} document(s) failed", "✗".red().bold());
        }
        Ok(failed == 0)
    }

    fn render(&self, values: &[Value]) -> Result<String> {
        let mut out = String::new();
        for value in values {
            let text = if self.input_settings.ndjson {
                serde_json::to_string(value)?
            } else {
                serde_json::to_string_pretty(value)?
            };
            out.push_str(&text);
            out.push('\n');
        }
        Ok(out)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn load_schema(path: &Path) -> Result<(Schema, TypeId)> {
    let source = read_source(path)?;
    let notation: Value = serde_json::from_str(&source)
        .with_context(|| format!("failed to parse description ({})", path.display()))?;
    Schema::from_notation(&notation).with_context(|| format!("invalid description ({})", path.display()))
}

fn read_source(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return std::io::read_to_string(std::io::stdin()).context("failed to read stdin");
    }
    std::fs::read_to_string(path).with_context(|| format!("failed to read source file {}", path.display()))
}

fn write_output(out: Option<&Path>, text: &str) -> Result<()> {
    match out {
        Some(out) => {
            if let Some(parent) = out.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(out, text).with_context(|| format!("failed to write {}", out.display()))
        }
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // an explicit glob that matched nothing is an error
                anyhow::bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
