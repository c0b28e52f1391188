//! Minimal CLI: load JSON objects as association lists → (normalize | keys | get | query)
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use assoc_bridge::{AssocList, ListOptions, Value};
use clap::{Args, Parser, Subcommand};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// load JSON objects into ordered association lists and print them back in various forms
#[derive(Parser, Debug)]
pub struct CommandLineInterface {
    /// log bridge and container decisions to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// load and re-emit as JSON, applying the list policy
    Normalize(NormalizeOut),
    /// print the top-level keys in order
    Keys(KeysOut),
    /// print the JSON of a dotted key path (e.g. server.tls.cert)
    Get(GetOut),
    /// render the top level as a form-urlencoded query string
    Query(QueryOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// reject repeated keys (see --overwrite)
    #[arg(long, default_value_t = false)]
    unique_keys: bool,

    /// require every key to be an identifier (letter or '_' first)
    #[arg(long, default_value_t = false)]
    identifier_keys: bool,

    /// with --unique-keys, a repeated key replaces the earlier value in place
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// JSON Pointer to select a subnode in each document (e.g. /data/items/0/payload)
    #[arg(long)]
    json_pointer: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct NormalizeOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// indent the output
    #[arg(long, default_value_t = false)]
    pretty: bool,

    /// output file (stdout if omitted); with several inputs, outputs are newline-delimited
    #[arg(short, long)]
    out: Option<PathBuf>,
}

#[derive(clap::Parser, Debug)]
struct KeysOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

#[derive(clap::Parser, Debug)]
struct GetOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// dotted key path
    #[arg(long)]
    path: String,
}

#[derive(clap::Parser, Debug)]
struct QueryOut {
    #[command(flatten)]
    input_settings: InputSettings,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    fn options(&self) -> ListOptions {
        ListOptions::permissive()
            .unique_keys(self.unique_keys)
            .identifier_keys_only(self.identifier_keys)
            .overwrite_on_duplicate(self.overwrite)
    }

    fn load_process(&self, mut apply: impl FnMut(&str, AssocList) -> Result<()>) -> Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .map_err(|error| anyhow!("failed to resolve input file paths: {error}"))?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file ({source_path_str})"))?;
            let list = match self.json_pointer.as_deref() {
                None => AssocList::from_json_str(&source, self.options()),
                Some(pointer) => {
                    let json = serde_json::from_str::<serde_json::Value>(&source)
                        .with_context(|| format!("failed to parse JSON source file ({source_path_str})"))?;
                    let selected = json.pointer(pointer).ok_or_else(|| {
                        anyhow!("JSON pointer {pointer} selects nothing in ({source_path_str})")
                    })?;
                    AssocList::from_json_str(&selected.to_string(), self.options())
                }
            };
            let list = list.with_context(|| format!("failed to load ({source_path_str})"))?;
            tracing::debug!(path = %source_path_str, entries = list.len(), "loaded");
            apply(&source_path_str, list)?;
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> Result<()> {
        match &self.cmd {
            Command::Normalize(target) => {
                let mut rendered = Vec::new();
                target.input_settings.load_process(|_, list| {
                    let text = if target.pretty {
                        assoc_bridge::to_json_pretty(&list)?
                    } else {
                        assoc_bridge::to_json(&list)?
                    };
                    rendered.push(text);
                    Ok(())
                })?;
                let output = rendered.join("\n");
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &output)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{output}");
                }
            }
            Command::Keys(target) => {
                target.input_settings.load_process(|_, list| {
                    for key in list.keys() {
                        println!("{key}");
                    }
                    Ok(())
                })?;
            }
            Command::Get(target) => {
                target.input_settings.load_process(|source, list| {
                    let value = lookup_path(&list, &target.path)
                        .ok_or_else(|| anyhow!("{} not found in ({source})", target.path))?;
                    println!("{value}");
                    Ok(())
                })?;
            }
            Command::Query(target) => {
                target.input_settings.load_process(|_, list| {
                    println!("{}", list.query_string()?);
                    Ok(())
                })?;
            }
        }
        Ok(())
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

/// Follows `a.b.c` through nested lists; numeric segments index arrays.
fn lookup_path<'a>(list: &'a AssocList, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = list.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::List(inner) => inner.get(segment)?,
            Value::Array(xs) => xs.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn resolve_file_path_patterns<I>(patterns: I) -> Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
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
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
