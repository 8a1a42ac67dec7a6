//! CLI output formatting utilities.
//!
//! Colored status messages for the terminal, plus the `name=value` files
//! GitHub Actions reads step outputs and exported variables from.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const INFO: &str = "•";
  pub const ARROW: &str = "→";
}

pub fn truncate_hash(hash: &str) -> &str {
  let len = hash.len().min(12);
  &hash[..len]
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

/// Format pairs as `name=value` lines.
pub fn format_pairs(pairs: &[(String, String)]) -> String {
  pairs.iter().map(|(name, value)| format!("{}={}\n", name, value)).collect()
}

/// Append `name=value` lines to `file`.
pub fn append_pairs(file: &Path, pairs: &[(String, String)]) -> anyhow::Result<()> {
  let mut handle = OpenOptions::new()
    .create(true)
    .append(true)
    .open(file)
    .with_context(|| format!("Failed to open {}", file.display()))?;
  handle
    .write_all(format_pairs(pairs).as_bytes())
    .with_context(|| format!("Failed to write {}", file.display()))?;
  Ok(())
}

/// Write pairs to the file named by the environment variable `var`
/// (`GITHUB_OUTPUT`, `GITHUB_ENV`), or print them when it is unset.
pub fn emit_pairs(var: &str, pairs: &[(String, String)]) -> anyhow::Result<()> {
  match std::env::var_os(var).filter(|v| !v.is_empty()) {
    Some(file) => append_pairs(Path::new(&file), pairs),
    None => {
      print!("{}", format_pairs(pairs));
      Ok(())
    }
  }
}
