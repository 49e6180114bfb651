//! One-shot commands that run the library against a file without a client.

use std::{
  fs,
  io::Write,
  path::Path,
};

use eyre::{
  Result,
  WrapErr,
  bail,
};
use the_lib::{
  annotate,
  document::Document,
  refactor,
};
use the_lsp::ServerConfig;
use tracing::info;

/// Config for a file on disk: its workspace is found from the file's directory.
pub fn config_for(file: &Path, explicit: Option<&Path>) -> Result<ServerConfig> {
  let dir = file
    .parent()
    .filter(|dir| !dir.as_os_str().is_empty())
    .unwrap_or(Path::new("."));
  let (workspace, _) = the_loader::find_workspace_in(dir);
  let value = the_loader::config::load_config(Some(&workspace), explicit)?;
  ServerConfig::from_toml(value).wrap_err("invalid configuration")
}

fn read_document(file: &Path) -> Result<Document> {
  let text =
    fs::read_to_string(file).wrap_err_with(|| format!("failed to read {}", file.display()))?;
  Ok(Document::from(text.as_str()))
}

/// Prints `file` with annotations inserted, or rewrites it in place.
pub fn annotate(
  file: &Path,
  write: bool,
  config: &ServerConfig,
  out: &mut impl Write,
) -> Result<()> {
  let doc = read_document(file)?;
  let transaction = annotate::insert_annotations(&doc, &config.comment_token)?;
  let text = transaction.apply_to(doc.text())?;

  if !write {
    write!(out, "{text}")?;
    return Ok(());
  }
  if transaction.is_empty() {
    info!(file = %file.display(), "nothing to annotate");
    return Ok(());
  }
  fs::write(file, text.to_string())
    .wrap_err_with(|| format!("failed to write {}", file.display()))?;
  info!(file = %file.display(), "annotations written");
  Ok(())
}

/// Lists the refactors offered for `line` (1-based) of `file`.
pub fn actions(file: &Path, line: usize, out: &mut impl Write) -> Result<()> {
  let doc = read_document(file)?;
  if line == 0 || line > doc.len_lines() {
    bail!(
      "line {line} is out of range for {} ({} lines)",
      file.display(),
      doc.len_lines()
    );
  }

  let candidates = refactor::resolve(&doc, line - 1)?;
  if candidates.is_empty() {
    writeln!(out, "no refactors for line {line}")?;
  }
  for (index, candidate) in candidates.iter().enumerate() {
    writeln!(out, "{}. {}", index + 1, candidate.label)?;
    for text_line in candidate.text.lines().filter(|l| !l.is_empty()) {
      writeln!(out, "   {text_line}")?;
    }
  }
  Ok(())
}

#[cfg(test)]
mod test {
  use super::*;

  fn source(dir: &Path, text: &str) -> std::path::PathBuf {
    let file = dir.join("app.js");
    fs::write(&file, text).unwrap();
    file
  }

  #[test]
  fn annotate_prints_without_touching_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = source(dir.path(), "const items = [];\n");
    let mut out = Vec::new();
    annotate(&file, false, &ServerConfig::default(), &mut out).unwrap();

    assert_eq!(
      String::from_utf8(out).unwrap(),
      "// Let `items` be an initially empty list of.\nconst items = [];\n"
    );
    assert_eq!(fs::read_to_string(&file).unwrap(), "const items = [];\n");
  }

  #[test]
  fn annotate_writes_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let file = source(dir.path(), "const items = [];\n");
    let config = ServerConfig {
      comment_token: "#".into(),
      ..ServerConfig::default()
    };
    annotate(&file, true, &config, &mut Vec::new()).unwrap();

    assert_eq!(
      fs::read_to_string(&file).unwrap(),
      "# Let `items` be an initially empty list of.\nconst items = [];\n"
    );
  }

  #[test]
  fn actions_list_guard_for_boolean() {
    let dir = tempfile::tempdir().unwrap();
    let file = source(dir.path(), "let isValid = true;\n");
    let mut out = Vec::new();
    actions(&file, 1, &mut out).unwrap();

    let out = String::from_utf8(out).unwrap();
    assert!(out.starts_with("1. Guard on `isValid`\n"));
    assert!(out.contains("   if (isValid) {\n"));
  }

  #[test]
  fn actions_reject_out_of_range_lines() {
    let dir = tempfile::tempdir().unwrap();
    let file = source(dir.path(), "let x = 1;");
    assert!(actions(&file, 0, &mut Vec::new()).is_err());
    assert!(actions(&file, 5, &mut Vec::new()).is_err());
  }

  #[test]
  fn workspace_config_sets_comment_token() {
    let dir = tempfile::tempdir().unwrap();
    let scribe = dir.path().join(the_loader::WORKSPACE_DIR);
    fs::create_dir(&scribe).unwrap();
    fs::write(scribe.join("config.toml"), "comment-token = \"#\"\n").unwrap();
    let file = source(dir.path(), "");

    let missing = dir.path().join("missing.toml");
    let config = config_for(&file, Some(&missing)).unwrap();
    assert_eq!(config.comment_token, "#");
    assert!(config.features.annotations);
  }
}
