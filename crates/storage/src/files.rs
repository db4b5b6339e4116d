use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Serializer, Value};
use walkdir::WalkDir;

pub fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("invalid JSON in {}", path.display()))
}

/// Platform artifacts use two-space indentation.
pub fn write_json(path: &Path, value: &Value) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)?;
    write_bytes(path, rendered.as_bytes())
}

/// Canonical model files are indented with tabs.
pub fn write_tab_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buffer = Vec::new();
    let mut serializer =
        Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(b"\t"));
    value
        .serialize(&mut serializer)
        .with_context(|| format!("failed serializing {}", path.display()))?;
    buffer.push(b'\n');
    write_bytes(path, &buffer)
}

fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed creating directory {}", parent.display()))?;
    }
    let mut file =
        fs::File::create(path).with_context(|| format!("failed creating {}", path.display()))?;
    file.write_all(bytes)
        .with_context(|| format!("failed writing {}", path.display()))
}

/// Every `.json` file below `root`, keyed by its path relative to `root`.
/// A missing root yields no files.
pub fn read_tree(root: &Path) -> Result<Vec<(PathBuf, Value)>> {
    if !root.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed walking {}", root.display()))?;
        let path = entry.path();
        let is_json = path.extension().and_then(|ext| ext.to_str()) == Some("json");
        if !entry.file_type().is_file() || !is_json {
            continue;
        }

        let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
        files.push((relative, read_json(path)?));
    }

    Ok(files)
}

/// Writes each `(relative path, document)` under `root` and returns how many
/// files were written.
pub fn write_tree<'a, I>(root: &Path, files: I) -> Result<usize>
where
    I: IntoIterator<Item = (&'a Path, &'a Value)>,
{
    let mut written = 0;
    for (relative, contents) in files {
        write_json(&root.join(relative), contents)?;
        written += 1;
    }
    Ok(written)
}

/// Removes a generated directory so a rebuild leaves no stale files behind.
pub fn reset_dir(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed clearing {}", path.display()))?;
    }
    Ok(())
}
