//! Configuration persistence using toml_edit to preserve formatting and comments.

use super::Instruction;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use toml_edit::DocumentMut;

/// Path of the backup written before a run changes the config.
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".previous");
    path.with_file_name(name)
}

/// Copy the config file to `<name>.previous`
pub fn backup_config(path: &Path) -> Result<PathBuf> {
    let backup = backup_path(path);
    std::fs::copy(path, &backup)
        .with_context(|| format!("Failed to back up config file: {:?}", path))?;
    Ok(backup)
}

/// Update just the instructions section of the config file
pub fn update_instructions(path: &Path, instructions: &[Instruction]) -> Result<()> {
    let content = if path.exists() {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?
    } else {
        String::new()
    };

    let updated = replace_instructions(&content, instructions)
        .with_context(|| format!("Failed to update config file: {:?}", path))?;

    std::fs::write(path, updated)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;

    Ok(())
}

/// Swap the `instructions` array in `content`, leaving everything else as written
pub fn replace_instructions(content: &str, instructions: &[Instruction]) -> Result<String> {
    let mut doc: DocumentMut = content.parse().context("Failed to parse config")?;

    let instructions_toml = toml::to_string(&InstructionsWrapper {
        instructions: instructions.to_vec(),
    })
    .context("Failed to serialize instructions")?;
    let instructions_doc: DocumentMut = instructions_toml
        .parse()
        .context("Failed to parse serialized instructions")?;

    if let Some(item) = instructions_doc.get("instructions") {
        doc["instructions"] = item.clone();
    } else {
        doc.remove("instructions");
    }

    Ok(doc.to_string())
}

#[derive(serde::Serialize)]
struct InstructionsWrapper {
    instructions: Vec<Instruction>,
}
