//! Shared plumbing for the `nexus-cli` and `arena-sim` binaries.

use anyhow::Context;
use encoding_rs::Encoding;
use nexus_engine::{Character, GameData};
use std::{fs, path::Path};

/// Read a text file, honouring a UTF-8 or UTF-16 byte order mark.
pub fn read_text_auto(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    if let Some((enc, bom_len)) = Encoding::for_bom(&bytes) {
        let (cow, _, _) = enc.decode(&bytes[bom_len..]);
        Ok(cow.into_owned())
    } else {
        Ok(String::from_utf8(bytes)?)
    }
}

/// Built-in tables, or a JSON/YAML pack picked by file extension.
pub fn load_content(path: Option<&Path>) -> anyhow::Result<GameData> {
    let Some(path) = path else {
        return Ok(GameData::parse_builtin()?);
    };
    let text = read_text_auto(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    let data = if is_yaml {
        GameData::from_yaml(&text)
    } else {
        GameData::from_json(&text)
    };
    data.with_context(|| format!("failed to load content pack {}", path.display()))
}

pub fn load_character(path: &Path) -> anyhow::Result<Character> {
    let text = read_text_auto(path)?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse character JSON: {}", path.display()))
}

/// Log to stderr; stdout stays machine-readable.
pub fn init_tracing(verbose: bool) {
    let level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}
