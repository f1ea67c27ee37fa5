use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::character::Character;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bad character document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid character id '{0}'")]
    InvalidId(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Where characters live between sessions. Last write wins.
pub trait CharacterStore {
    fn load(&self, id: &str) -> Result<Option<Character>, PersistError>;
    fn save(&mut self, id: &str, character: &Character) -> Result<(), PersistError>;
    fn list_all(&self) -> Result<Vec<(String, Character)>, PersistError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    docs: IndexMap<String, Character>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CharacterStore for MemoryStore {
    fn load(&self, id: &str) -> Result<Option<Character>, PersistError> {
        Ok(self.docs.get(id).cloned())
    }

    fn save(&mut self, id: &str, character: &Character) -> Result<(), PersistError> {
        self.docs.insert(id.to_string(), character.clone());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<(String, Character)>, PersistError> {
        Ok(self.docs.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }
}

/// One pretty-printed JSON document per character: `<root>/<id>.json`.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    root: PathBuf,
}

impl JsonDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, PersistError> {
        let valid = !id.is_empty()
            && id != "."
            && id != ".."
            && !id.contains(['/', '\\', '\0']);
        if !valid {
            return Err(PersistError::InvalidId(id.to_string()));
        }
        Ok(self.root.join(format!("{}.json", id)))
    }

    fn read_doc(path: &Path) -> Result<Character, PersistError> {
        let text = fs::read_to_string(path).map_err(|source| PersistError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| PersistError::Json {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl CharacterStore for JsonDirStore {
    fn load(&self, id: &str) -> Result<Option<Character>, PersistError> {
        let path = self.path_for(id)?;
        if !path.exists() {
            return Ok(None);
        }
        Self::read_doc(&path).map(Some)
    }

    fn save(&mut self, id: &str, character: &Character) -> Result<(), PersistError> {
        let path = self.path_for(id)?;
        fs::create_dir_all(&self.root).map_err(|source| PersistError::Io {
            path: self.root.clone(),
            source,
        })?;
        let text = serde_json::to_string_pretty(character).map_err(|source| PersistError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(&path, text).map_err(|source| PersistError::Io { path: path.clone(), source })?;
        debug!(path = %path.display(), "character saved");
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<(String, Character)>, PersistError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&self.root).map_err(|source| PersistError::Io {
            path: self.root.clone(),
            source,
        })?;
        let mut out = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PersistError::Io {
                path: self.root.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                continue;
            };
            match Self::read_doc(&path) {
                Ok(character) => out.push((id, character)),
                Err(err) => warn!(%err, "skipping unreadable character document"),
            }
        }
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }
}

/// Every stored character, highest Nexus Rating first.
pub fn rankings(store: &dyn CharacterStore) -> Result<Vec<(String, Character)>, PersistError> {
    let mut all = store.list_all()?;
    all.sort_by(|a, b| b.1.nexus_rating().total_cmp(&a.1.nexus_rating()));
    Ok(all)
}
