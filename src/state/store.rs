// ABOUTME: File-backed key/value store for values derived during provisioning.
// ABOUTME: Every put rewrites the file atomically with owner-only permissions.

use std::io::Write;
use std::path::{Path, PathBuf};

use super::codec::{self, encode_entry, is_valid_key};
use super::error::StateError;

/// Default state file name, relative to the working directory.
pub const DEFAULT_STATE_FILE: &str = ".runway.env";

const HEADER: &str = "# Managed by runway. Values are single-quoted shell strings.\n";

/// Key/value store backed by a `KEY='value'` file.
///
/// Only one process is expected to write a given file at a time; there is no
/// locking.
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    entries: Vec<(String, String)>,
}

impl StateStore {
    /// Load the store from `path`. A missing file yields an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StateError> {
        let path = path.into();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("no state file at {}, starting empty", path.display());
                return Ok(Self {
                    path,
                    entries: Vec::new(),
                });
            }
            Err(source) => return Err(StateError::Read { path, source }),
        };

        let parsed = codec::parse_entries(&content).map_err(|e| StateError::Parse {
            path: path.clone(),
            line: e.line,
            message: e.message,
        })?;

        // Later duplicates win, keeping the position of the last occurrence.
        let mut entries: Vec<(String, String)> = Vec::with_capacity(parsed.len());
        for (key, value) in parsed {
            entries.retain(|(k, _)| *k != key);
            entries.push((key, value));
        }

        tracing::debug!("loaded {} state entries from {}", entries.len(), path.display());
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Upsert `key`, replacing any previous value, and persist before returning.
    pub fn put(&mut self, key: &str, value: &str) -> Result<(), StateError> {
        if !is_valid_key(key) {
            return Err(StateError::InvalidKey(key.to_string()));
        }

        let mut entries = self.entries.clone();
        entries.retain(|(k, _)| k != key);
        entries.push((key.to_string(), value.to_string()));

        write_atomic(&self.path, &render(&entries))?;
        self.entries = entries;
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn render(entries: &[(String, String)]) -> String {
    let mut out = String::from(HEADER);
    for (key, value) in entries {
        out.push_str(&encode_entry(key, value));
    }
    out
}

fn write_atomic(path: &Path, content: &str) -> Result<(), StateError> {
    let write_err = |source| StateError::Write {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    file.write_all(content.as_bytes()).map_err(write_err)?;
    file.as_file().sync_all().map_err(write_err)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(file.path(), std::fs::Permissions::from_mode(0o600))
            .map_err(write_err)?;
    }

    file.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}
