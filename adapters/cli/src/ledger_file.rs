//! JSON file backing for the cured ledger.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use blight_core::Position;
use blight_world::{LedgerError, LedgerStore};
use serde::{Deserialize, Serialize};

/// Version written into every ledger document.
const LEDGER_VERSION: u32 = 1;

#[derive(Deserialize)]
struct LedgerDocument {
    version: u32,
    #[serde(default)]
    cured: Vec<Position>,
}

#[derive(Serialize)]
struct LedgerDocumentRef<'a> {
    version: u32,
    cured: &'a [Position],
}

/// Ledger store persisting cured positions as a versioned JSON document.
///
/// A missing file reads as an empty ledger. Saves go through a sibling
/// temporary file that is renamed over the target.
#[derive(Clone, Debug)]
pub(crate) struct FileLedgerStore {
    path: PathBuf,
}

impl FileLedgerStore {
    /// Creates a store backed by the file at `path`.
    pub(crate) fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the backing file.
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: io::Error) -> LedgerError {
        LedgerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self) -> Result<Vec<Position>, LedgerError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(error) => return Err(self.io_error(error)),
        };

        let document: LedgerDocument = serde_json::from_str(&contents)
            .map_err(|error| LedgerError::Format(error.to_string()))?;
        if document.version != LEDGER_VERSION {
            return Err(LedgerError::Format(format!(
                "unsupported ledger version {}; expected {LEDGER_VERSION}",
                document.version
            )));
        }
        Ok(document.cured)
    }

    fn save(&self, positions: &[Position]) -> Result<(), LedgerError> {
        let document = LedgerDocumentRef {
            version: LEDGER_VERSION,
            cured: positions,
        };
        let json = serde_json::to_string_pretty(&document)
            .map_err(|error| LedgerError::Format(error.to_string()))?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, json).map_err(|error| self.io_error(error))?;
        fs::rename(&staging, &self.path).map_err(|error| self.io_error(error))
    }
}

#[cfg(test)]
mod tests {
    use std::process;

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("blight-{name}-{}.json", process::id()))
    }

    #[test]
    fn missing_files_read_as_empty() {
        let store = FileLedgerStore::new(scratch("missing"));
        assert_eq!(store.load().expect("missing file loads"), Vec::new());
    }

    #[test]
    fn saved_positions_load_back() {
        let path = scratch("saved");
        let store = FileLedgerStore::new(&path);
        let cured = vec![Position::at(1, 2, 3), Position::at(-4, 0, 9)];

        store.save(&cured).expect("ledger saves");
        assert_eq!(store.load().expect("ledger loads"), cured);
        fs::remove_file(&path).expect("scratch file removed");
    }

    #[test]
    fn foreign_versions_are_rejected() {
        let path = scratch("foreign");
        fs::write(&path, r#"{"version":7,"cured":[]}"#).expect("scratch file written");
        let store = FileLedgerStore::new(&path);

        assert!(matches!(store.load(), Err(LedgerError::Format(_))));
        fs::remove_file(&path).expect("scratch file removed");
    }
}
