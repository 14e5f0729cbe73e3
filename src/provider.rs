//! Run providers
//!
//! The report engine never touches storage. A provider resolves an opaque run
//! id to a decoded [`Run`]; where the data lives is the provider's business.
//!
//! `DirectoryProvider` reads the files XHProf-compatible profilers drop into a
//! runs directory (`<run_id>.<namespace>.xhprof`). It is strictly read-only.

use crate::error::ProviderError;
use crate::run::{Run, RunId};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// File extension of raw run files
pub const RUN_EXTENSION: &str = "xhprof";

/// Source of raw runs, keyed by run id
pub trait RunProvider {
    /// Resolve one run
    fn load(&self, id: &RunId) -> Result<Run, ProviderError>;

    /// Ids of every run this provider can resolve, sorted
    fn list(&self) -> Result<Vec<RunId>, ProviderError>;
}

/// Runs stored as JSON files in one directory
#[derive(Debug, Clone)]
pub struct DirectoryProvider {
    dir: PathBuf,
    namespace: Option<String>,
}

impl DirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            namespace: None,
        }
    }

    /// Only resolve files of the form `<run_id>.<namespace>.xhprof`
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File that holds `id`
    pub fn path_for(&self, id: &RunId) -> Result<PathBuf, ProviderError> {
        let raw = id.as_str();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw == "." || raw == ".." {
            return Err(ProviderError::InvalidRunId(raw.to_string()));
        }
        let file_name = match &self.namespace {
            Some(namespace) => format!("{}.{}.{}", raw, namespace, RUN_EXTENSION),
            None => format!("{}.{}", raw, RUN_EXTENSION),
        };
        Ok(self.dir.join(file_name))
    }

    /// Run id encoded in `file_name`, if it belongs to this provider
    fn run_id_of(&self, file_name: &str) -> Option<RunId> {
        let stem = file_name.strip_suffix(RUN_EXTENSION)?.strip_suffix('.')?;
        let id = match &self.namespace {
            Some(namespace) => stem.strip_suffix(namespace.as_str())?.strip_suffix('.')?,
            None => stem,
        };
        (!id.is_empty()).then(|| RunId::new(id))
    }
}

impl RunProvider for DirectoryProvider {
    fn load(&self, id: &RunId) -> Result<Run, ProviderError> {
        let path = self.path_for(id)?;
        let contents = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ProviderError::NotFound(id.clone())
            } else {
                ProviderError::Read {
                    id: id.clone(),
                    path: path.clone(),
                    source,
                }
            }
        })?;
        tracing::debug!("Loaded run {} from {}", id, path.display());
        Run::from_json_str(id.clone(), &contents).map_err(|source| ProviderError::Decode {
            id: id.clone(),
            source,
        })
    }

    fn list(&self) -> Result<Vec<RunId>, ProviderError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| ProviderError::List {
            path: self.dir.clone(),
            source,
        })?;
        let mut ids: Vec<RunId> = entries
            .filter_map(|entry| {
                let entry = entry.ok()?;
                let name = entry.file_name();
                self.run_id_of(name.to_str()?)
            })
            .collect();
        ids.sort();
        Ok(ids)
    }
}

/// Runs held in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryProvider {
    runs: BTreeMap<RunId, Run>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.insert(run.id().clone(), run);
        self
    }
}

impl FromIterator<Run> for MemoryProvider {
    fn from_iter<T: IntoIterator<Item = Run>>(iter: T) -> Self {
        Self {
            runs: iter.into_iter().map(|run| (run.id().clone(), run)).collect(),
        }
    }
}

impl RunProvider for MemoryProvider {
    fn load(&self, id: &RunId) -> Result<Run, ProviderError> {
        self.runs
            .get(id)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(id.clone()))
    }

    fn list(&self) -> Result<Vec<RunId>, ProviderError> {
        Ok(self.runs.keys().cloned().collect())
    }
}
