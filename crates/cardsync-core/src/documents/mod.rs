//! Document enumeration and access.

use std::path::{Component, Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::models::DocumentHandle;
use crate::util::write_atomic;
use crate::{Error, Result};

/// File extensions scanned when none are configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["md"];

/// Trait for reading and writing source documents
pub trait DocumentStore {
    /// All documents, sorted by handle
    fn list_documents(&self) -> Result<Vec<DocumentHandle>>;

    /// Full text of a document
    fn read_document(&self, handle: &DocumentHandle) -> Result<String>;

    /// Replace the full text of a document
    fn write_document(&self, handle: &DocumentHandle, text: &str) -> Result<()>;
}

/// Filesystem implementation of [`DocumentStore`] rooted at a directory.
///
/// Handles are `/`-separated paths relative to the root. Hidden files and
/// directories are skipped.
#[derive(Debug, Clone)]
pub struct FsDocumentStore {
    root: PathBuf,
    extensions: Vec<String>,
}

impl FsDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            extensions: DEFAULT_EXTENSIONS
                .iter()
                .map(|extension| (*extension).to_string())
                .collect(),
        }
    }

    /// Restrict scanning to `extensions` (compared case-insensitively, leading
    /// dots ignored). An empty list keeps the current set.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|extension| extension.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|extension| !extension.is_empty())
            .collect();
        if !extensions.is_empty() {
            self.extensions = extensions;
        }
        self
    }

    fn resolve(&self, handle: &DocumentHandle) -> Result<PathBuf> {
        let relative = Path::new(handle.as_str());
        let is_plain = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        if handle.as_str().is_empty() || !is_plain {
            return Err(Error::Document(format!(
                "document handle '{handle}' must be a relative path inside the root"
            )));
        }
        Ok(self.root.join(relative))
    }

    fn has_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|extension| extension.to_string_lossy().to_lowercase())
            .is_some_and(|extension| self.extensions.contains(&extension))
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

fn to_handle(relative: &Path) -> DocumentHandle {
    let parts: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    DocumentHandle::new(parts.join("/"))
}

impl DocumentStore for FsDocumentStore {
    fn list_documents(&self) -> Result<Vec<DocumentHandle>> {
        if !self.root.is_dir() {
            return Err(Error::Document(format!(
                "documents root '{}' is not a directory",
                self.root.display()
            )));
        }

        let mut handles = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|entry| !is_hidden(entry))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    tracing::warn!("Skipping unreadable path while scanning documents: {}", error);
                    continue;
                }
            };
            if !entry.file_type().is_file() || !self.has_extension(entry.path()) {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            handles.push(to_handle(relative));
        }

        handles.sort();
        Ok(handles)
    }

    fn read_document(&self, handle: &DocumentHandle) -> Result<String> {
        let path = self.resolve(handle)?;
        std::fs::read_to_string(&path).map_err(|error| {
            Error::Document(format!("failed to read '{}': {error}", path.display()))
        })
    }

    fn write_document(&self, handle: &DocumentHandle, text: &str) -> Result<()> {
        let path = self.resolve(handle)?;
        write_atomic(&path, text.as_bytes()).map_err(|error| {
            Error::Document(format!("failed to write '{}': {error}", path.display()))
        })
    }
}
