//! Project domain model.
//!
//! A project is an ordered set of named text files plus a pointer to the file
//! currently being edited. Every mutation keeps two invariants: the file set is
//! never empty, and the active pointer always names an existing file.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{PyideError, Result};

/// Name of the file every project starts with. It can be edited but never deleted.
pub const DEFAULT_FILE_NAME: &str = "main.py";

/// Content of the default file in a fresh project.
pub const DEFAULT_FILE_CONTENT: &str =
    "# Python workspace\n#\n# Edit this file, add modules next to it, then run.\n\nprint(\"Ready to code.\")";

/// Content given to newly created files.
pub const NEW_FILE_PLACEHOLDER: &str = "# New File";

/// Filename → content, in insertion order.
///
/// Equality ignores order, which matches the persistence format where key
/// order carries no meaning.
pub type ProjectFiles = IndexMap<String, String>;

/// Checks that `name` can be used as a single, opaque path segment.
pub fn validate_file_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(PyideError::invalid_name(name, "name is empty"));
    }
    if name == "." || name == ".." {
        return Err(PyideError::invalid_name(name, "name is a relative path marker"));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(PyideError::invalid_name(
            name,
            "name must not contain path separators or NUL",
        ));
    }
    Ok(())
}

/// The live, mutable project model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    files: ProjectFiles,
    active: String,
}

impl Default for Project {
    fn default() -> Self {
        let mut files = ProjectFiles::new();
        files.insert(
            DEFAULT_FILE_NAME.to_string(),
            DEFAULT_FILE_CONTENT.to_string(),
        );
        Self {
            files,
            active: DEFAULT_FILE_NAME.to_string(),
        }
    }
}

impl Project {
    /// Creates the built-in default project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a project from persisted files.
    ///
    /// Entries whose names fail [`validate_file_name`] are dropped. Returns
    /// `None` when nothing usable is left. A mapping without the default file
    /// gets it back with placeholder content, so the protected file always
    /// exists. The default file becomes active.
    pub fn from_files(mut files: ProjectFiles) -> Option<Self> {
        files.retain(|name, _| validate_file_name(name).is_ok());
        if files.is_empty() {
            return None;
        }
        if !files.contains_key(DEFAULT_FILE_NAME) {
            files.insert(
                DEFAULT_FILE_NAME.to_string(),
                NEW_FILE_PLACEHOLDER.to_string(),
            );
        }
        Some(Self {
            files,
            active: DEFAULT_FILE_NAME.to_string(),
        })
    }

    /// Name of the active file.
    pub fn active_file(&self) -> &str {
        &self.active
    }

    /// Content of the active file.
    pub fn active_content(&self) -> &str {
        // The active pointer always names an existing file.
        self.files
            .get(&self.active)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Replaces the content of the active file in memory.
    pub fn set_active_content(&mut self, text: impl Into<String>) {
        if let Some(content) = self.files.get_mut(&self.active) {
            *content = text.into();
        }
    }

    /// Content of a file by name.
    pub fn content(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    /// True if the project holds a file with this name.
    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// File names in insertion order.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Number of files in the project.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Adds a new file with placeholder content and makes it active.
    pub fn create_file(&mut self, name: &str) -> Result<()> {
        validate_file_name(name)?;
        if self.files.contains_key(name) {
            return Err(PyideError::DuplicateName(name.to_string()));
        }
        self.files
            .insert(name.to_string(), NEW_FILE_PLACEHOLDER.to_string());
        self.active = name.to_string();
        Ok(())
    }

    /// Inserts or replaces a file and makes it active.
    ///
    /// Used by import, where overwriting has already been confirmed.
    pub fn upsert_file(&mut self, name: &str, content: impl Into<String>) -> Result<()> {
        validate_file_name(name)?;
        self.files.insert(name.to_string(), content.into());
        self.active = name.to_string();
        Ok(())
    }

    /// Removes a file.
    ///
    /// If the removed file was active, the first remaining file in insertion
    /// order becomes active.
    pub fn delete_file(&mut self, name: &str) -> Result<()> {
        if name == DEFAULT_FILE_NAME {
            return Err(PyideError::ProtectedFile(name.to_string()));
        }
        if self.files.shift_remove(name).is_none() {
            return Err(PyideError::not_found("file", name));
        }
        if self.active == name {
            // The default file is never removed, so at least one key remains.
            if let Some(first) = self.files.keys().next() {
                self.active = first.clone();
            }
        }
        Ok(())
    }

    /// Points the active file at `name`.
    pub fn switch_active(&mut self, name: &str) -> Result<()> {
        if !self.files.contains_key(name) {
            return Err(PyideError::not_found("file", name));
        }
        self.active = name.to_string();
        Ok(())
    }

    /// Takes an owned, immutable copy of the project.
    pub fn snapshot(&self) -> ProjectSnapshot {
        ProjectSnapshot {
            files: self.files.clone(),
            active: self.active.clone(),
        }
    }
}

/// Immutable copy of a project handed to the store and the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    files: ProjectFiles,
    active: String,
}

impl ProjectSnapshot {
    /// All files, in insertion order.
    pub fn files(&self) -> &ProjectFiles {
        &self.files
    }

    /// Name of the file that was active when the snapshot was taken.
    pub fn active_file(&self) -> &str {
        &self.active
    }

    /// Content of the file that was active when the snapshot was taken.
    pub fn active_content(&self) -> &str {
        self.files
            .get(&self.active)
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Consumes the snapshot, returning the file mapping.
    pub fn into_files(self) -> ProjectFiles {
        self.files
    }
}
