//! Source-file registry.
//!
//! Wraps `codespan_reporting`'s file database so diagnostics and error
//! messages can resolve byte offsets to human-readable locations.

use codespan_reporting::files::{Files, SimpleFiles};
use std::path::Path;

/// A unique identifier for a registered source file.
pub type FileId = usize;

/// Registry of the source files taking part in a compilation.
pub struct SourceMap {
    files: SimpleFiles<String, String>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self {
            files: SimpleFiles::new(),
        }
    }

    /// Register a file, returning its id.
    pub fn add(&mut self, name: impl Into<String>, source: impl Into<String>) -> FileId {
        self.files.add(name.into(), source.into())
    }

    /// Register a file read from disk.
    pub fn add_path(&mut self, path: &Path) -> std::io::Result<FileId> {
        let source = std::fs::read_to_string(path)?;
        Ok(self.add(path.display().to_string(), source))
    }

    pub fn source(&self, id: FileId) -> Option<&str> {
        self.files.get(id).ok().map(|f| f.source().as_str())
    }

    pub fn name(&self, id: FileId) -> Option<&str> {
        self.files.get(id).ok().map(|f| f.name().as_str())
    }

    /// Resolve a byte offset to a 1-indexed `(line, column)` pair.
    pub fn location(&self, id: FileId, offset: usize) -> Option<(usize, usize)> {
        let line = self.files.line_index(id, offset).ok()?;
        let range = self.files.line_range(id, line).ok()?;
        Some((line + 1, offset - range.start + 1))
    }

    /// Access the underlying database for codespan rendering.
    pub fn files(&self) -> &SimpleFiles<String, String> {
        &self.files
    }
}

impl Default for SourceMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_is_one_indexed() {
        let mut map = SourceMap::new();
        let id = map.add("test.bs", "int x;\nint y;\n");
        assert_eq!(map.location(id, 0), Some((1, 1)));
        assert_eq!(map.location(id, 7), Some((2, 1)));
        assert_eq!(map.location(id, 11), Some((2, 5)));
    }
}
