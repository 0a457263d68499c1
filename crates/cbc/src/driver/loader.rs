//! Where `using "file"` reads its sources from

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

/// Source text by the name a `using` statement gives
pub trait SourceLoader {
    fn load(&self, path: &str) -> io::Result<String>;
}

/// Reads files relative to a root directory; absolute names are used as is
#[derive(Debug, Clone, Default)]
pub struct FileSystemLoader {
    root: PathBuf,
}

impl FileSystemLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl SourceLoader for FileSystemLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        std::fs::read_to_string(self.root.join(path))
    }
}

/// In-memory sources, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<String, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.files.insert(name.into(), source.into());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &str) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "No such file or directory")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_file("a.cb", "x := 1;");
        assert_eq!(loader.load("a.cb").unwrap(), "x := 1;");
        assert_eq!(loader.load("b.cb").unwrap_err().kind(), io::ErrorKind::NotFound);
    }
}
