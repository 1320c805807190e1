use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

/// Handle to a file opened by a script. Opening validates the path (and
/// creates the file when missing); reads and writes reopen on demand so the
/// handle never holds a stale descriptor across external truncation.
#[derive(Debug)]
pub struct FileHandle {
    path: PathBuf,
}

impl FileHandle {
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
    }

    pub fn read_to_string(&self) -> io::Result<String> {
        std::fs::read_to_string(&self.path)
    }

    pub fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        std::fs::write(&self.path, bytes)
    }
}
