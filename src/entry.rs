use std::{io::SeekFrom, time::SystemTime};

use crate::{dir::Directory, error::FsError, file::File};

pub const FILE_MODE: u32 = 0o444;
pub const DIR_MODE: u32 = 0o755;

/// File-info record for an entry or one of a directory's children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Metadata {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub mode: u32,
    pub is_dir: bool,
}

impl Metadata {
    pub fn directory(name: &str) -> Self {
        Self {
            name: name.to_string(),
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
            mode: DIR_MODE,
            is_dir: true,
        }
    }

    pub fn file(name: &str, size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            name: name.to_string(),
            size,
            modified: modified.unwrap_or(SystemTime::UNIX_EPOCH),
            mode: FILE_MODE,
            is_dir: false,
        }
    }
}

/// What a path in the bucket resolves to.
pub enum Entry<'a> {
    Directory(Directory<'a>),
    File(File<'a>),
}

impl<'a> Entry<'a> {
    pub fn is_dir(&self) -> bool {
        matches!(self, Entry::Directory(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Entry::Directory(dir) => dir.name(),
            Entry::File(file) => file.name(),
        }
    }

    pub fn stat(&self) -> Result<Metadata, FsError> {
        match self {
            Entry::Directory(dir) => Ok(dir.stat()),
            Entry::File(file) => file.stat(),
        }
    }

    /// Directories have no content and always report end of stream.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        match self {
            Entry::Directory(_) => Ok(0),
            Entry::File(file) => file.read(buf),
        }
    }

    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        match self {
            Entry::Directory(_) => Ok(0),
            Entry::File(file) => file.seek(pos),
        }
    }

    pub fn close(&mut self) -> Result<(), FsError> {
        match self {
            Entry::Directory(_) => Ok(()),
            Entry::File(file) => file.close(),
        }
    }

    pub fn read_dir(&self, limit: Option<usize>) -> Result<Vec<Metadata>, FsError> {
        match self {
            Entry::Directory(dir) => Ok(dir.read_dir(limit)),
            Entry::File(file) => Err(FsError::NotADirectory(file.path().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_constructors() {
        let dir = Metadata::directory("docs");
        assert!(dir.is_dir);
        assert_eq!(dir.size, 0);
        assert_eq!(dir.mode, DIR_MODE);
        assert_eq!(dir.modified, SystemTime::UNIX_EPOCH);

        let file = Metadata::file("a.md", 12, None);
        assert!(!file.is_dir);
        assert_eq!(file.size, 12);
        assert_eq!(file.mode, FILE_MODE);
        assert_eq!(file.modified, SystemTime::UNIX_EPOCH);
    }
}
