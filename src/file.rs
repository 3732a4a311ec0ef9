use std::{
    io::{self, Read, Seek, SeekFrom},
    time::SystemTime,
};

use tracing::{debug, span, Level};

use crate::{
    bucket::Bucket,
    entry::{Metadata, FILE_MODE},
    error::FsError,
    model,
};

/// An object opened for reading.
///
/// Metadata is the snapshot declared by the most recent retrieval. The body
/// is released on `close`, on drop, and before every reopen done by `seek`.
pub struct File<'a> {
    bucket: &'a Bucket,
    path: String,
    body: Option<Box<dyn Read + Send>>,
    content_length: Option<u64>,
    last_modified: Option<SystemTime>,
}

impl<'a> File<'a> {
    pub(crate) fn new(bucket: &'a Bucket, path: &str, object: model::fs::FSObjectBody) -> Self {
        Self {
            bucket,
            path: path.to_string(),
            body: Some(object.body),
            content_length: object.content_length,
            last_modified: object.last_modified,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path.trim_end_matches('/')
    }

    pub fn size(&self) -> Result<u64, FsError> {
        self.content_length
            .ok_or_else(|| FsError::MissingContentLength(self.path.clone()))
    }

    pub fn modified(&self) -> SystemTime {
        self.last_modified.unwrap_or(SystemTime::UNIX_EPOCH)
    }

    pub fn is_dir(&self) -> bool {
        false
    }

    pub fn mode(&self) -> u32 {
        FILE_MODE
    }

    pub fn stat(&self) -> Result<Metadata, FsError> {
        Ok(Metadata::file(self.name(), self.size()?, self.last_modified))
    }

    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        match self.body.as_mut() {
            None => Err(FsError::Released(self.path.clone())),
            Some(body) => Ok(body.read(buf)?),
        }
    }

    /// Only `SeekFrom::Start` is supported: the object is fetched again and
    /// `offset` bytes are discarded. Returns the position reached, which is
    /// short of `offset` when the object is shorter.
    pub fn seek(&mut self, pos: SeekFrom) -> Result<u64, FsError> {
        let offset = match pos {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(_) | SeekFrom::End(_) => {
                return Err(FsError::NotImplemented("seek relative to current position or end"));
            }
        };

        let span = span!(Level::DEBUG, "seek", context = "seek");
        let _e = span.enter();
        debug!(path = self.path, offset = offset, "called");

        // Release first so a failed reopen never leaves the old body behind.
        self.body = None;
        let object = self.bucket.fetch_object(&self.path)?;
        self.content_length = object.content_length;
        self.last_modified = object.last_modified;

        let body = self.body.insert(object.body);
        Ok(io::copy(&mut body.take(offset), &mut io::sink())?)
    }

    /// Releases the body. A second close reports `Released`.
    pub fn close(&mut self) -> Result<(), FsError> {
        match self.body.take() {
            None => Err(FsError::Released(self.path.clone())),
            Some(_) => Ok(()),
        }
    }
}

impl Read for File<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        File::read(self, buf).map_err(io::Error::from)
    }
}

impl Seek for File<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        File::seek(self, pos).map_err(io::Error::from)
    }
}
