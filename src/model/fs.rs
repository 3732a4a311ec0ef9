use std::{fmt, io::Read, time::SystemTime};

/// Error reported by a store adapter. The message is kept as the store
/// produced it so callers can surface it unchanged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct FSError {
    pub message: String,
}

/// One object entry of a listing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FSObject {
    pub key: String,
    pub size: u64,
    pub modified_time: Option<SystemTime>,
}

/// Result of a single-level delimiter listing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FSListing {
    pub prefixes: Vec<String>,
    pub objects: Vec<FSObject>,
}

impl FSListing {
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.objects.is_empty()
    }
}

/// A retrieved object: an open body plus the metadata the store declared.
pub struct FSObjectBody {
    pub body: Box<dyn Read + Send>,
    pub content_length: Option<u64>,
    pub last_modified: Option<SystemTime>,
}

impl fmt::Debug for FSObjectBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FSObjectBody")
            .field("content_length", &self.content_length)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}
