//! Read-only file tree over an object storage bucket.
//!
//! [`Bucket::open`] turns a path into an [`Entry`]: a [`Directory`] synthesized
//! from a delimiter listing, or a [`File`] streaming a single object.

pub mod adapters;
pub mod bucket;
pub mod config;
pub mod dir;
pub mod entry;
pub mod error;
pub mod file;
pub mod model;
pub mod server;
pub mod util;

pub use bucket::Bucket;
pub use config::{AppConfig, BucketConfig};
pub use dir::Directory;
pub use entry::{Entry, Metadata};
pub use error::FsError;
pub use file::File;
