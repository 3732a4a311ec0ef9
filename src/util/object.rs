use crate::model::fs::FSError;

pub const DELIMITER: &str = "/";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    AWS,
    GCS,
}

/// A bare bucket name (no scheme) is taken to be an S3 bucket.
pub fn parse_provider_from_uri(bucket_uri: &str) -> Result<Provider, FSError> {
    match bucket_uri.split_once("://") {
        None => Ok(Provider::AWS),
        Some(("s3", _)) => Ok(Provider::AWS),
        Some(("gs", _)) => Ok(Provider::GCS),
        Some(_) => Err(FSError {
            message: format!("failed to parse provider of: {}", bucket_uri),
        }),
    }
}

pub fn parse_bucket_from_uri(bucket_uri: &str) -> &str {
    bucket_uri
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(bucket_uri)
        .trim_end_matches('/')
}

/// Turns a requested path into the prefix listed when opening it as a directory:
/// no leading separator, and a trailing one unless the result is empty.
pub fn listing_prefix(path: &str) -> String {
    let trimmed = path.strip_prefix(DELIMITER).unwrap_or(path);
    if trimmed.is_empty() || trimmed.ends_with(DELIMITER) {
        trimmed.to_string()
    } else {
        format!("{}{}", trimmed, DELIMITER)
    }
}

/// The key actually sent to the store for a requested path. Store keys never
/// carry the leading separator of a URL path.
pub fn wire_key(key: &str) -> &str {
    key.trim_start_matches(DELIMITER)
}

/// Strips the parent prefix from a child key or common prefix, along with
/// any trailing separator.
pub fn child_name<'a>(parent: &str, child: &'a str) -> &'a str {
    child
        .strip_prefix(parent)
        .unwrap_or(child)
        .trim_end_matches(DELIMITER)
}
