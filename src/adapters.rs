use crate::model;

pub mod gcs;
pub mod mock;
pub mod s3;

/// Read-only capability set a bucket needs from an object store.
pub trait Object: Send + Sync {
    /// Confirms `bucket` exists and is reachable.
    fn fs_head_bucket(&self, bucket: &str) -> Result<(), model::fs::FSError>;

    /// Lists `prefix` one level deep: keys containing `delimiter` past the
    /// prefix are grouped into common prefixes. The listing is complete, the
    /// adapter follows continuation tokens itself.
    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<model::fs::FSListing, model::fs::FSError>;

    /// Opens `key` for reading. `Ok(None)` means the store has no such key.
    fn fs_get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::fs::FSObjectBody>, model::fs::FSError>;
}
