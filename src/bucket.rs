use std::sync::Arc;

use tracing::{debug, error, info, span, Level};

use crate::{
    adapters,
    config::BucketConfig,
    dir::Directory,
    entry::Entry,
    error::FsError,
    file::File,
    model,
    util::object::{listing_prefix, DELIMITER},
};

/// A bucket exposed as a read-only file tree.
///
/// Holds no per-request state, so one instance serves concurrent `open`
/// calls. Files and directories borrow it for as long as they are in use.
pub struct Bucket {
    client: Arc<dyn adapters::Object>,
    config: BucketConfig,
}

impl Bucket {
    /// Binds to the configured bucket, failing with `UnreachableBucket` when
    /// the store cannot confirm it exists.
    pub fn new(client: Arc<dyn adapters::Object>, config: BucketConfig) -> Result<Self, FsError> {
        let span = span!(Level::INFO, "new", context = "bucket");
        let _e = span.enter();
        info!(bucket = config.bucket_name, region = config.region, "called");

        if let Err(err) = client.fs_head_bucket(&config.bucket_name) {
            error!(error_message=%err, error_group="head_bucket", bucket=config.bucket_name);
            return Err(FsError::UnreachableBucket {
                bucket: config.bucket_name.clone(),
                source: err,
            });
        }

        Ok(Self { client, config })
    }

    pub fn name(&self) -> &str {
        &self.config.bucket_name
    }

    /// Resolves `path` to a directory when a listing of it has any children,
    /// otherwise to the object stored under `path` itself.
    ///
    /// Paths hidden by the access prefix are reported as `NotFound`.
    pub fn open(&self, path: &str) -> Result<Entry<'_>, FsError> {
        let span = span!(Level::INFO, "open", context = "bucket");
        let _e = span.enter();
        info!(path = path, "called");

        match self.resolve(path) {
            Err(FsError::AccessDenied(path)) => {
                debug!(path = path, "outside access prefix");
                Err(FsError::NotFound(path))
            }
            res => res,
        }
    }

    fn check_access(&self, path: &str) -> Result<(), FsError> {
        match &self.config.access_prefix {
            Some(prefix) if !path.starts_with(prefix.as_str()) => {
                Err(FsError::AccessDenied(path.to_string()))
            }
            _ => Ok(()),
        }
    }

    fn resolve(&self, path: &str) -> Result<Entry<'_>, FsError> {
        self.check_access(path)?;

        let prefix = listing_prefix(path);
        let listing = self
            .client
            .fs_list_objects(&self.config.bucket_name, &prefix, DELIMITER)
            .inspect_err(|err| {
                error!(error_message=%err, error_group="list_objects", prefix=prefix);
            })?;

        if !listing.is_empty() {
            debug!(
                prefix = prefix,
                prefixes = listing.prefixes.len(),
                objects = listing.objects.len(),
                "resolved directory"
            );
            return Ok(Entry::Directory(Directory::new(self, path, prefix, listing)));
        }

        let object = self.fetch_object(path)?;
        Ok(Entry::File(File::new(self, path, object)))
    }

    /// Retrieves the object stored under the literal `key`.
    pub(crate) fn fetch_object(&self, key: &str) -> Result<model::fs::FSObjectBody, FsError> {
        match self.client.fs_get_object(&self.config.bucket_name, key) {
            Err(err) => {
                error!(error_message=%err, error_group="get_object", key=key);
                Err(FsError::Store(err))
            }
            Ok(None) => {
                debug!(key = key, "no such key");
                Err(FsError::NotFound(key.to_string()))
            }
            Ok(Some(object)) => Ok(object),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        io::Read,
        thread,
        time::{Duration, SystemTime},
    };

    use super::*;
    use crate::adapters::mock::MockClient;

    fn bucket_with(client: MockClient, config: BucketConfig) -> (Arc<MockClient>, Bucket) {
        let client = Arc::new(client);
        let bucket = Bucket::new(client.clone(), config).unwrap();
        (client, bucket)
    }

    fn bucket(client: MockClient) -> (Arc<MockClient>, Bucket) {
        bucket_with(client, BucketConfig::new("bucket"))
    }

    #[test]
    fn test_new_checks_bucket() {
        let client = Arc::new(MockClient::new());
        let bucket = Bucket::new(client.clone(), BucketConfig::new("bucket")).unwrap();

        assert_eq!(bucket.name(), "bucket");
        assert_eq!(client.head_calls(), 1);
    }

    #[test]
    fn test_new_unreachable() {
        let client = Arc::new(MockClient::new().with_head_error("NotFound: bucket does not exist"));

        let err = match Bucket::new(client, BucketConfig::new("nope")) {
            Err(err) => err,
            Ok(_) => panic!("expected construction to fail"),
        };

        match err {
            FsError::UnreachableBucket { bucket, source } => {
                assert_eq!(bucket, "nope");
                assert_eq!(source.message, "NotFound: bucket does not exist");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_open_directory_without_marker() {
        let (_, bucket) = bucket(MockClient::new().with_object("/foo/bar.txt", b"bar", None));

        let entry = bucket.open("/foo").unwrap();
        let names: Vec<String> = entry
            .read_dir(None)
            .unwrap()
            .into_iter()
            .map(|m| m.name)
            .collect();

        assert!(entry.is_dir());
        assert_eq!(entry.name(), "foo");
        assert_eq!(names, vec!["bar.txt"]);
    }

    #[test]
    fn test_open_directory_matches_listing() {
        let (client, bucket) = bucket(
            MockClient::new()
                .with_object("docs/b.md", b"bb", None)
                .with_object("docs/a.md", b"a", None)
                .with_object("docs/img/logo.png", b"png", None)
                .with_object("docs/api/index.html", b"html", None),
        );

        let cases = vec!["/docs", "/docs/", "docs", "docs/"];

        for path in cases {
            let entry = bucket.open(path).unwrap();
            let entries = entry.read_dir(None).unwrap();
            let summary: Vec<(String, bool)> =
                entries.into_iter().map(|m| (m.name, m.is_dir)).collect();

            assert_eq!(
                summary,
                vec![
                    ("api".to_string(), true),
                    ("img".to_string(), true),
                    ("a.md".to_string(), false),
                    ("b.md".to_string(), false),
                ],
                "failed for case: {}",
                path
            );
        }

        assert_eq!(client.get_calls(), 0);
    }

    #[test]
    fn test_open_file() {
        let modified = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        let (client, bucket) = bucket(MockClient::new().with_object(
            "/readme.txt",
            &[b'x'; 42],
            Some(modified),
        ));

        let mut entry = bucket.open("/readme.txt").unwrap();
        let stat = entry.stat().unwrap();

        assert!(!entry.is_dir());
        assert_eq!(stat.size, 42);
        assert_eq!(stat.modified, modified);
        assert!(matches!(entry.read_dir(None), Err(FsError::NotADirectory(_))));

        let file = match &mut entry {
            Entry::File(file) => file,
            Entry::Directory(_) => panic!("expected a file"),
        };
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        assert_eq!(data.len(), 42);

        entry.close().unwrap();
        assert_eq!(client.requested_keys(), vec!["/readme.txt"]);
    }

    #[test]
    fn test_open_uses_raw_path_for_object() {
        let (client, bucket) = bucket(MockClient::new().with_object("a/b.txt", b"b", None));

        let cases = vec!["/a/b.txt", "a/b.txt"];

        for path in cases {
            bucket.open(path).unwrap();
        }

        assert_eq!(client.requested_keys(), vec!["/a/b.txt", "a/b.txt"]);
    }

    #[test]
    fn test_open_missing() {
        let (client, bucket) = bucket(MockClient::new().with_object("other.txt", b"", None));

        let err = bucket.open("/missing-key").err().unwrap();

        assert!(err.is_not_found());
        assert_eq!(client.list_calls(), 1);
        assert_eq!(client.requested_keys(), vec!["/missing-key"]);
    }

    #[test]
    fn test_open_passes_store_errors_through() {
        let message = "AccessDenied: Access Denied (status 403)";
        let (_, bucket) = bucket(MockClient::new().with_get_error(message));

        let err = bucket.open("/locked.txt").err().unwrap();

        assert!(matches!(&err, FsError::Store(e) if e.message == message));
        assert_eq!(err.to_string(), message);
    }

    #[test]
    fn test_open_passes_listing_errors_through() {
        let message = "SlowDown: reduce your request rate";
        let (client, bucket) = bucket(MockClient::new().with_list_error(message));

        let err = bucket.open("/anything").err().unwrap();

        assert_eq!(err.to_string(), message);
        assert_eq!(client.get_calls(), 0);
    }

    #[test]
    fn test_access_prefix_hides_paths() {
        let (client, bucket) = bucket_with(
            MockClient::new()
                .with_object("secret/key", b"s", None)
                .with_object("public/readme.txt", b"r", None),
            BucketConfig::new("bucket").with_access_prefix("/public/"),
        );
        let calls = client.store_calls();

        let cases = vec!["/secret/key", "/secret/", "/", "/publicity", "public/readme.txt"];

        for path in cases {
            let err = bucket.open(path).err().unwrap();
            assert!(err.is_not_found(), "failed for case: {}", path);
        }

        assert_eq!(client.store_calls(), calls);
        assert!(bucket.open("/public/readme.txt").is_ok());
        assert!(bucket.open("/public/").unwrap().is_dir());
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_concurrent_open() {
        assert_send_sync::<Bucket>();

        let (client, bucket) = bucket(
            MockClient::new()
                .with_object("a/one.txt", b"1", None)
                .with_object("a/two.txt", b"22", None)
                .with_object("b.txt", b"bbb", None),
        );
        let bucket = Arc::new(bucket);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bucket = bucket.clone();
                thread::spawn(move || {
                    let path = if i % 2 == 0 { "/a" } else { "/b.txt" };
                    let entry = bucket.open(path).unwrap();
                    (path, entry.is_dir(), entry.stat().unwrap().size)
                })
            })
            .collect();

        for handle in handles {
            let (path, is_dir, size) = handle.join().unwrap();
            match path {
                "/a" => assert!(is_dir && size == 0, "failed for case: {}", path),
                _ => assert!(!is_dir && size == 3, "failed for case: {}", path),
            }
        }

        assert_eq!(client.list_calls(), 8);
        assert_eq!(client.get_calls(), 4);
    }
}
