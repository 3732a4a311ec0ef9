use std::time::SystemTime;

use crate::{
    bucket::Bucket,
    entry::{Entry, Metadata, DIR_MODE},
    error::FsError,
    model,
    util::object::{child_name, DELIMITER},
};

/// A directory synthesized from one delimiter listing. The listing is
/// captured at open time and never refreshed.
pub struct Directory<'a> {
    bucket: &'a Bucket,
    path: String,
    prefix: String,
    listing: model::fs::FSListing,
}

impl<'a> Directory<'a> {
    pub(crate) fn new(
        bucket: &'a Bucket,
        path: &str,
        prefix: String,
        listing: model::fs::FSListing,
    ) -> Self {
        Self {
            bucket,
            path: path.to_string(),
            prefix,
            listing,
        }
    }

    pub fn name(&self) -> &str {
        self.prefix.trim_end_matches(DELIMITER)
    }

    pub fn size(&self) -> u64 {
        0
    }

    pub fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }

    pub fn is_dir(&self) -> bool {
        true
    }

    pub fn mode(&self) -> u32 {
        DIR_MODE
    }

    pub fn stat(&self) -> Metadata {
        Metadata::directory(self.name())
    }

    /// Children of this directory: common prefixes first, then objects, each
    /// in listing order. A marker object named exactly like the directory is
    /// not a child and is left out.
    pub fn read_dir(&self, limit: Option<usize>) -> Vec<Metadata> {
        let dirs = self
            .listing
            .prefixes
            .iter()
            .map(|p| child_name(&self.prefix, p))
            .filter(|name| !name.is_empty())
            .map(Metadata::directory);

        let files = self.listing.objects.iter().filter_map(|o| {
            let name = child_name(&self.prefix, &o.key);
            if name.is_empty() {
                None
            } else {
                Some(Metadata::file(name, o.size, o.modified_time))
            }
        });

        dirs.chain(files).take(limit.unwrap_or(usize::MAX)).collect()
    }

    /// Opens `name` relative to this directory through the owning bucket.
    pub fn open_child(&self, name: &str) -> Result<Entry<'a>, FsError> {
        let path = if self.path.is_empty() || self.path.ends_with(DELIMITER) {
            format!("{}{}", self.path, name)
        } else {
            format!("{}{}{}", self.path, DELIMITER, name)
        };

        self.bucket.open(&path)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use super::*;
    use crate::{adapters::mock::MockClient, config::BucketConfig};

    fn bucket(client: MockClient) -> (Arc<MockClient>, Bucket) {
        let client = Arc::new(client);
        let bucket = Bucket::new(client.clone(), BucketConfig::new("bucket")).unwrap();
        (client, bucket)
    }

    fn listing() -> model::fs::FSListing {
        model::fs::FSListing {
            prefixes: vec!["docs/img/".to_string(), "docs/src/".to_string()],
            objects: vec![
                model::fs::FSObject {
                    key: "docs/".to_string(),
                    size: 0,
                    modified_time: None,
                },
                model::fs::FSObject {
                    key: "docs/a.md".to_string(),
                    size: 3,
                    modified_time: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(5)),
                },
                model::fs::FSObject {
                    key: "docs/b.md".to_string(),
                    size: 7,
                    modified_time: None,
                },
            ],
        }
    }

    #[test]
    fn test_metadata() {
        let (_, bucket) = bucket(MockClient::new());
        let dir = Directory::new(&bucket, "/docs", "docs/".to_string(), listing());

        assert_eq!(dir.name(), "docs");
        assert_eq!(dir.size(), 0);
        assert_eq!(dir.modified(), SystemTime::UNIX_EPOCH);
        assert!(dir.is_dir());
        assert_eq!(dir.mode(), 0o755);
        assert_eq!(dir.stat(), Metadata::directory("docs"));
    }

    #[test]
    fn test_read_dir() {
        let (client, bucket) = bucket(MockClient::new());
        let dir = Directory::new(&bucket, "/docs", "docs/".to_string(), listing());

        let entries = dir.read_dir(None);

        assert_eq!(
            entries,
            vec![
                Metadata::directory("img"),
                Metadata::directory("src"),
                Metadata::file("a.md", 3, Some(SystemTime::UNIX_EPOCH + Duration::from_secs(5))),
                Metadata::file("b.md", 7, None),
            ]
        );
        assert_eq!(client.list_calls(), 0);
        assert_eq!(client.get_calls(), 0);
    }

    #[test]
    fn test_read_dir_limit() {
        let (_, bucket) = bucket(MockClient::new());
        let dir = Directory::new(&bucket, "/docs", "docs/".to_string(), listing());

        let cases = vec![
            (Some(0), vec![]),
            (Some(1), vec!["img"]),
            (Some(3), vec!["img", "src", "a.md"]),
            (Some(10), vec!["img", "src", "a.md", "b.md"]),
            (None, vec!["img", "src", "a.md", "b.md"]),
        ];

        for (limit, expected) in cases {
            let names: Vec<String> = dir.read_dir(limit).into_iter().map(|m| m.name).collect();
            assert_eq!(names, expected, "failed for case: {:?}", limit);
        }
    }

    #[test]
    fn test_root_listing_names() {
        let (_, bucket) = bucket(MockClient::new());
        let dir = Directory::new(
            &bucket,
            "/",
            "".to_string(),
            model::fs::FSListing {
                prefixes: vec!["docs/".to_string()],
                objects: vec![model::fs::FSObject {
                    key: "readme.txt".to_string(),
                    size: 42,
                    modified_time: None,
                }],
            },
        );

        let names: Vec<String> = dir.read_dir(None).into_iter().map(|m| m.name).collect();

        assert_eq!(dir.name(), "");
        assert_eq!(names, vec!["docs", "readme.txt"]);
    }

    #[test]
    fn test_open_child() {
        let (client, bucket) = bucket(
            MockClient::new()
                .with_object("site/index.html", b"<h1>hi</h1>", None)
                .with_object("site/css/main.css", b"body{}", None),
        );

        let cases = vec![("/site", "index.html", false), ("/site/", "css", true)];

        for (path, child, expected_dir) in cases {
            let dir = match bucket.open(path).unwrap() {
                Entry::Directory(dir) => dir,
                Entry::File(_) => panic!("expected a directory at {}", path),
            };

            let entry = dir.open_child(child).unwrap();
            assert_eq!(entry.is_dir(), expected_dir, "failed for case: {} {}", path, child);
        }

        assert_eq!(client.requested_keys(), vec!["/site/index.html"]);
    }
}
