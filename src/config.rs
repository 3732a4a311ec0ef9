use clap::{Arg, ArgMatches, Command};

use crate::{model::fs::FSError, util::object};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_MOUNT: &str = "/s3/";

/// What a bucket needs to know about the store it is bound to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BucketConfig {
    pub provider: object::Provider,
    pub region: String,
    pub bucket_name: String,
    /// When set, only paths starting with this prefix are visible.
    pub access_prefix: Option<String>,
    /// Custom S3 endpoint, for S3-compatible stores.
    pub endpoint: Option<String>,
}

impl BucketConfig {
    pub fn new(bucket_name: &str) -> Self {
        Self {
            provider: object::Provider::AWS,
            region: DEFAULT_REGION.to_string(),
            bucket_name: bucket_name.to_string(),
            access_prefix: None,
            endpoint: None,
        }
    }

    pub fn with_access_prefix(mut self, prefix: &str) -> Self {
        self.access_prefix = Some(prefix.to_string());
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub bucket: BucketConfig,
    pub bind: String,
    pub mount: String,
}

pub fn command() -> Command {
    clap::command!()
        .about("Serve an object storage bucket as a browsable file tree over HTTP")
        .arg(
            Arg::new("BUCKET")
                .help("bucket to expose, as s3://name, gs://name or a bare S3 bucket name")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("region")
                .long("region")
                .env("AWS_REGION")
                .default_value(DEFAULT_REGION)
                .help("store region"),
        )
        .arg(
            Arg::new("bind")
                .long("bind")
                .env("BUCKETFS_BIND")
                .default_value(DEFAULT_BIND)
                .help("http listener address"),
        )
        .arg(
            Arg::new("mount")
                .long("mount")
                .default_value(DEFAULT_MOUNT)
                .help("url prefix the bucket is served under"),
        )
        .arg(
            Arg::new("access-prefix")
                .long("access-prefix")
                .env("BUCKETFS_ACCESS_PREFIX")
                .help("only expose paths starting with this prefix, e.g. /public/"),
        )
        .arg(
            Arg::new("endpoint")
                .long("endpoint")
                .env("AWS_ENDPOINT_URL")
                .help("custom endpoint for S3-compatible stores"),
        )
}

impl AppConfig {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, FSError> {
        let get = |id: &str| matches.get_one::<String>(id).cloned();

        let bucket_uri = get("BUCKET").unwrap_or_default();
        let provider = object::parse_provider_from_uri(&bucket_uri)?;
        let bucket_name = object::parse_bucket_from_uri(&bucket_uri);
        if bucket_name.is_empty() {
            return Err(FSError {
                message: format!("missing bucket name in: {}", bucket_uri),
            });
        }

        Ok(Self {
            bucket: BucketConfig {
                provider,
                region: get("region").unwrap_or_else(|| DEFAULT_REGION.to_string()),
                bucket_name: bucket_name.to_string(),
                access_prefix: get("access-prefix").filter(|p| !p.is_empty()),
                endpoint: get("endpoint"),
            },
            bind: get("bind").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            mount: normalize_mount(&get("mount").unwrap_or_else(|| DEFAULT_MOUNT.to_string())),
        })
    }
}

/// Mount prefixes always start and end with a separator.
pub fn normalize_mount(mount: &str) -> String {
    let trimmed = mount.trim_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", trimmed)
    }
}
