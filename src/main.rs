use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bucketfs::{adapters, config, server, util::object::Provider, AppConfig, Bucket, BucketConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!(context = "main", "called");

    let matches = config::command().get_matches();
    let cfg = AppConfig::from_matches(&matches)?;
    info!(
        context = "main",
        bucket = cfg.bucket.bucket_name,
        region = cfg.bucket.region,
        access_prefix = cfg.bucket.access_prefix,
        bind = cfg.bind,
        mount = cfg.mount,
        "args"
    );

    let client = connect(&cfg.bucket).await?;

    // Store calls block, so the existence check runs off the runtime workers.
    let bucket_cfg = cfg.bucket.clone();
    let bucket = tokio::task::spawn_blocking(move || Bucket::new(client, bucket_cfg)).await??;

    let app = server::routes(Arc::new(bucket), &cfg.mount);
    let listener = tokio::net::TcpListener::bind(&cfg.bind)
        .await
        .with_context(|| format!("binding {}", cfg.bind))?;

    info!(context = "main", addr = %listener.local_addr()?, mount = cfg.mount, "listening");
    axum::serve(listener, app).await?;

    Ok(())
}

async fn connect(cfg: &BucketConfig) -> anyhow::Result<Arc<dyn adapters::Object>> {
    match cfg.provider {
        Provider::AWS => {
            let sdk_config = aws_config::from_env()
                .region(aws_sdk_s3::config::Region::new(cfg.region.clone()))
                .load()
                .await;

            let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);
            if let Some(endpoint) = &cfg.endpoint {
                builder = builder.endpoint_url(endpoint).force_path_style(true);
            }

            Ok(Arc::new(aws_sdk_s3::Client::from_conf(builder.build())))
        }
        Provider::GCS => {
            let gcs_config = google_cloud_storage::client::ClientConfig::default()
                .with_auth()
                .await
                .context("loading gcs credentials")?;

            Ok(Arc::new(google_cloud_storage::client::Client::new(gcs_config)))
        }
    }
}
