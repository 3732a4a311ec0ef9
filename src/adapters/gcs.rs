use std::{
    io::{self, Read},
    time::{Duration, SystemTime},
};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use google_cloud_storage::{
    client::Client,
    http::{
        buckets::get::GetBucketRequest,
        objects::{download::Range, get::GetObjectRequest, list::ListObjectsRequest},
    },
};

use tokio::{
    runtime::Handle,
    sync::{mpsc, oneshot},
};
use tokio_util::io::{StreamReader, SyncIoBridge};

use crate::{adapters, model, util};

fn to_system_time(updated: Option<time::OffsetDateTime>) -> Option<SystemTime> {
    let updated = updated?;
    let secs = updated.unix_timestamp();
    if secs < 0 {
        return None;
    }

    Some(SystemTime::UNIX_EPOCH + Duration::new(secs as u64, updated.nanosecond()))
}

const CHUNK_BUFFER: usize = 4;

/// Blocking reader over a chunked download stream.
fn blocking_reader<S>(stream: S, handle: Handle) -> Box<dyn Read + Send>
where
    S: Stream<Item = io::Result<Bytes>> + Send + 'static,
{
    let reader = StreamReader::new(Box::pin(stream));
    Box::new(SyncIoBridge::new_with_handle(reader, handle))
}

/// Runs the download as a task on `handle` that owns its own client, and
/// forwards the body chunks over a channel. The first message on the returned
/// oneshot is the outcome of starting the download.
fn spawn_download(
    client: Client,
    req: GetObjectRequest,
    handle: &Handle,
) -> (
    oneshot::Receiver<Result<(), google_cloud_storage::http::Error>>,
    mpsc::Receiver<io::Result<Bytes>>,
) {
    let (ready_tx, ready_rx) = oneshot::channel();
    let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_BUFFER);

    handle.spawn(async move {
        let stream = match client.download_streamed_object(&req, &Range::default()).await {
            Err(err) => {
                let _ = ready_tx.send(Err(err));
                return;
            }
            Ok(stream) => stream,
        };
        if ready_tx.send(Ok(())).is_err() {
            return;
        }

        futures::pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            // Receiver gone: the reader was dropped.
            if chunk_tx.send(chunk.map_err(io::Error::other)).await.is_err() {
                break;
            }
        }
    });

    (ready_rx, chunk_rx)
}

fn chunk_stream(rx: mpsc::Receiver<io::Result<Bytes>>) -> impl Stream<Item = io::Result<Bytes>> {
    futures::stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|chunk| (chunk, rx)) })
}

fn is_not_found(err: &google_cloud_storage::http::Error) -> bool {
    matches!(err, google_cloud_storage::http::Error::Response(resp) if resp.code == 404)
}

impl adapters::Object for Client {
    fn fs_head_bucket(&self, bucket: &str) -> Result<(), model::fs::FSError> {
        let req = GetBucketRequest {
            bucket: bucket.to_string(),
            ..Default::default()
        };

        util::runtime::block_on(self.get_bucket(&req))?.map_err(|err| model::fs::FSError {
            message: format!("failed to get_bucket: {}, {}", bucket, err),
        })?;

        Ok(())
    }

    fn fs_list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: &str,
    ) -> Result<model::fs::FSListing, model::fs::FSError> {
        let mut listing = model::fs::FSListing::default();
        let mut continuation_token: Option<String> = None;

        loop {
            let req = ListObjectsRequest {
                bucket: bucket.to_string(),
                prefix: Some(prefix.to_string()),
                delimiter: Some(delimiter.to_string()),
                page_token: continuation_token.clone(),
                ..Default::default()
            };

            let lo = util::runtime::block_on(self.list_objects(&req))?.map_err(|err| {
                model::fs::FSError {
                    message: format!("failed to list_objects at: {}, {}", prefix, err),
                }
            })?;

            listing.prefixes.extend(lo.prefixes.unwrap_or_default());

            for obj in lo.items.unwrap_or_default() {
                listing.objects.push(model::fs::FSObject {
                    key: obj.name,
                    size: obj.size.max(0) as u64,
                    modified_time: to_system_time(obj.updated),
                });
            }

            continuation_token = lo.next_page_token;
            if continuation_token.is_none() {
                break;
            }
        }

        Ok(listing)
    }

    fn fs_get_object(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Option<model::fs::FSObjectBody>, model::fs::FSError> {
        let req = GetObjectRequest {
            bucket: bucket.to_string(),
            object: util::object::wire_key(key).to_string(),
            ..Default::default()
        };

        let obj = match util::runtime::block_on(self.get_object(&req))? {
            Err(err) if is_not_found(&err) => return Ok(None),
            Err(err) => {
                return Err(model::fs::FSError {
                    message: format!("failed to get_object: {}, {}", key, err),
                });
            }
            Ok(obj) => obj,
        };

        // Pin the generation so the body is the object the metadata describes.
        let req = GetObjectRequest {
            generation: Some(obj.generation),
            ..req
        };
        let handle = util::runtime::current_handle()?;
        let (ready_rx, chunk_rx) = spawn_download(self.clone(), req, &handle);
        match handle.block_on(ready_rx) {
            Err(_) => {
                return Err(model::fs::FSError {
                    message: format!("download task ended early: {}", key),
                });
            }
            Ok(Err(err)) if is_not_found(&err) => return Ok(None),
            Ok(Err(err)) => {
                return Err(model::fs::FSError {
                    message: format!("failed to download_object: {}, {}", key, err),
                });
            }
            Ok(Ok(())) => {}
        }

        Ok(Some(model::fs::FSObjectBody {
            body: blocking_reader(chunk_stream(chunk_rx), handle),
            content_length: Some(obj.size.max(0) as u64),
            last_modified: to_system_time(obj.updated),
        }))
    }
}
