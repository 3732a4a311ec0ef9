use std::time::{Duration, SystemTime};

use aws_sdk_s3::error::DisplayErrorContext;
use tokio_util::io::SyncIoBridge;

use crate::{adapters, model, util};

fn to_system_time(dt: Option<&aws_sdk_s3::primitives::DateTime>) -> Option<SystemTime> {
    let dt = dt?;
    if dt.secs() < 0 {
        return None;
    }

    Some(SystemTime::UNIX_EPOCH + Duration::new(dt.secs() as u64, dt.subsec_nanos()))
}

impl adapters::Object for aws_sdk_s3::Client {
    fn fs_head_bucket(&self, bucket: &str) -> Result<(), model::fs::FSError> {
        let req = self.head_bucket().bucket(bucket);

        util::runtime::block_on(req.send())?.map_err(|err| model::fs::FSError {
            message: format!("failed to head_bucket: {}, {}", bucket, DisplayErrorContext(&err)),
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
            let req = self
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .delimiter(delimiter)
                .set_continuation_token(continuation_token);

            let lo = util::runtime::block_on(req.send())?.map_err(|err| model::fs::FSError {
                message: format!(
                    "failed to list_objects at: {}, {}",
                    prefix,
                    DisplayErrorContext(&err)
                ),
            })?;

            for cp in lo.common_prefixes() {
                if let Some(p) = cp.prefix() {
                    listing.prefixes.push(p.to_string());
                }
            }

            for o in lo.contents() {
                listing.objects.push(model::fs::FSObject {
                    key: o.key().unwrap_or("").to_string(),
                    size: o.size().unwrap_or(0).max(0) as u64,
                    modified_time: to_system_time(o.last_modified()),
                });
            }

            continuation_token = lo.next_continuation_token().map(|tok| tok.to_string());
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
        let req = self
            .get_object()
            .bucket(bucket)
            .key(util::object::wire_key(key));

        let o = match util::runtime::block_on(req.send())? {
            Err(err) => {
                if let Some(svc_err) = err.as_service_error() {
                    if svc_err.is_no_such_key() {
                        return Ok(None);
                    }
                }

                return Err(model::fs::FSError {
                    message: format!("failed to get_object: {}, {}", key, DisplayErrorContext(&err)),
                });
            }
            Ok(o) => o,
        };

        let content_length = o.content_length().map(|len| len.max(0) as u64);
        let last_modified = to_system_time(o.last_modified());
        let handle = util::runtime::current_handle()?;
        let reader = SyncIoBridge::new_with_handle(Box::pin(o.body.into_async_read()), handle);

        Ok(Some(model::fs::FSObjectBody {
            body: Box::new(reader),
            content_length,
            last_modified,
        }))
    }
}
