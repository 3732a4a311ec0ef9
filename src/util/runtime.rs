use std::future::Future;

use tokio::runtime::Handle;

use crate::model::fs::FSError;

/// Handle of the runtime the async store clients were built on.
///
/// Store calls are synchronous from the caller's point of view, so they must
/// be made from a thread that is allowed to block (the main thread before the
/// server starts, or a `spawn_blocking` worker), never from a runtime worker.
pub fn current_handle() -> Result<Handle, FSError> {
    Handle::try_current().map_err(|err| FSError {
        message: format!("no tokio runtime available for store call: {}", err),
    })
}

pub fn block_on<Fut, T>(future: Fut) -> Result<T, FSError>
where
    Fut: Future<Output = T>,
{
    Ok(current_handle()?.block_on(future))
}
