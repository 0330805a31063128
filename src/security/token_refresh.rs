use std::sync::Arc;
use std::time::Duration;

use chrono::Duration as ChronoDuration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::remote::SignerTokenSource;
use crate::security::token_cache::SignerTokenCache;
use crate::utils::clock::Clock;

/// Handle to the background signer-token refresh task.
///
/// Dropping the handle cancels the task; `shutdown` cancels and joins it so
/// tests and orderly teardown paths can stop the loop deterministically.
#[derive(Debug)]
pub struct RefreshHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Background task that keeps the signer-token cache fresh.
///
/// Ticks on a fixed interval; the first tick fires immediately so request
/// traffic is not forced to wait a full interval for the initial token. Each
/// tick asks the source for a token expiring `token_expiry` from now and
/// atomically installs the result. A failed fetch is logged and swallowed:
/// the previously cached triple stays in place and the next tick retries;
/// there is no backoff and the cache is never cleared on failure.
pub fn spawn_signer_refresh(
    source: Arc<dyn SignerTokenSource>,
    cache: SignerTokenCache,
    clock: Arc<dyn Clock>,
    interval: Duration,
    token_expiry: Duration,
) -> RefreshHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    info!("signer token refresh task shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    refresh_once(source.as_ref(), &cache, clock.as_ref(), token_expiry).await;
                }
            }
        }
    });

    RefreshHandle {
        cancel,
        task: Some(task),
    }
}

async fn refresh_once(
    source: &dyn SignerTokenSource,
    cache: &SignerTokenCache,
    clock: &dyn Clock,
    token_expiry: Duration,
) {
    let expired_at = clock.now() + ChronoDuration::seconds(token_expiry.as_secs() as i64);

    match source.fetch_signer_token(expired_at).await {
        Ok(fresh) => {
            info!(expired_at = %fresh.expired_at, "refreshed cloud asset signer token");
            cache.update(fresh).await;
        }
        Err(err) => {
            warn!(
                requested_expired_at = %expired_at,
                error = %err,
                "failed to refresh cloud asset signer token (will retry)"
            );
        }
    }
}
