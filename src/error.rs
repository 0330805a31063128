use thiserror::Error;

/// Errors surfaced by the cloud asset store.
///
/// Background refresh failures never appear here; they are logged by the
/// refresh loop and retried on the next tick. Everything below is returned
/// synchronously to the caller of the operation that hit it.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A required configuration field was empty at construction time.
    #[error("missing {0} for cloud asset store")]
    MissingConfig(&'static str),

    /// A configured duration was zero at construction time. A zero refresh
    /// interval would kill the refresh loop before its first fetch.
    #[error("{0} must be non-zero for cloud asset store")]
    ZeroDuration(&'static str),

    /// The configured URL prefix could not be parsed as a base URL.
    #[error("invalid URL prefix for cloud asset store: {0}")]
    InvalidUrlPrefix(String),

    /// A signed URL was requested before any signer token refresh succeeded.
    /// Recoverable: the caller may retry once the background loop has run.
    #[error("cloud asset signer token is not yet ready")]
    SignerNotReady,

    /// The operation is not available for a cloud-backed store. Permanent
    /// for this store kind; never retried.
    #[error("{operation} is not available for cloud-based asset store")]
    Unsupported { operation: &'static str },

    /// A request to the remote asset authority failed.
    #[error("asset authority request failed: {0}")]
    Authority(#[from] anyhow::Error),
}
