use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;

/// Signer credential issued by the remote asset authority.
///
/// `value` is the HMAC signing secret, `extra` is opaque context the authority
/// returns alongside it (appended verbatim into every produced signature so a
/// verifier can reconstruct the signing context), and `expired_at` is the
/// authority-declared expiry of the token itself, distinct from the expiry
/// embedded in any individual signed URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignerToken {
    pub value: String,
    pub extra: String,
    pub expired_at: DateTime<Utc>,
}

impl SignerToken {
    pub fn new(
        value: impl Into<String>,
        extra: impl Into<String>,
        expired_at: DateTime<Utc>,
    ) -> Self {
        Self {
            value: value.into(),
            extra: extra.into(),
            expired_at,
        }
    }

    /// An empty triple signals "no successful refresh yet", never a valid
    /// credential.
    pub fn is_ready(&self) -> bool {
        !self.value.is_empty() && !self.extra.is_empty()
    }
}

impl Default for SignerToken {
    fn default() -> Self {
        Self {
            value: String::new(),
            extra: String::new(),
            expired_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

/// Shared signer-token cache with atomic whole-triple replacement.
///
/// Many request-handling readers, one refresh-loop writer. The lock guards
/// only the clone/assign of the triple; no I/O ever happens while it is held,
/// so a slow authority never stalls readers. Readers observe either the
/// pre-update or the post-update triple, never a field-level mix.
#[derive(Debug, Clone, Default)]
pub struct SignerTokenCache {
    inner: Arc<RwLock<SignerToken>>,
}

impl SignerTokenCache {
    /// Create an empty cache. `get` returns the empty triple until the first
    /// successful `update`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the most recently installed credential. Non-blocking apart
    /// from the bounded critical section; absence is signaled by an empty
    /// triple, never an error.
    pub async fn get(&self) -> SignerToken {
        self.inner.read().await.clone()
    }

    /// Blind atomic replace of the whole triple.
    pub async fn update(&self, token: SignerToken) {
        *self.inner.write().await = token;
    }
}
