pub mod authority;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::security::token_cache::SignerToken;

/// Source of fresh signer tokens.
///
/// The refresh loop issues exactly one outstanding fetch at a time; an
/// implementation is expected to be stateless between calls. `expired_at` is
/// the absolute expiry the caller wants the issued token to carry.
#[async_trait]
pub trait SignerTokenSource: Send + Sync + std::fmt::Debug {
    async fn fetch_signer_token(&self, expired_at: DateTime<Utc>) -> Result<SignerToken>;
}
