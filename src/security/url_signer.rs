use std::time::Duration;

use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::error::StoreError;
use crate::security::token_cache::SignerToken;

// HMAC-SHA256(app_name || name || expired_at || extra, signer token) → signature (base64)
//
// No separators between fields: the ordering and exact field set is the wire
// contract any external verifier replicates byte-for-byte.

type HmacSha256 = Hmac<Sha256>;

/// Unsigned target URL: prefix joined with the app name and asset name, each
/// percent-encoded as a single path segment.
pub fn unsigned_url(prefix: &str, app_name: &str, name: &str) -> Result<Url, StoreError> {
    let mut url =
        Url::parse(prefix).map_err(|_| StoreError::InvalidUrlPrefix(prefix.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| StoreError::InvalidUrlPrefix(prefix.to_string()))?
        .pop_if_empty()
        .push(app_name)
        .push(name);
    Ok(url)
}

/// Sign an asset URL with the cached signer token.
///
/// `expired_at = now + url_expiry` (a short-lived window independent of the
/// token's own expiry) is embedded as a decimal Unix-seconds query parameter.
/// The `signature` query value is `base64(digest) + "." + extra`, so a
/// verifier can split on the last `.` to recover both the digest and the
/// signing context. Fully deterministic for fixed inputs.
pub fn signed_url(
    prefix: &str,
    app_name: &str,
    name: &str,
    now: DateTime<Utc>,
    url_expiry: Duration,
    token: &SignerToken,
) -> Result<String, StoreError> {
    let mut url = unsigned_url(prefix, app_name, name)?;

    if !token.is_ready() {
        return Err(StoreError::SignerNotReady);
    }

    let expired_at = now + chrono::Duration::seconds(url_expiry.as_secs() as i64);
    let expired_at_string = expired_at.timestamp().to_string();

    let mut mac = HmacSha256::new_from_slice(token.value.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(app_name.as_bytes());
    mac.update(name.as_bytes());
    mac.update(expired_at_string.as_bytes());
    mac.update(token.extra.as_bytes());

    let signature = general_purpose::STANDARD.encode(mac.finalize().into_bytes());
    let signature_and_extra = format!("{signature}.{}", token.extra);

    url.query_pairs_mut()
        .append_pair("expired_at", &expired_at_string)
        .append_pair("signature", &signature_and_extra);

    Ok(url.into())
}
