use std::io::Read;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::StoreError;
use crate::remote::authority::AuthorityClient;
use crate::remote::SignerTokenSource;
use crate::security::token_cache::SignerTokenCache;
use crate::security::token_refresh::{spawn_signer_refresh, RefreshHandle};
use crate::security::url_signer;
use crate::store::config::AssetStoreConfig;
use crate::utils::clock::{Clock, SystemClock};

/// Cloud-backed asset store.
///
/// Composes the signer-token cache, its background refresh loop, and the URL
/// signer behind name-in, URL-out operations. Asset bytes themselves are
/// handled by the remote authority; this store only produces URLs and
/// delegates uploads.
#[derive(Debug)]
pub struct AssetStore {
    config: AssetStoreConfig,
    authority: AuthorityClient,
    cache: SignerTokenCache,
    clock: Arc<dyn Clock>,
    refresh: Option<RefreshHandle>,
}

impl AssetStore {
    /// Build a store talking to the real authority with the system clock.
    ///
    /// Validates the configuration up front, so nothing is spawned on a
    /// config error, then starts the refresh loop, whose first fetch fires
    /// immediately. Must be called within a Tokio runtime context.
    pub fn new(config: AssetStoreConfig) -> Result<Self, StoreError> {
        config.validate()?;
        let authority =
            AuthorityClient::new(&config.host, &config.app_name, &config.auth_token)?;
        let source: Arc<dyn SignerTokenSource> = Arc::new(authority.clone());
        Self::assemble(config, authority, source, Arc::new(SystemClock))
    }

    /// Build a store with an injected token source and clock. The authority
    /// client is still constructed from the config for upload delegation.
    pub fn with_source(
        config: AssetStoreConfig,
        source: Arc<dyn SignerTokenSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let authority =
            AuthorityClient::new(&config.host, &config.app_name, &config.auth_token)?;
        Self::assemble(config, authority, source, clock)
    }

    fn assemble(
        config: AssetStoreConfig,
        authority: AuthorityClient,
        source: Arc<dyn SignerTokenSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, StoreError> {
        let cache = SignerTokenCache::new();
        let refresh = spawn_signer_refresh(
            source,
            cache.clone(),
            clock.clone(),
            config.refresh_interval(),
            config.token_expiry(),
        );

        info!(
            app_name = %config.app_name,
            public = config.public,
            "created cloud asset store"
        );

        Ok(Self {
            config,
            authority,
            cache,
            clock,
            refresh: Some(refresh),
        })
    }

    /// True iff the store is private, i.e. asset URLs must carry a signature.
    pub fn is_signature_required(&self) -> bool {
        !self.config.public
    }

    /// Produce a URL for `name`: unsigned for a public store, signed with the
    /// cached token for a private one. Fails fast with
    /// [`StoreError::SignerNotReady`] while the cache is still empty rather
    /// than blocking on a fetch.
    pub async fn signed_url(&self, name: &str) -> Result<String, StoreError> {
        if !self.is_signature_required() {
            let url =
                url_signer::unsigned_url(self.config.url_prefix(), &self.config.app_name, name)?;
            return Ok(url.into());
        }

        let token = self.cache.get().await;
        if !token.is_ready() {
            warn!(name, "cloud asset signer token is not yet ready");
            return Err(StoreError::SignerNotReady);
        }

        url_signer::signed_url(
            self.config.url_prefix(),
            &self.config.app_name,
            name,
            self.clock.now(),
            self.config.url_expiry(),
            &token,
        )
    }

    /// Delegate an upload to the authority's pre-signed upload exchange. The
    /// returned descriptor is opaque and passed through unmodified.
    pub async fn post_file_request(
        &self,
        name: &str,
        content_type: &str,
        content_size: u64,
    ) -> Result<serde_json::Value, StoreError> {
        info!(name, "generating pre-signed upload request for cloud asset");
        self.authority
            .presigned_upload(name, content_type, content_size)
            .await
            .map_err(StoreError::from)
    }

    /// Direct reads bypass the remote store's own protocol and are a
    /// deliberate capability restriction for this store kind.
    pub fn file_reader(&self, _name: &str) -> Result<Box<dyn Read>, StoreError> {
        Err(StoreError::Unsupported {
            operation: "directly getting files",
        })
    }

    /// Direct writes are likewise unavailable; uploads go through
    /// [`post_file_request`](Self::post_file_request).
    pub fn put_file(
        &self,
        _name: &str,
        _src: &mut dyn Read,
        _length: u64,
        _content_type: &str,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unsupported {
            operation: "directly uploading files",
        })
    }

    /// Signature verification happens at the remote edge, not in this
    /// process.
    pub fn parse_signature(&self, _signed: &str, _name: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unsupported {
            operation: "asset signature parsing",
        })
    }

    /// The shared signer-token cache backing this store.
    pub fn signer_cache(&self) -> &SignerTokenCache {
        &self.cache
    }

    /// Stop the background refresh loop and wait for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(refresh) = self.refresh.take() {
            refresh.shutdown().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::token_cache::SignerToken;
    use crate::utils::clock::test_support::FixedClock;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    /// Source that never succeeds, for exercising the not-ready path.
    #[derive(Debug)]
    struct DownSource;

    #[async_trait]
    impl SignerTokenSource for DownSource {
        async fn fetch_signer_token(
            &self,
            _expired_at: DateTime<Utc>,
        ) -> anyhow::Result<SignerToken> {
            Err(anyhow!("authority down"))
        }
    }

    /// Source that always hands out a valid token.
    #[derive(Debug)]
    struct HealthySource;

    #[async_trait]
    impl SignerTokenSource for HealthySource {
        async fn fetch_signer_token(
            &self,
            expired_at: DateTime<Utc>,
        ) -> anyhow::Result<SignerToken> {
            Ok(SignerToken::new("T", "E", expired_at))
        }
    }

    fn config(public: bool) -> AssetStoreConfig {
        AssetStoreConfig {
            app_name: "app".to_string(),
            host: "https://assets.example.com".to_string(),
            auth_token: "secret".to_string(),
            public,
            public_url_prefix: "https://cdn.example.com/public".to_string(),
            private_url_prefix: "https://cdn.example.com/assets".to_string(),
            url_expiry_secs: 900,
            refresh_interval_secs: 1800,
            token_expiry_secs: 7200,
        }
    }

    fn store(public: bool) -> AssetStore {
        AssetStore::with_source(config(public), Arc::new(DownSource), Arc::new(FixedClock(t0())))
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_config_never_spawns() {
        let mut bad = config(false);
        bad.app_name.clear();
        let err = AssetStore::with_source(bad, Arc::new(DownSource), Arc::new(FixedClock(t0())))
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingConfig("app name")));
    }

    #[tokio::test]
    async fn test_zero_refresh_interval_rejected_at_construction() {
        // A zero interval would panic inside the spawned refresh task and
        // leave the store permanently not ready even with a healthy source,
        // so construction has to fail instead.
        let mut bad = config(false);
        bad.refresh_interval_secs = 0;
        let err = AssetStore::with_source(
            bad,
            Arc::new(HealthySource),
            Arc::new(FixedClock(t0())),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::ZeroDuration("refresh interval")));
    }

    #[tokio::test]
    async fn test_signature_required_tracks_visibility() {
        assert!(!store(true).is_signature_required());
        assert!(store(false).is_signature_required());
    }

    #[tokio::test]
    async fn test_public_store_bypasses_signing() {
        let store = store(true);
        // Cache is empty and stays empty; a public store must not care.
        let url = store.signed_url("asset.png").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/public/app/asset.png");
        assert!(!url.contains("signature"));
        assert!(!url.contains("expired_at"));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_private_store_fails_fast_before_first_refresh() {
        let store = store(false);
        let err = store.signed_url("asset.png").await.unwrap_err();
        assert!(matches!(err, StoreError::SignerNotReady));
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_private_store_signs_with_cached_token() {
        let store = store(false);
        store
            .signer_cache()
            .update(SignerToken::new("T", "E", t0() + chrono::Duration::hours(2)))
            .await;

        let url = store.signed_url("asset.png").await.unwrap();
        assert_eq!(
            url,
            "https://cdn.example.com/assets/app/asset.png\
             ?expired_at=1700000900\
             &signature=N1hAl%2BrYIJLt8yTub6YHIa9%2FDko84m5CU%2Fy9x6csbvw%3D.E"
        );
        store.shutdown().await;
    }

    #[tokio::test]
    async fn test_direct_byte_access_is_unsupported() {
        let store = store(false);

        assert!(matches!(
            store.file_reader("asset.png"),
            Err(StoreError::Unsupported { .. })
        ));

        let mut src = std::io::empty();
        assert!(matches!(
            store.put_file("asset.png", &mut src, 0, "image/png"),
            Err(StoreError::Unsupported { .. })
        ));

        assert!(matches!(
            store.parse_signature("sig", "asset.png"),
            Err(StoreError::Unsupported { .. })
        ));

        store.shutdown().await;
    }
}
