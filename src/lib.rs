pub mod error;
pub mod remote;
pub mod security;
pub mod store;
pub mod utils;

pub use error::StoreError;
pub use remote::authority::AuthorityClient;
pub use security::token_cache::{SignerToken, SignerTokenCache};
pub use store::cloud::AssetStore;
pub use store::config::AssetStoreConfig;

// Crate version exposed for runtime queries
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
