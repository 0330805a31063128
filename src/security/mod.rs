pub mod token_cache;
pub mod token_refresh;
pub mod url_signer;
