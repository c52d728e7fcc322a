//! Outbound HTTP helpers, token cache and keystone token fetcher.
mod error;
pub use error::ClientError;

pub mod cache;
pub use cache::{CacheBackend, MemoryCache};

pub mod http;
pub use http::HttpClient;

pub mod token;
pub use token::{KeystoneAuth, TokenFetcher};

#[cfg(test)]
mod testing;
