//! Cached OAuth access tokens for outbound calls.
//!
//! [`TokenCache`] serves one shared token to any number of concurrent
//! callers and refreshes it through a [`TokenFetcher`] when it expires,
//! with at most one fetch in flight.
//!
//! ```no_run
//! use relay_access_token::{AuthConfig, ClientCredentialsFetcher, TokenCache, TokenCacheConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), relay_access_token::TokenError> {
//! let fetcher = ClientCredentialsFetcher::new(&AuthConfig::new(
//!     "https://auth.internal",
//!     "forwarder",
//!     "secret",
//! ))?;
//! let cache = TokenCache::new(Arc::new(fetcher), TokenCacheConfig::default());
//! let token = cache.get_token().await?;
//! println!("{}", token.authorization_header());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod token;

pub use cache::{TokenCache, TokenProvider};
pub use config::{AuthConfig, TokenCacheConfig};
pub use error::TokenError;
pub use fetcher::{ClientCredentialsFetcher, TokenFetcher};
pub use token::Token;
