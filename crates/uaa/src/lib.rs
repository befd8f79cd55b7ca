//! Clients for a UAA-compatible OAuth2 server: a client-credentials token
//! fetcher that caches its token until expiry, and a `check_token` client used
//! to resolve opaque bearer tokens into scopes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod check_token;
mod error;
mod fetcher;

pub use check_token::*;
pub use error::{Error, Result};
pub use fetcher::*;

fn endpoint(base_url: &str, path: &str) -> String {
    format!("{}{path}", base_url.trim_end_matches('/'))
}
