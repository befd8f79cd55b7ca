//! Authenticated client for the Prometheus HTTP query API.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod client;
mod error;
mod result;
mod verification;

pub use client::*;
pub use error::{Error, Result};
pub use result::*;
pub use verification::*;
