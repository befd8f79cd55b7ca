//! Read-only gateway in front of a registry that admits requests carrying a
//! UAA token with one of the required scopes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod error;
mod gateway;

pub use error::Error;
pub use gateway::*;
