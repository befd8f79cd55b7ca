//! Registry proxy: serves reads from the local registry and broadcasts
//! writes to every peer in the mesh.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod broadcaster;
mod error;

pub use broadcaster::*;
pub use error::Error;
