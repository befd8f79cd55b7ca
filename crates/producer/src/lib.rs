//! Periodically evaluates indicators against the metrics store and hands
//! every satisfied threshold to an emitter.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod emitter;
mod error;
mod producer;
mod source;

pub use emitter::*;
pub use error::Error;
pub use producer::*;
pub use source::*;
