//! Indicator documents, thresholds, and metric samples shared by the registry
//! and the evaluation pipeline.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod document;
mod error;
mod sample;
mod threshold;

pub use document::*;
pub use error::{Error, Result};
pub use sample::*;
pub use threshold::*;
