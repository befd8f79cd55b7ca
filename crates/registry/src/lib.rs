//! In-memory indicator document registry: the store, its HTTP surface with
//! request metrics, an expiry janitor, and an agent that registers documents
//! from disk.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod agent;
mod error;
mod janitor;
mod metrics;
mod origin;
mod routes;
mod store;

pub use agent::{RegistryAgent, RegistryAgentOptions};
pub use error::Error;
pub use janitor::Janitor;
pub use metrics::{INVALID_PATH_ROUTE, RequestMetrics};
pub use origin::{ANONYMOUS_ORIGIN, RegisterParams, origin};
pub use routes::router;
pub use store::{Clock, RegistryEntry, Store};
