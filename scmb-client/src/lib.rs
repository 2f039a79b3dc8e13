//! Client library for an appliance control plane and its message bus credentials.
//!
//! The workflow this crate supports has two halves:
//! - Log in to the appliance's REST API and provision an internally-signed
//!   client certificate for the state-change message bus, waiting on the
//!   asynchronous generation task ([`provision::ensure_credentials`]).
//! - Hold the downloaded CA/cert/key material in a scoped temporary
//!   directory that is removed on every exit path ([`CredentialStore`]).
//!
//! The bus subscription itself lives in the `scmb-sniffer` binary; this crate
//! only produces the [`CredentialPaths`] it consumes.

pub mod api;
pub mod certificates;
pub mod credentials;
pub mod error;
pub mod provision;
pub mod routing;
pub mod session;
pub mod task;

pub use api::ApiClient;
pub use credentials::{CredentialPaths, CredentialStore};
pub use error::{ApiError, ProvisionError};
pub use routing::RoutingKey;
pub use session::Session;
pub use task::{Task, TaskState};
