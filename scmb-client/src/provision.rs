//! Certificate provisioning against the control plane.
//!
//! Orchestrates the whole flow: request generation (tolerating "already
//! exists"), wait for the task, download the CA bundle and keypair into the
//! credential store, and log the session out exactly once whether or not any
//! of that succeeded.

use crate::certificates;
use crate::credentials::{CredentialPaths, CredentialStore, CA_BUNDLE, CLIENT_CERT, CLIENT_KEY};
use crate::error::ProvisionError;
use crate::session::Session;
use crate::task;

/// Provision the bus credential bundle into `store`.
///
/// Consumes the session: it is logged out in a final step on success and on
/// every failure path. On failure the store is released, so no partial
/// bundle is left behind.
pub async fn ensure_credentials(
    session: Session,
    store: &mut CredentialStore,
) -> Result<CredentialPaths, ProvisionError> {
    let result = provision(&session, store).await;
    if result.is_err() {
        if let Err(e) = store.release() {
            tracing::warn!("failed to remove credential directory: {e}");
        }
    }
    if let Err(e) = session.logout().await {
        tracing::warn!("failed to log out of the appliance: {e}");
    }
    result
}

async fn provision(
    session: &Session,
    store: &CredentialStore,
) -> Result<CredentialPaths, ProvisionError> {
    let api = session.api();

    if let Some(generated) = certificates::generate_client_certificate(api).await? {
        let finished = task::wait_for_task(api, generated).await?;
        if finished.task_state.is_error() {
            return Err(ProvisionError::TaskFailed {
                message: finished.first_error_message(),
            });
        }
        tracing::debug!(state = ?finished.task_state, "certificate generation finished");
    }

    let ca = certificates::fetch_ca_bundle(api).await?;
    write_artifact(store, CA_BUNDLE, &ca)?;

    let keypair = certificates::fetch_client_keypair(api).await?;
    write_artifact(store, CLIENT_CERT, &keypair.certificate()?)?;
    write_artifact(store, CLIENT_KEY, &keypair.private_key()?)?;

    // All three artifacts exist from here on.
    store.paths().ok_or_else(|| ProvisionError::ArtifactWrite {
        name: CA_BUNDLE,
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "credential store released"),
    })
}

fn write_artifact(
    store: &CredentialStore,
    name: &'static str,
    contents: &str,
) -> Result<(), ProvisionError> {
    store
        .write(name, contents)
        .map(|_| ())
        .map_err(|source| ProvisionError::ArtifactWrite { name, source })
}
