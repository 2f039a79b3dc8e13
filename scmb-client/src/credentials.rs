//! Scoped storage for the downloaded credential bundle.
//!
//! The bundle is three PEM files in a process-private temporary directory.
//! The directory is removed on release, and releasing is idempotent; the
//! backing [`tempfile::TempDir`] also removes it on drop, so cleanup runs on
//! every exit path even when `release` was never reached.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Appliance CA bundle.
pub const CA_BUNDLE: &str = "caroot.pem";
/// Bus client certificate.
pub const CLIENT_CERT: &str = "cert.pem";
/// Bus client private key.
pub const CLIENT_KEY: &str = "key.pem";

const ARTIFACTS: [&str; 3] = [CA_BUNDLE, CLIENT_CERT, CLIENT_KEY];

/// Process-private directory holding the credential bundle.
pub struct CredentialStore {
    dir: Option<tempfile::TempDir>,
}

/// Paths to the three bundle artifacts, for opening the bus connection.
#[derive(Debug, Clone)]
pub struct CredentialPaths {
    pub ca_bundle: PathBuf,
    pub certificate: PathBuf,
    pub private_key: PathBuf,
}

impl CredentialStore {
    /// Create a fresh scoped directory for the bundle.
    pub fn acquire() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("scmb-sniffer-").tempdir()?;
        tracing::debug!(path = %dir.path().display(), "credential directory created");
        Ok(Self { dir: Some(dir) })
    }

    /// The directory path, if not yet released.
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(tempfile::TempDir::path)
    }

    /// Write one named artifact, overwriting if present. The private key is
    /// restricted to owner read/write.
    pub fn write(&self, name: &'static str, contents: &str) -> io::Result<PathBuf> {
        let dir = self
            .dir
            .as_ref()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "credential store released"))?;
        let path = dir.path().join(name);
        fs::write(&path, contents)?;
        #[cfg(unix)]
        if name == CLIENT_KEY {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
        }
        Ok(path)
    }

    /// Paths of the three artifacts.
    ///
    /// Only meaningful after all three were written; call sites get the
    /// paths from [`crate::provision::ensure_credentials`], which upholds
    /// the all-or-none invariant.
    pub fn paths(&self) -> Option<CredentialPaths> {
        let dir = self.dir.as_ref()?;
        Some(CredentialPaths {
            ca_bundle: dir.path().join(CA_BUNDLE),
            certificate: dir.path().join(CLIENT_CERT),
            private_key: dir.path().join(CLIENT_KEY),
        })
    }

    /// Remove the artifacts and the directory. Missing files are fine, and
    /// so is calling this twice.
    pub fn release(&mut self) -> io::Result<()> {
        let Some(dir) = self.dir.take() else {
            return Ok(());
        };
        for name in ARTIFACTS {
            match fs::remove_file(dir.path().join(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }
        tracing::debug!(path = %dir.path().display(), "credential directory removed");
        dir.close()
    }
}
