//! Filesystem artifact source: `<dir>/<name>.abi` and `<dir>/<name>.txt`.

use std::path::{Path, PathBuf};

use crate::domain::errors::LedgerError;
use crate::ports::outbound::ArtifactSource;

#[derive(Debug, Clone)]
pub struct FsArtifactSource {
    dir: PathBuf,
    contract_name: String,
}

impl FsArtifactSource {
    pub fn new(dir: impl Into<PathBuf>, contract_name: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            contract_name: contract_name.into(),
        }
    }

    pub fn interface_path(&self) -> PathBuf {
        self.dir.join(format!("{}.abi", self.contract_name))
    }

    pub fn address_path(&self) -> PathBuf {
        self.dir.join(format!("{}.txt", self.contract_name))
    }

    fn read(path: &Path) -> Result<String, LedgerError> {
        std::fs::read_to_string(path)
            .map_err(|e| LedgerError::Artifact(format!("{}: {e}", path.display())))
    }
}

impl ArtifactSource for FsArtifactSource {
    fn read_interface(&self) -> Result<String, LedgerError> {
        Self::read(&self.interface_path())
    }

    fn read_address(&self) -> Result<String, LedgerError> {
        Self::read(&self.address_path())
    }
}

/// Artifacts held in memory, for tests and embedded deployments.
#[derive(Debug, Clone, Default)]
pub struct StaticArtifacts {
    pub interface: Option<String>,
    pub address: Option<String>,
}

impl StaticArtifacts {
    pub fn new(interface: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            interface: Some(interface.into()),
            address: Some(address.into()),
        }
    }
}

impl ArtifactSource for StaticArtifacts {
    fn read_interface(&self) -> Result<String, LedgerError> {
        self.interface
            .clone()
            .ok_or_else(|| LedgerError::Artifact("interface description not provided".into()))
    }

    fn read_address(&self) -> Result<String, LedgerError> {
        self.address
            .clone()
            .ok_or_else(|| LedgerError::Artifact("program address not provided".into()))
    }
}
