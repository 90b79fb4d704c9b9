//! Binary snapshots of per-dataset models between pipeline stages
//!
//! Each dataset owns a store directory; every stage writes one `<stage>.bin`
//! blob into it. Blobs are `bincode` encoded with the standard configuration.

use crate::pepxml::PepXml;
use crate::protein::ProtXml;
use crate::psm::{PeptideSpectrumMatch, PsmLevel};
use crate::Error;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const PROTEIN_STAGE: &str = "protxml";
pub const PEPTIDE_STAGE: &str = "pepxml";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Store {
    root: PathBuf,
}

impl Store {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Store { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, stage: &str) -> PathBuf {
        self.root.join(format!("{}.bin", stage))
    }

    pub fn serialize<T: Serialize>(&self, stage: &str, value: &T) -> Result<PathBuf, Error> {
        let path = self.path(stage);
        let bytes = bincode::serde::encode_to_vec(value, bincode::config::standard()).map_err(
            |source| Error::Serialize {
                path: path.display().to_string(),
                source,
            },
        )?;
        std::fs::create_dir_all(&self.root)?;
        std::fs::write(&path, bytes)?;
        log::trace!("wrote {}", path.display());
        Ok(path)
    }

    /// Restore a blob written by [`Store::serialize`]. A missing, truncated or
    /// otherwise undecodable blob is an error, never a default value.
    pub fn restore<T: DeserializeOwned>(&self, stage: &str) -> Result<T, Error> {
        let path = self.path(stage);
        let restore_error = |reason: String| Error::Restore {
            path: path.display().to_string(),
            reason,
        };

        let bytes = std::fs::read(&path).map_err(|e| restore_error(e.to_string()))?;
        let (value, read) =
            bincode::serde::decode_from_slice::<T, _>(&bytes, bincode::config::standard())
                .map_err(|e| restore_error(e.to_string()))?;
        if read != bytes.len() {
            return Err(restore_error(format!(
                "{} trailing bytes",
                bytes.len() - read
            )));
        }
        Ok(value)
    }

    pub fn save_protxml(&self, model: &ProtXml) -> Result<PathBuf, Error> {
        self.serialize(PROTEIN_STAGE, model)
    }

    pub fn restore_protxml(&self) -> Result<ProtXml, Error> {
        self.restore(PROTEIN_STAGE)
    }

    pub fn save_pepxml(&self, model: &PepXml) -> Result<PathBuf, Error> {
        self.serialize(PEPTIDE_STAGE, model)
    }

    pub fn restore_pepxml(&self) -> Result<PepXml, Error> {
        self.restore(PEPTIDE_STAGE)
    }

    pub fn save_psms(
        &self,
        level: PsmLevel,
        psms: &[PeptideSpectrumMatch],
    ) -> Result<PathBuf, Error> {
        self.serialize(level.stage(), &psms)
    }

    pub fn restore_psms(&self, level: PsmLevel) -> Result<Vec<PeptideSpectrumMatch>, Error> {
        self.restore(level.stage())
    }
}
