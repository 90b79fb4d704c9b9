pub mod abacus;
pub mod calibration;
pub mod cluster;
pub mod fasta;
pub mod inference;
pub mod params;
pub mod pepxml;
pub mod persistence;
pub mod pipeline;
pub mod protein;
pub mod protxml;
pub mod psm;
pub mod quant;
pub mod xml;

use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to parse `{path}`: {source}")]
    Parse {
        path: String,
        #[source]
        source: xml::XmlError,
    },
    #[error("mass calibration undefined: no match within {0} Da")]
    CalibrationUndefined(f64),
    #[error("failed to serialize `{path}`: {source}")]
    Serialize {
        path: String,
        #[source]
        source: bincode::error::EncodeError,
    },
    #[error("cannot restore `{path}`: {reason}")]
    Restore { path: String, reason: String },
    #[error("aggregation requires at least two datasets, found {0}")]
    TooFewDatasets(usize),
    #[error("dataset `{name}` has no resolved model: {source}")]
    MissingModel {
        name: String,
        #[source]
        source: Box<Error>,
    },
    #[error("dataset `{name}` failed: {source}")]
    Dataset {
        name: String,
        #[source]
        source: Box<Error>,
    },
    #[error("malformed cluster file, line {line}: {reason}")]
    ClusterFormat { line: usize, reason: String },
    #[error("malformed label file, line {line}: {reason}")]
    Labels { line: u64, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub fn read_protxml<P: AsRef<Path>>(path: P) -> Result<protein::ProtXml, Error> {
    let path = path.as_ref();
    protxml::ProtXmlReader::read(path).map_err(|source| Error::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_pepxml<P: AsRef<Path>>(path: P) -> Result<pepxml::PepXml, Error> {
    let path = path.as_ref();
    pepxml::PepXmlReader::read(path).map_err(|source| Error::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub fn read_fasta<P, S>(path: P, decoy_tag: S, contaminant_tag: S) -> Result<fasta::Fasta, Error>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    let contents = std::fs::read_to_string(path)?;
    Ok(fasta::Fasta::parse(&contents, decoy_tag, contaminant_tag))
}

pub fn read_json<P, T>(path: P) -> Result<T, Error>
where
    P: AsRef<Path>,
    T: for<'de> serde::Deserialize<'de>,
{
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}
