//! Dataset-level stages and their concurrent execution
//!
//! A [`Dataset`] maps an identifier to explicit file locations, so no stage
//! depends on the process working directory. Stages run one worker per
//! dataset; workers share no mutable state and each writes only to its own
//! [`Store`].

use crate::abacus::Experiment;
use crate::calibration::adjust_mass_deviation;
use crate::inference::Resolver;
use crate::params::Parameters;
use crate::persistence::Store;
use crate::psm::{sort_by_probability, PsmLevel};
use crate::quant::Labels;
use crate::{read_pepxml, read_protxml, Error};
use log::{error, info};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub name: String,
    /// ProteinProphet output
    pub protxml: PathBuf,
    /// PeptideProphet/iProphet output
    pub pepxml: Option<PathBuf>,
    /// Per-ion label intensities
    pub labels: Option<PathBuf>,
    /// Directory receiving this dataset's persisted models
    pub store: PathBuf,
}

impl Dataset {
    pub fn store(&self) -> Store {
        Store::new(&self.store)
    }
}

/// A transformation applied to one dataset at a time
pub trait Stage: Sync {
    fn name(&self) -> &str;

    fn run(&self, dataset: &Dataset) -> Result<(), Error>;
}

/// Run `stage` over every dataset in parallel and wait for all of them.
/// Every failure is logged; the error of the first failed dataset (in input
/// order) is returned.
pub fn run_datasets<S: Stage>(stage: &S, datasets: &[Dataset]) -> Result<(), Error> {
    let start = Instant::now();
    let results = datasets
        .par_iter()
        .map(|dataset| stage.run(dataset))
        .collect::<Vec<_>>();

    let mut first = None;
    for (dataset, result) in datasets.iter().zip(results) {
        if let Err(err) = result {
            error!("{}: stage `{}` failed: {}", dataset.name, stage.name(), err);
            if first.is_none() {
                first = Some(Error::Dataset {
                    name: dataset.name.clone(),
                    source: Box::new(err),
                });
            }
        }
    }

    match first {
        Some(err) => Err(err),
        None => {
            info!(
                "stage `{}` finished {} datasets in {:?}",
                stage.name(),
                datasets.len(),
                start.elapsed()
            );
            Ok(())
        }
    }
}

/// Parse, resolve and calibrate a dataset, then persist every model
pub struct Ingest<'a> {
    pub parameters: &'a Parameters,
}

impl<'a> Stage for Ingest<'a> {
    fn name(&self) -> &str {
        "ingest"
    }

    fn run(&self, dataset: &Dataset) -> Result<(), Error> {
        let store = dataset.store();

        let mut protxml = read_protxml(&dataset.protxml)?;
        Resolver {
            decoy_tag: &self.parameters.decoy_tag,
            peptide_weight: self.parameters.peptide_weight,
        }
        .resolve(&mut protxml);

        if let Some(path) = &dataset.labels {
            let labels = Labels::read(path)?;
            labels.attach(&mut protxml);
        }
        store.save_protxml(&protxml)?;

        if let Some(path) = &dataset.pepxml {
            let mut pepxml = read_pepxml(path)?;
            if !pepxml.psms.is_empty() {
                adjust_mass_deviation(&mut pepxml.psms)?;
                sort_by_probability(&mut pepxml.psms);
            }
            for level in PsmLevel::ALL {
                store.save_psms(level, &level.collapse(&pepxml.psms))?;
            }
            store.save_pepxml(&pepxml)?;
            info!("{}: {} PSMs", dataset.name, pepxml.psms.len());
        }
        Ok(())
    }
}

/// Restore every dataset's resolved protein model. Any missing model is fatal.
pub fn restore_experiments(datasets: &[Dataset]) -> Result<Vec<Experiment>, Error> {
    datasets
        .iter()
        .map(|dataset| {
            dataset
                .store()
                .restore_protxml()
                .map(|model| Experiment {
                    name: dataset.name.clone(),
                    model,
                })
                .map_err(|source| Error::MissingModel {
                    name: dataset.name.clone(),
                    source: Box::new(source),
                })
        })
        .collect()
}
