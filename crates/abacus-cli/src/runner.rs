use crate::input::Settings;
use crate::output::Annotation;
use abacus_core::abacus::Abacus;
use abacus_core::cluster::ClusterMap;
use abacus_core::fasta::Fasta;
use abacus_core::pipeline::{restore_experiments, run_datasets, Ingest};
use anyhow::Context;
use log::info;
use std::path::PathBuf;
use std::time::Instant;

pub struct Runner {
    pub parameters: Settings,
    pub clusters: Option<ClusterMap>,
    pub database: Option<Fasta>,
    pub annotation: Option<Annotation>,
    start: Instant,
}

impl Runner {
    pub fn new(parameters: Settings) -> anyhow::Result<Self> {
        let start = Instant::now();

        let clusters = match &parameters.clusters {
            Some(path) => {
                let map = ClusterMap::read(path)
                    .with_context(|| format!("Failed to read clusters from `{}`", path))?;
                info!("read {} clusters from {}", map.len(), path);
                Some(map)
            }
            None => None,
        };

        let database = match &parameters.fasta {
            Some(path) => {
                let fasta = abacus_core::read_fasta(
                    path,
                    &parameters.parameters.decoy_tag,
                    &parameters.parameters.contaminant_tag,
                )
                .with_context(|| format!("Failed to read FASTA from `{}`", path))?;
                info!("read {} proteins from {}", fasta.records.len(), path);
                Some(fasta)
            }
            None => None,
        };

        let annotation = parameters
            .annotation
            .as_ref()
            .map(Annotation::read)
            .transpose()?;

        Ok(Runner {
            parameters,
            clusters,
            database,
            annotation,
            start,
        })
    }

    // Create a path for `file_name` in the output directory
    pub(crate) fn make_path<S: AsRef<str>>(&self, file_name: S) -> PathBuf {
        self.parameters.output_directory.join(file_name.as_ref())
    }

    pub fn run(mut self) -> anyhow::Result<Settings> {
        let parameters = &self.parameters.parameters;
        let datasets = &self.parameters.datasets;

        run_datasets(&Ingest { parameters }, datasets)?;
        let experiments = restore_experiments(datasets)?;

        let mut abacus = Abacus::new(parameters);
        if let Some(clusters) = &self.clusters {
            abacus = abacus.with_clusters(clusters);
        }
        if let Some(database) = &self.database {
            abacus = abacus.with_database(database);
        }
        let clusters = abacus.aggregate(&experiments)?;

        let report = self.write_report(&clusters)?;
        info!("wrote {} clusters to {}", clusters.len(), report);
        self.parameters.output_paths.push(report);

        let path = self.make_path("results.json");
        self.parameters.output_paths.push(path.display().to_string());
        println!("{}", serde_json::to_string_pretty(&self.parameters)?);

        let bytes = serde_json::to_vec_pretty(&self.parameters)?;
        std::fs::write(&path, bytes)?;

        info!("finished in {:?}", self.start.elapsed());
        Ok(self.parameters)
    }
}
