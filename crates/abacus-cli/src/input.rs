use abacus_core::params::{Builder, Parameters};
use abacus_core::pipeline::Dataset;
use anyhow::{ensure, Context};
use clap::ArgMatches;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names written by the upstream validation tools
const PROTXML: &str = "interact.prot.xml";
const PEPXML: &str = "interact.pep.xml";
const LABELS: &str = "labels.tsv";

#[derive(Serialize)]
/// Actual run settings - may include overrides or default values not set by user
pub struct Settings {
    pub version: String,
    pub parameters: Parameters,
    pub datasets: Vec<Dataset>,
    pub fasta: Option<String>,
    pub clusters: Option<String>,
    pub annotation: Option<String>,
    pub output_paths: Vec<String>,

    #[serde(skip_serializing)]
    pub output_directory: PathBuf,
}

#[derive(Deserialize, Debug, Default)]
/// One dataset, either as a directory holding the validation outputs under
/// their conventional names, or as explicit file paths
pub struct DatasetInput {
    name: Option<String>,
    directory: Option<String>,
    protxml: Option<String>,
    pepxml: Option<String>,
    labels: Option<String>,
}

#[derive(Deserialize)]
/// Input parameters deserialized from JSON file
pub struct Input {
    #[serde(default)]
    parameters: Builder,
    datasets: Option<Vec<DatasetInput>>,
    output_directory: Option<String>,
    fasta: Option<String>,
    clusters: Option<String>,
    annotation: Option<String>,
}

impl DatasetInput {
    fn from_directory<S: Into<String>>(directory: S) -> Self {
        DatasetInput {
            directory: Some(directory.into()),
            ..Default::default()
        }
    }

    fn resolve(self, index: usize, output_directory: &Path) -> anyhow::Result<Dataset> {
        let directory = self.directory.map(PathBuf::from);
        let locate = |explicit: Option<String>, default: &str| -> Option<PathBuf> {
            explicit.map(PathBuf::from).or_else(|| {
                directory
                    .as_ref()
                    .map(|dir| dir.join(default))
                    .filter(|path| path.exists())
            })
        };

        let protxml = self
            .protxml
            .map(PathBuf::from)
            .or_else(|| directory.as_ref().map(|dir| dir.join(PROTXML)));
        ensure!(
            protxml.is_some(),
            "dataset #{} needs either `directory` or `protxml`",
            index + 1
        );

        let name = self
            .name
            .or_else(|| {
                directory
                    .as_ref()
                    .and_then(|dir| dir.file_name())
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| format!("dataset_{}", index + 1));

        Ok(Dataset {
            store: output_directory.join(&name),
            pepxml: locate(self.pepxml, PEPXML),
            labels: locate(self.labels, LABELS),
            protxml: protxml.unwrap_or_default(),
            name,
        })
    }
}

impl Input {
    pub fn from_arguments(matches: ArgMatches) -> anyhow::Result<Self> {
        let path = matches
            .get_one::<String>("parameters")
            .expect("required parameters");
        let mut input = Input::load(path)
            .with_context(|| format!("Failed to read parameters from `{path}`"))?;

        // Handle JSON configuration overrides
        if let Some(output_directory) = matches.get_one::<String>("output_directory") {
            log::trace!("overriding `output_directory` parameter.");
            input.output_directory = Some(output_directory.into());
        }
        if let Some(fasta) = matches.get_one::<String>("fasta") {
            log::trace!("overriding `fasta` parameter.");
            input.fasta = Some(fasta.into());
        }
        if let Some(clusters) = matches.get_one::<String>("clusters") {
            log::trace!("overriding `clusters` parameter.");
            input.clusters = Some(clusters.into());
        }
        if let Some(annotation) = matches.get_one::<String>("annotation") {
            log::trace!("overriding `annotation` parameter.");
            input.annotation = Some(annotation.into());
        }
        if let Some(directories) = matches.get_many::<String>("dataset_dirs") {
            log::trace!("overriding `datasets` parameter.");
            input.datasets = Some(directories.map(DatasetInput::from_directory).collect());
        }

        // Flags only ever switch a filter on
        for (flag, field) in [
            ("razor", &mut input.parameters.razor),
            ("picked", &mut input.parameters.picked),
            ("unique-only", &mut input.parameters.unique_only),
            ("labels", &mut input.parameters.labels),
        ] {
            if matches.get_flag(flag) {
                log::trace!("overriding `parameters.{}` parameter.", flag);
                *field = Some(true);
            }
        }

        ensure!(
            input.output_directory.is_some(),
            "`output_directory` must be set. For more information try '--help'"
        );
        ensure!(
            input.datasets.as_ref().map(Vec::len).unwrap_or(0) >= 2,
            "at least two `datasets` must be given. For more information try '--help'"
        );

        Ok(input)
    }

    pub fn load<S: AsRef<str>>(path: S) -> anyhow::Result<Self> {
        abacus_core::read_json(path.as_ref()).map_err(anyhow::Error::from)
    }

    pub fn build(self) -> anyhow::Result<Settings> {
        let parameters = self.parameters.make_parameters();

        let output_directory = match self.output_directory {
            Some(path) => PathBuf::from(path),
            None => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&output_directory).with_context(|| {
            format!(
                "Failed to create output directory `{}`",
                output_directory.display()
            )
        })?;

        let datasets = self
            .datasets
            .unwrap_or_default()
            .into_iter()
            .enumerate()
            .map(|(index, dataset)| dataset.resolve(index, &output_directory))
            .collect::<anyhow::Result<Vec<_>>>()?;

        for (idx, dataset) in datasets.iter().enumerate() {
            ensure!(
                datasets[..idx].iter().all(|d| d.name != dataset.name),
                "dataset name `{}` is used twice",
                dataset.name
            );
        }

        if parameters.labels && datasets.iter().all(|d| d.labels.is_none()) {
            log::warn!("`labels` is set, but no dataset has a labels file");
        }

        Ok(Settings {
            version: clap::crate_version!().into(),
            parameters,
            datasets,
            fasta: self.fasta,
            clusters: self.clusters,
            annotation: self.annotation,
            output_paths: Vec::new(),
            output_directory,
        })
    }
}
