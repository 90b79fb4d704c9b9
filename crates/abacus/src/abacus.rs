//! # Cross-experiment aggregation
//!
//! Combines the resolved protein models of several datasets into one list of
//! [`Cluster`]s. Proteins are grouped by an external sequence-clustering map
//! when one is supplied; otherwise each protein accession is its own cluster.
//!
//! Peptides are classified across *all* datasets: a peptide sequence seen in
//! more than one (dataset, protein) context is shared, otherwise it is unique.
//! Every counted peptide ion of a cluster falls in exactly one of the two
//! classes, so `total_peptides == unique_peptides.len() + shared_peptides`.

use crate::calibration::is_decoy_protein;
use crate::cluster::{ClusterEntry, ClusterMap};
use crate::fasta::Fasta;
use crate::params::Parameters;
use crate::protein::{descending, PeptideIonIdentification, ProtXml, ProteinIdentification};
use crate::Error;
use fnv::FnvHashMap;
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use std::time::Instant;

/// A resolved protein model and the dataset it belongs to
#[derive(Clone, Debug, PartialEq)]
pub struct Experiment {
    pub name: String,
    pub model: ProtXml,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Cluster {
    pub number: usize,
    /// Representative protein id
    pub centroid: String,
    pub description: String,
    /// Member protein id -> number of (dataset, protein) records observed
    pub members: IndexMap<String, u32>,
    pub total_peptides: usize,
    pub unique_peptides: Vec<String>,
    pub shared_peptides: usize,
    /// Highest percent coverage over all members and datasets
    pub coverage: f32,
    pub top_pep_prob: f64,
    pub unique_top_pep_prob: f64,
    /// Summed label intensities, per channel
    pub intensities: Vec<f64>,
    /// One entry per counted peptide ion, across datasets
    pub peptides: Vec<String>,
    peptide_intensities: Vec<Vec<f64>>,
}

impl Cluster {
    fn singleton(number: usize, protein_id: &str) -> Self {
        let mut members = IndexMap::new();
        members.insert(protein_id.to_string(), 0);
        Cluster {
            number,
            centroid: protein_id.to_string(),
            members,
            ..Default::default()
        }
    }
}

impl From<&ClusterEntry> for Cluster {
    fn from(entry: &ClusterEntry) -> Self {
        Cluster {
            number: entry.number,
            centroid: entry.centroid.clone(),
            members: entry.members.iter().map(|m| (m.clone(), 0)).collect(),
            ..Default::default()
        }
    }
}

pub struct Abacus<'a> {
    parameters: &'a Parameters,
    clusters: Option<&'a ClusterMap>,
    database: Option<&'a Fasta>,
}

impl<'a> Abacus<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Abacus {
            parameters,
            clusters: None,
            database: None,
        }
    }

    /// Group proteins using an external clustering result
    pub fn with_clusters(mut self, clusters: &'a ClusterMap) -> Self {
        self.clusters = Some(clusters);
        self
    }

    /// Take cluster descriptions from a FASTA database
    pub fn with_database(mut self, database: &'a Fasta) -> Self {
        self.database = Some(database);
        self
    }

    /// Should this protein record enter the aggregation at all?
    fn admit(&self, protein: &ProteinIdentification) -> bool {
        let decoy = is_decoy_protein(protein, &self.parameters.decoy_tag);
        let contaminant = !self.parameters.contaminant_tag.is_empty()
            && protein.protein_name.contains(&self.parameters.contaminant_tag);

        !decoy
            && !contaminant
            && protein.probability >= self.parameters.protein_probability
            && (!self.parameters.picked || protein.picked)
    }

    /// Does this peptide ion count towards its protein's totals?
    fn counted(&self, ion: &PeptideIonIdentification) -> bool {
        ion.initial_probability >= self.parameters.peptide_probability
            && (!self.parameters.razor || ion.is_unique || ion.razor == 1)
    }

    /// Aggregate the resolved models of at least two datasets. The models are
    /// only read; clusters without any counted peptide are dropped, and the
    /// rest are ordered by descending top peptide probability.
    pub fn aggregate(&self, experiments: &[Experiment]) -> Result<Vec<Cluster>, Error> {
        if experiments.len() < 2 {
            return Err(Error::TooFewDatasets(experiments.len()));
        }

        let start = Instant::now();
        let mut clusters: Vec<Cluster> = self
            .clusters
            .map(|map| map.clusters.iter().map(Cluster::from).collect())
            .unwrap_or_default();
        let mut singletons: FnvHashMap<String, usize> = FnvHashMap::default();

        // peptide sequence -> number of (dataset, protein) contexts
        let mut occurrences: IndexMap<&str, usize> = IndexMap::new();

        for experiment in experiments {
            let mut admitted = 0;
            for protein in experiment.model.proteins() {
                if !self.admit(protein) {
                    continue;
                }
                let ions = protein
                    .peptide_ions
                    .iter()
                    .filter(|ion| self.counted(ion))
                    .collect::<Vec<_>>();
                if ions.is_empty() {
                    continue;
                }
                admitted += 1;

                let id = protein.protein_id();
                let idx = match self
                    .clusters
                    .and_then(|map| map.find(id))
                    .or_else(|| singletons.get(id).copied())
                {
                    Some(idx) => idx,
                    None => {
                        log::trace!("{}: new cluster for {}", experiment.name, id);
                        let idx = clusters.len();
                        let number =
                            clusters.iter().map(|c| c.number + 1).max().unwrap_or(0);
                        clusters.push(Cluster::singleton(number, id));
                        singletons.insert(id.to_string(), idx);
                        idx
                    }
                };

                let cluster = &mut clusters[idx];
                *cluster.members.entry(id.to_string()).or_insert(0) += 1;
                cluster.total_peptides += ions.len();
                cluster.coverage = cluster.coverage.max(protein.percent_coverage);
                cluster.top_pep_prob = cluster.top_pep_prob.max(protein.top_pep_prob);
                if cluster.description.is_empty() {
                    cluster.description = protein.description.clone();
                }
                for ion in &ions {
                    cluster.peptides.push(ion.peptide_sequence.clone());
                    if self.parameters.labels {
                        cluster.peptide_intensities.push(ion.intensities.clone());
                    }
                }

                let sequences = protein
                    .peptide_ions
                    .iter()
                    .filter(|ion| self.counted(ion))
                    .map(|ion| ion.peptide_sequence.as_str())
                    .unique();
                for sequence in sequences {
                    *occurrences.entry(sequence).or_insert(0) += 1;
                }
            }
            log::debug!("{}: {} proteins admitted", experiment.name, admitted);
        }

        for cluster in clusters.iter_mut() {
            self.classify(cluster, &occurrences);
            if let Some(record) = self.database.and_then(|db| db.get(&cluster.centroid)) {
                if !record.description.is_empty() {
                    cluster.description = record.description.clone();
                }
            }
        }

        clusters.retain(|cluster| cluster.total_peptides > 0);
        clusters.sort_by(|a, b| descending(a.top_pep_prob, b.top_pep_prob));

        info!(
            "aggregated {} datasets into {} clusters, {} distinct peptides in {:?}",
            experiments.len(),
            clusters.len(),
            occurrences.len(),
            start.elapsed()
        );
        Ok(clusters)
    }

    fn classify(&self, cluster: &mut Cluster, occurrences: &IndexMap<&str, usize>) {
        let intensities = std::mem::take(&mut cluster.peptide_intensities);
        for (idx, sequence) in cluster.peptides.iter().enumerate() {
            let contexts = occurrences.get(sequence.as_str()).copied().unwrap_or(0);
            let unique = contexts <= 1;
            if unique {
                cluster.unique_peptides.push(sequence.clone());
                if cluster.unique_top_pep_prob < cluster.top_pep_prob {
                    cluster.unique_top_pep_prob = cluster.top_pep_prob;
                }
            } else {
                cluster.shared_peptides += 1;
                cluster.unique_top_pep_prob = cluster.top_pep_prob;
            }

            if unique || !self.parameters.unique_only {
                if let Some(channels) = intensities.get(idx) {
                    if cluster.intensities.len() < channels.len() {
                        cluster.intensities.resize(channels.len(), 0.0);
                    }
                    for (sum, value) in cluster.intensities.iter_mut().zip(channels) {
                        *sum += value;
                    }
                }
            }
        }
    }
}
