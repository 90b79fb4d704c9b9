//! In-memory model of one dataset's protein inference results
//!
//! A [`ProtXml`] owns an ordered list of [`ProteinGroup`]s, each holding the
//! proteins ProteinProphet could not tell apart, and each protein holds the
//! peptide ions that were used as evidence for it. The graph is built by
//! [`crate::protxml::ProtXmlReader`] and then mutated in place by the
//! [`crate::inference::Resolver`].

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Razor assignment of a peptide ion that has not been resolved yet
pub const RAZOR_UNASSIGNED: i8 = -1;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PeptideIonIdentification {
    pub peptide_sequence: String,
    pub modified_peptide: String,
    pub charge: u8,
    pub initial_probability: f64,
    pub weight: f64,
    pub group_weight: f64,
    pub calc_neutral_pep_mass: f64,
    pub number_of_enzymatic_termini: u8,
    pub number_of_instances: u32,
    /// Other proteins this peptide maps to
    pub parent_proteins: Vec<String>,
    /// `-1` unassigned, `1` this protein holds the razor peptide, `0` another one does
    pub razor: i8,
    pub is_nondegenerate_evidence: bool,
    pub is_unique: bool,
    /// Opaque per-channel intensities from an external quantifier
    pub intensities: Vec<f64>,
}

impl Default for PeptideIonIdentification {
    fn default() -> Self {
        Self {
            peptide_sequence: String::default(),
            modified_peptide: String::default(),
            charge: 0,
            initial_probability: 0.0,
            weight: 0.0,
            group_weight: 0.0,
            calc_neutral_pep_mass: 0.0,
            number_of_enzymatic_termini: 0,
            number_of_instances: 0,
            parent_proteins: Vec::default(),
            razor: RAZOR_UNASSIGNED,
            is_nondegenerate_evidence: false,
            is_unique: false,
            intensities: Vec::default(),
        }
    }
}

impl PeptideIonIdentification {
    /// Total number of proteins this peptide maps to, including the one carrying it
    pub fn number_of_parent_proteins(&self) -> usize {
        self.parent_proteins.len() + 1
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProteinIdentification {
    pub group_number: u32,
    pub group_sibling_id: String,
    pub protein_name: String,
    pub description: String,
    pub length: u32,
    pub percent_coverage: f32,
    pub percent_spectrum_ids: f32,
    pub group_probability: f64,
    pub probability: f64,
    pub confidence: f64,
    /// Highest initial probability over `peptide_ions`
    pub top_pep_prob: f64,
    pub total_number_peptides: u32,
    pub unique_stripped_peptides: Vec<String>,
    /// Not guaranteed to be symmetric between proteins
    pub indistinguishable_proteins: Vec<String>,
    pub peptide_ions: Vec<PeptideIonIdentification>,
    pub has_razor: bool,
    pub picked: bool,
}

impl ProteinIdentification {
    /// Accession between the first pair of `|` (`sp|P02769|ALBU_BOVIN` -> `P02769`),
    /// or the whole name for names without database prefixes
    pub fn protein_id(&self) -> &str {
        accession(&self.protein_name)
    }

    pub(crate) fn update_top_pep_prob(&mut self) {
        self.top_pep_prob = self
            .peptide_ions
            .iter()
            .map(|ion| ion.initial_probability)
            .fold(0.0, f64::max);
    }
}

/// Extract the accession from a FASTA-style protein name
pub fn accession(name: &str) -> &str {
    let mut fields = name.split('|');
    match (fields.next(), fields.next()) {
        (Some(_), Some(id)) if !id.is_empty() => id,
        _ => name,
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProteinGroup {
    pub group_number: u32,
    pub probability: f64,
    pub proteins: Vec<ProteinIdentification>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProtXml {
    /// File name the model was read from
    pub name: String,
    pub run_options: String,
    pub groups: Vec<ProteinGroup>,
}

impl ProtXml {
    pub fn proteins(&self) -> impl Iterator<Item = &ProteinIdentification> {
        self.groups.iter().flat_map(|group| group.proteins.iter())
    }

    pub fn proteins_mut(&mut self) -> impl Iterator<Item = &mut ProteinIdentification> {
        self.groups.iter_mut().flat_map(|group| group.proteins.iter_mut())
    }

    pub fn peptide_ions(&self) -> impl Iterator<Item = &PeptideIonIdentification> {
        self.proteins().flat_map(|protein| protein.peptide_ions.iter())
    }

    /// Number of peptide ions currently flagged unique
    pub fn unique_ions(&self) -> usize {
        self.peptide_ions().filter(|ion| ion.is_unique).count()
    }

    /// Proteins ordered by descending top peptide probability. Equal proteins
    /// keep their file order.
    pub fn ranked_proteins(&self) -> Vec<&ProteinIdentification> {
        let mut proteins = self.proteins().collect::<Vec<_>>();
        proteins.sort_by(|a, b| descending(a.top_pep_prob, b.top_pep_prob));
        proteins
    }
}

/// Descending order for probabilities; NaN sorts last
pub(crate) fn descending(a: f64, b: f64) -> Ordering {
    b.partial_cmp(&a).unwrap_or_else(|| a.is_nan().cmp(&b.is_nan()))
}

#[cfg(test)]
mod test {
    use super::*;

    fn protein(name: &str, top: f64) -> ProteinIdentification {
        ProteinIdentification {
            protein_name: name.into(),
            top_pep_prob: top,
            ..Default::default()
        }
    }

    #[test]
    fn protein_ids() {
        assert_eq!(accession("sp|P02769|ALBU_BOVIN"), "P02769");
        assert_eq!(accession("rev_sp|P02769|ALBU_BOVIN"), "P02769");
        assert_eq!(accession("ENSP00000354587"), "ENSP00000354587");
        assert_eq!(accession("weird||name"), "weird||name");
    }

    #[test]
    fn ranking_is_stable() {
        let model = ProtXml {
            groups: vec![
                ProteinGroup {
                    group_number: 1,
                    probability: 1.0,
                    proteins: vec![protein("A", 0.5), protein("B", 0.9)],
                },
                ProteinGroup {
                    group_number: 2,
                    probability: 1.0,
                    proteins: vec![protein("C", 0.9), protein("D", f64::NAN)],
                },
            ],
            ..Default::default()
        };

        let names = model
            .ranked_proteins()
            .into_iter()
            .map(|p| p.protein_name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["B", "C", "A", "D"]);
    }

    #[test]
    fn top_probability() {
        let mut p = protein("A", 0.0);
        p.peptide_ions = vec![
            PeptideIonIdentification {
                initial_probability: 0.4,
                ..Default::default()
            },
            PeptideIonIdentification {
                initial_probability: 0.95,
                ..Default::default()
            },
        ];
        p.update_top_pep_prob();
        assert_eq!(p.top_pep_prob, 0.95);
        assert_eq!(p.peptide_ions[0].razor, RAZOR_UNASSIGNED);
    }
}
