use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Default, Clone, Debug)]
/// Filtering and scoring options, as deserialized from the JSON configuration.
/// Every field is optional; [`Builder::make_parameters`] fills in defaults.
pub struct Builder {
    /// Use this prefix for decoy proteins
    pub decoy_tag: Option<String>,
    /// Use this prefix for contaminant proteins
    pub contaminant_tag: Option<String>,
    /// Minimum protein probability for a protein to enter aggregation
    pub protein_probability: Option<f64>,
    /// Minimum initial probability for a peptide ion to be counted
    pub peptide_probability: Option<f64>,
    /// Peptide ions with weight >= this threshold are marked unique
    pub peptide_weight: Option<f64>,
    /// Count only unique or razor peptide ions, instead of every spectral hit
    pub razor: Option<bool>,
    /// Only aggregate proteins that won their target/decoy competition
    pub picked: Option<bool>,
    /// Only unique peptides contribute to reported label intensities
    pub unique_only: Option<bool>,
    /// Report summed label intensities
    pub labels: Option<bool>,
}

impl Builder {
    pub fn make_parameters(self) -> Parameters {
        let parameters = Parameters {
            decoy_tag: self.decoy_tag.unwrap_or_else(|| "rev_".into()),
            contaminant_tag: self.contaminant_tag.unwrap_or_else(|| "contam_".into()),
            protein_probability: self.protein_probability.unwrap_or(0.9),
            peptide_probability: self.peptide_probability.unwrap_or(0.5),
            peptide_weight: self.peptide_weight.unwrap_or(1.0).clamp(0.0, 1.0),
            razor: self.razor.unwrap_or(false),
            picked: self.picked.unwrap_or(false),
            unique_only: self.unique_only.unwrap_or(false),
            labels: self.labels.unwrap_or(false),
        };

        if parameters.decoy_tag.is_empty() {
            log::warn!("`decoy_tag` is empty: every protein will be classified as a decoy");
        }
        if parameters.protein_probability < 0.5 {
            log::warn!("`protein_probability` is lower than expected");
        }
        if parameters.unique_only && !parameters.labels {
            log::warn!("`unique_only` has no effect unless `labels` is set");
        }

        parameters
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Parameters {
    pub decoy_tag: String,
    pub contaminant_tag: String,
    pub protein_probability: f64,
    pub peptide_probability: f64,
    pub peptide_weight: f64,
    pub razor: bool,
    pub picked: bool,
    pub unique_only: bool,
    pub labels: bool,
}

impl Default for Parameters {
    fn default() -> Self {
        Builder::default().make_parameters()
    }
}
