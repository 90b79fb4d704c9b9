use crate::protein::descending;
use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Modification {
    /// 1-based position in the peptide sequence
    pub position: u16,
    pub mass: f64,
    /// Mass difference declared for this modification in the search summary,
    /// `0.0` if no declaration matched
    pub mass_diff: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PeptideSpectrumMatch {
    pub index: u32,
    pub spectrum: String,
    pub scan: u32,
    pub precursor_neutral_mass: f64,
    pub assumed_charge: u8,
    /// Seconds
    pub retention_time: f64,
    pub hit_rank: u8,
    pub peptide: String,
    pub modified_peptide: String,
    pub protein: String,
    pub alternative_proteins: Vec<String>,
    pub calc_neutral_pep_mass: f64,
    /// Calibrated mass difference
    pub massdiff: f64,
    /// Mass difference as reported by the search engine
    pub raw_massdiff: f64,
    pub probability: f64,
    pub expectation: f64,
    pub xcorr: f64,
    pub delta_cn: f64,
    pub sp_rank: f64,
    pub nterm_mass: f64,
    pub modifications: Vec<Modification>,
}

impl PeptideSpectrumMatch {
    /// Modified sequence if the search engine reported one, plain sequence otherwise
    pub fn ion_sequence(&self) -> &str {
        if self.modified_peptide.is_empty() {
            &self.peptide
        } else {
            &self.modified_peptide
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
/// Granularity of a persisted PSM list
pub enum PsmLevel {
    /// Every peptide-spectrum match
    Psm,
    /// Best match per peptide sequence
    Peptide,
    /// Best match per modified sequence and charge state
    Ion,
}

impl PsmLevel {
    pub const ALL: [PsmLevel; 3] = [PsmLevel::Psm, PsmLevel::Peptide, PsmLevel::Ion];

    /// Stage name used for the persisted blob
    pub fn stage(&self) -> &'static str {
        match self {
            PsmLevel::Psm => "psm",
            PsmLevel::Peptide => "pep",
            PsmLevel::Ion => "ion",
        }
    }

    /// Reduce `psms` to this level, keeping the highest-probability match for
    /// each key. On ties the earlier match wins; output follows first occurrence.
    pub fn collapse(&self, psms: &[PeptideSpectrumMatch]) -> Vec<PeptideSpectrumMatch> {
        if *self == PsmLevel::Psm {
            return psms.to_vec();
        }

        let mut best: FnvHashMap<(&str, u8), usize> = FnvHashMap::default();
        let mut order = Vec::new();
        for (idx, psm) in psms.iter().enumerate() {
            let key = match self {
                PsmLevel::Peptide => (psm.peptide.as_str(), 0),
                _ => (psm.ion_sequence(), psm.assumed_charge),
            };
            match best.get_mut(&key) {
                Some(current) => {
                    if psm.probability > psms[*current].probability {
                        *current = idx;
                    }
                }
                None => {
                    best.insert(key, idx);
                    order.push(key);
                }
            }
        }

        order
            .into_iter()
            .filter_map(|key| best.get(&key))
            .map(|&idx| psms[idx].clone())
            .collect()
    }
}

/// Sort by descending probability, keeping file order for ties
pub fn sort_by_probability(psms: &mut [PeptideSpectrumMatch]) {
    psms.sort_by(|a, b| descending(a.probability, b.probability));
}
