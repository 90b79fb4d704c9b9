//! # Protein/peptide ambiguity resolution
//!
//! Operates on a single dataset's [`ProtXml`] model, in place:
//!
//! - **Promotion**: decoy-named proteins that are indistinguishable from at
//!   least one target protein are renamed to the best target.
//! - **Uniqueness**: peptide ions with a weight at or above a threshold are
//!   flagged unique.
//! - **Razor**: every peptide sequence is assigned to exactly one protein,
//!   the most probable one that carries it.
//! - **Picked**: each protein competes with its target/decoy counterpart;
//!   only the winner is picked.
//!
//! All passes are deterministic and can be re-run on an already resolved model.

use crate::protein::ProtXml;
use fnv::FnvHashMap;
use log::info;
use std::time::Instant;

/// Proteins from reviewed database entries are preferred during promotion
const REVIEWED_PREFIX: &str = "sp|";

/// Rename decoy proteins to an indistinguishable target protein, if one exists.
/// Returns the number of renamed proteins.
pub fn promote_protein_ids(model: &mut ProtXml, decoy_tag: &str) -> usize {
    let mut promoted = 0;
    for protein in model.proteins_mut() {
        if !protein.protein_name.contains(decoy_tag) {
            continue;
        }

        let mut targets = protein
            .indistinguishable_proteins
            .iter()
            .filter(|name| !name.contains(decoy_tag));

        let best = targets
            .clone()
            .find(|name| name.starts_with(REVIEWED_PREFIX))
            .or_else(|| targets.next());

        if let Some(best) = best {
            log::trace!("promoting {} to {}", protein.protein_name, best);
            protein.protein_name = best.clone();
            promoted += 1;
        }
    }
    promoted
}

/// Flag every peptide ion with `weight >= threshold` as unique, and every other
/// ion as shared. Returns the number of unique ions.
pub fn mark_unique_peptides(model: &mut ProtXml, threshold: f64) -> usize {
    let mut unique = 0;
    for protein in model.proteins_mut() {
        for ion in protein.peptide_ions.iter_mut() {
            ion.is_unique = ion.weight >= threshold;
            unique += ion.is_unique as usize;
        }
    }
    unique
}

#[derive(Copy, Clone)]
struct Candidate {
    group: usize,
    protein: usize,
    probability: f64,
    total_peptides: u32,
}

impl Candidate {
    /// Strictly better only; on ties the earlier candidate stays
    fn beats(&self, other: &Candidate) -> bool {
        self.probability > other.probability
            || (self.probability == other.probability
                && self.total_peptides > other.total_peptides)
    }
}

/// Assign each peptide sequence to its razor protein. Returns the number of
/// proteins holding at least one razor peptide.
pub fn assign_razor(model: &mut ProtXml) -> usize {
    let mut razor: FnvHashMap<String, Candidate> = FnvHashMap::default();

    for (group_idx, group) in model.groups.iter().enumerate() {
        for (protein_idx, protein) in group.proteins.iter().enumerate() {
            let candidate = Candidate {
                group: group_idx,
                protein: protein_idx,
                probability: protein.probability,
                total_peptides: protein.total_number_peptides,
            };
            for ion in &protein.peptide_ions {
                match razor.get_mut(&ion.peptide_sequence) {
                    Some(current) => {
                        if candidate.beats(current) {
                            *current = candidate;
                        }
                    }
                    None => {
                        razor.insert(ion.peptide_sequence.clone(), candidate);
                    }
                }
            }
        }
    }

    let mut holders = 0;
    for (group_idx, group) in model.groups.iter_mut().enumerate() {
        for (protein_idx, protein) in group.proteins.iter_mut().enumerate() {
            for ion in protein.peptide_ions.iter_mut() {
                let owner = razor
                    .get(&ion.peptide_sequence)
                    .map(|c| c.group == group_idx && c.protein == protein_idx)
                    .unwrap_or(false);
                ion.razor = owner as i8;
            }
            protein.has_razor = protein.peptide_ions.iter().any(|ion| ion.razor == 1);
            holders += protein.has_razor as usize;
        }
    }
    holders
}

/// Let every protein compete with its target/decoy counterpart, keyed on the
/// name with `decoy_tag` removed. The more probable entry is picked; decoys
/// win ties. Returns the number of picked proteins.
pub fn pick_proteins(model: &mut ProtXml, decoy_tag: &str) -> usize {
    // key -> (position in file order, probability, decoy)
    let mut winners: FnvHashMap<String, (usize, f64, bool)> = FnvHashMap::default();

    for (idx, protein) in model.proteins().enumerate() {
        let decoy = !decoy_tag.is_empty() && protein.protein_name.contains(decoy_tag);
        let key = protein.protein_name.replacen(decoy_tag, "", 1);
        let entry = winners.entry(key).or_insert((idx, protein.probability, decoy));
        let (_, probability, is_decoy) = *entry;
        if protein.probability > probability
            || (protein.probability == probability && decoy && !is_decoy)
        {
            *entry = (idx, protein.probability, decoy);
        }
    }

    let mut picked = 0;
    for (idx, protein) in model.proteins_mut().enumerate() {
        let key = protein.protein_name.replacen(decoy_tag, "", 1);
        protein.picked = winners
            .get(&key)
            .map(|(winner, _, _)| *winner == idx)
            .unwrap_or(false);
        picked += protein.picked as usize;
    }
    picked
}

/// Runs every resolution pass over a dataset, in order
pub struct Resolver<'a> {
    pub decoy_tag: &'a str,
    pub peptide_weight: f64,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    pub promoted: usize,
    pub unique_ions: usize,
    pub razor_proteins: usize,
    pub picked: usize,
}

impl<'a> Resolver<'a> {
    pub fn resolve(&self, model: &mut ProtXml) -> Resolution {
        let start = Instant::now();
        let resolution = Resolution {
            promoted: promote_protein_ids(model, self.decoy_tag),
            unique_ions: mark_unique_peptides(model, self.peptide_weight),
            razor_proteins: assign_razor(model),
            picked: pick_proteins(model, self.decoy_tag),
        };
        info!(
            "{}: promoted {} proteins, {} unique peptide ions, {} razor proteins, {} picked in {:?}",
            model.name,
            resolution.promoted,
            resolution.unique_ions,
            resolution.razor_proteins,
            resolution.picked,
            start.elapsed()
        );
        resolution
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protein::{
        PeptideIonIdentification, ProteinGroup, ProteinIdentification, RAZOR_UNASSIGNED,
    };
    use quickcheck_macros::quickcheck;

    fn ion(sequence: &str, weight: f64) -> PeptideIonIdentification {
        PeptideIonIdentification {
            peptide_sequence: sequence.into(),
            weight,
            initial_probability: 0.99,
            ..Default::default()
        }
    }

    fn protein(name: &str, probability: f64, ions: Vec<PeptideIonIdentification>) -> ProteinIdentification {
        ProteinIdentification {
            protein_name: name.into(),
            probability,
            total_number_peptides: ions.len() as u32,
            peptide_ions: ions,
            ..Default::default()
        }
    }

    fn model(proteins: Vec<ProteinIdentification>) -> ProtXml {
        ProtXml {
            name: "test.prot.xml".into(),
            groups: proteins
                .into_iter()
                .enumerate()
                .map(|(idx, p)| ProteinGroup {
                    group_number: idx as u32 + 1,
                    probability: p.probability,
                    proteins: vec![p],
                })
                .collect(),
            ..Default::default()
        }
    }

    fn names(model: &ProtXml) -> Vec<String> {
        model.proteins().map(|p| p.protein_name.clone()).collect()
    }

    #[test]
    fn promotion_prefers_reviewed() {
        let mut decoy = protein("rev_sp|P1|A", 1.0, vec![]);
        decoy.indistinguishable_proteins =
            vec!["rev_tr|X|X".into(), "tr|Q1|B".into(), "sp|P2|C".into()];
        let mut m = model(vec![decoy]);

        assert_eq!(promote_protein_ids(&mut m, "rev_"), 1);
        assert_eq!(names(&m), vec!["sp|P2|C"]);
        // The indistinguishable list is untouched
        assert_eq!(m.groups[0].proteins[0].indistinguishable_proteins.len(), 3);
    }

    #[test]
    fn promotion_falls_back_to_first_target() {
        let mut single = protein("rev_sp|P1|A", 1.0, vec![]);
        single.indistinguishable_proteins = vec!["tr|Q1|B".into()];
        let mut multi = protein("rev_sp|P3|A", 1.0, vec![]);
        multi.indistinguishable_proteins = vec!["tr|Q2|B".into(), "tr|Q3|C".into()];
        let mut none = protein("rev_sp|P4|A", 1.0, vec![]);
        none.indistinguishable_proteins = vec!["rev_tr|Q4|B".into()];
        let mut m = model(vec![single, multi, none]);

        assert_eq!(promote_protein_ids(&mut m, "rev_"), 2);
        assert_eq!(names(&m), vec!["tr|Q1|B", "tr|Q2|B", "rev_sp|P4|A"]);
    }

    #[test]
    fn promotion_is_idempotent() {
        let mut decoy = protein("rev_sp|P1|A", 1.0, vec![]);
        decoy.indistinguishable_proteins = vec!["sp|P2|C".into()];
        let mut m = model(vec![decoy, protein("sp|P9|Z", 0.5, vec![])]);

        promote_protein_ids(&mut m, "rev_");
        let once = m.clone();
        assert_eq!(promote_protein_ids(&mut m, "rev_"), 0);
        assert_eq!(m, once);
    }

    #[quickcheck]
    fn uniqueness_is_monotonic(weights: Vec<u8>, a: u8, b: u8) -> bool {
        let (lo, hi) = (a.min(b) as f64 / 255.0, a.max(b) as f64 / 255.0);
        let ions = weights
            .iter()
            .map(|&w| ion("PEPTIDE", w as f64 / 255.0))
            .collect();
        let mut m = model(vec![protein("sp|P1|A", 1.0, ions)]);

        mark_unique_peptides(&mut m, lo);
        let at_lo = m.peptide_ions().map(|i| i.is_unique).collect::<Vec<_>>();
        mark_unique_peptides(&mut m, hi);
        let at_hi = m.peptide_ions().map(|i| i.is_unique).collect::<Vec<_>>();

        at_lo.iter().zip(&at_hi).all(|(&l, &h)| l || !h)
    }

    #[test]
    fn uniqueness_threshold_is_inclusive() {
        let mut m = model(vec![protein(
            "sp|P1|A",
            1.0,
            vec![ion("AAA", 1.0), ion("CCC", 0.5), ion("DDD", 0.99)],
        )]);
        assert_eq!(mark_unique_peptides(&mut m, 1.0), 1);
        assert_eq!(mark_unique_peptides(&mut m, 0.5), 3);
        assert_eq!(m.unique_ions(), 3);
        assert_eq!(mark_unique_peptides(&mut m, 1.0), 1);
    }

    #[test]
    fn razor_goes_to_most_probable() {
        let mut m = model(vec![
            protein("sp|P1|A", 0.8, vec![ion("SHARED", 0.5), ion("ONLYA", 1.0)]),
            protein("sp|P2|B", 0.95, vec![ion("SHARED", 0.5)]),
            protein("sp|P3|C", 0.95, vec![ion("SHARED", 0.5)]),
        ]);
        assert_eq!(m.peptide_ions().next().map(|i| i.razor), Some(RAZOR_UNASSIGNED));

        assert_eq!(assign_razor(&mut m), 2);
        let razor = m
            .proteins()
            .map(|p| p.peptide_ions.iter().map(|i| i.razor).collect::<Vec<_>>())
            .collect::<Vec<_>>();
        assert_eq!(razor, vec![vec![0, 1], vec![1], vec![0]]);
        assert!(m.groups[0].proteins[0].has_razor);
        assert!(!m.groups[2].proteins[0].has_razor);

        let once = m.clone();
        assert_eq!(assign_razor(&mut m), 2);
        assert_eq!(m, once);
    }

    #[test]
    fn razor_tie_prefers_more_evidence() {
        let mut m = model(vec![
            protein("sp|P1|A", 0.9, vec![ion("SHARED", 0.5)]),
            protein("sp|P2|B", 0.9, vec![ion("SHARED", 0.5), ion("OTHER", 1.0)]),
        ]);
        assign_razor(&mut m);
        assert_eq!(m.groups[0].proteins[0].peptide_ions[0].razor, 0);
        assert_eq!(m.groups[1].proteins[0].peptide_ions[0].razor, 1);
    }

    #[test]
    fn picked_pairs() {
        let mut m = model(vec![
            protein("sp|P1|A", 0.9, vec![]),
            protein("rev_sp|P1|A", 0.4, vec![]),
            protein("sp|P2|B", 0.5, vec![]),
            protein("rev_sp|P2|B", 0.5, vec![]),
            protein("sp|P3|C", 0.1, vec![]),
            protein("rev_sp|P4|D", 0.2, vec![]),
        ]);
        assert_eq!(pick_proteins(&mut m, "rev_"), 4);
        let picked = m.proteins().map(|p| p.picked).collect::<Vec<_>>();
        assert_eq!(picked, vec![true, false, false, true, true, true]);
    }

    #[test]
    fn resolve_all() {
        let mut decoy = protein("rev_sp|P1|A", 0.9, vec![ion("AAA", 1.0), ion("CCC", 0.2)]);
        decoy.indistinguishable_proteins = vec!["sp|P1|A".into()];
        let mut m = model(vec![decoy, protein("sp|P2|B", 0.5, vec![ion("CCC", 0.8)])]);

        let resolution = Resolver {
            decoy_tag: "rev_",
            peptide_weight: 1.0,
        }
        .resolve(&mut m);
        assert_eq!(
            resolution,
            Resolution {
                promoted: 1,
                unique_ions: 1,
                razor_proteins: 1,
                picked: 2
            }
        );
        assert_eq!(names(&m), vec!["sp|P1|A", "sp|P2|B"]);
    }
}
