//! Mass deviation calibration and target/decoy classification
//!
//! Two decoy rules coexist and are intentionally different:
//!
//! * [`is_decoy_psm`] inspects the primary protein and only the *first*
//!   alternative protein of a peptide-spectrum match.
//! * [`is_decoy_protein`] requires the protein name and *every*
//!   indistinguishable protein to carry the decoy tag.

use crate::protein::ProteinIdentification;
use crate::psm::PeptideSpectrumMatch;
use crate::Error;

/// Only matches within this many Daltons contribute to the mass correction
pub const MASS_WINDOW: f64 = 0.1;

/// Shift every mass difference by the mean deviation of the matches inside
/// [`MASS_WINDOW`], and return the applied correction.
///
/// The correction is always computed from `raw_massdiff`, so calling this
/// twice yields the same calibrated values.
pub fn adjust_mass_deviation(psms: &mut [PeptideSpectrumMatch]) -> Result<f64, Error> {
    let (sum, count) = psms
        .iter()
        .map(|psm| psm.raw_massdiff)
        .filter(|massdiff| massdiff.abs() <= MASS_WINDOW)
        .fold((0.0, 0usize), |(sum, count), massdiff| {
            (sum + massdiff, count + 1)
        });

    if count == 0 {
        return Err(Error::CalibrationUndefined(MASS_WINDOW));
    }

    let adjustment = sum / count as f64;
    for psm in psms.iter_mut() {
        psm.massdiff = psm.raw_massdiff - adjustment;
    }

    log::debug!(
        "mass calibration: {} of {} matches within {} Da, correction {:.5} Da",
        count,
        psms.len(),
        MASS_WINDOW,
        adjustment
    );
    Ok(adjustment)
}

/// A match is a decoy if its protein carries `tag`, unless the first
/// alternative protein is a target. Later alternatives are not consulted.
pub fn is_decoy_psm(psm: &PeptideSpectrumMatch, tag: &str) -> bool {
    if !psm.protein.contains(tag) {
        return false;
    }
    match psm.alternative_proteins.first() {
        Some(alternative) => alternative.contains(tag),
        None => true,
    }
}

/// A protein is a decoy only if its name and all indistinguishable proteins carry `tag`
pub fn is_decoy_protein(protein: &ProteinIdentification, tag: &str) -> bool {
    protein.protein_name.contains(tag)
        && protein
            .indistinguishable_proteins
            .iter()
            .all(|name| name.contains(tag))
}

#[cfg(test)]
mod test {
    use super::*;

    fn psm(massdiff: f64) -> PeptideSpectrumMatch {
        PeptideSpectrumMatch {
            massdiff,
            raw_massdiff: massdiff,
            ..Default::default()
        }
    }

    #[test]
    fn single_centered_match() -> Result<(), Error> {
        let mut psms = vec![psm(0.0)];
        let adjustment = adjust_mass_deviation(&mut psms)?;
        assert_eq!(adjustment, 0.0);
        assert_eq!(psms[0].massdiff, 0.0);
        assert_eq!(psms[0].raw_massdiff, 0.0);
        Ok(())
    }

    #[test]
    fn outliers_are_shifted_but_ignored() -> Result<(), Error> {
        let mut psms = vec![psm(0.02), psm(0.04), psm(1.003), psm(-0.1)];
        let adjustment = adjust_mass_deviation(&mut psms)?;
        assert!((adjustment - (-0.04 / 3.0)).abs() < 1e-12);
        assert!((psms[2].massdiff - (1.003 - adjustment)).abs() < 1e-12);
        assert_eq!(psms[2].raw_massdiff, 1.003);

        // Re-running does not compound the correction
        let again = adjust_mass_deviation(&mut psms)?;
        assert_eq!(adjustment, again);
        assert!((psms[0].massdiff - (0.02 - adjustment)).abs() < 1e-12);
        Ok(())
    }

    #[test]
    fn no_match_in_window() {
        let mut psms = vec![psm(0.5), psm(-2.0)];
        assert!(matches!(
            adjust_mass_deviation(&mut psms),
            Err(Error::CalibrationUndefined(_))
        ));
        assert_eq!(psms[0].massdiff, 0.5);

        let mut empty: Vec<PeptideSpectrumMatch> = Vec::new();
        assert!(adjust_mass_deviation(&mut empty).is_err());
    }

    #[test]
    fn first_alternative_decides() {
        let mut m = PeptideSpectrumMatch {
            protein: "rev_sp|P1|A".into(),
            ..Default::default()
        };
        assert!(is_decoy_psm(&m, "rev_"));

        m.alternative_proteins = vec!["sp|P2|B".into(), "rev_sp|P3|C".into()];
        assert!(!is_decoy_psm(&m, "rev_"));

        m.alternative_proteins = vec!["rev_sp|P3|C".into(), "sp|P2|B".into()];
        assert!(is_decoy_psm(&m, "rev_"), "only the first alternative is inspected");

        m.protein = "sp|P1|A".into();
        assert!(!is_decoy_psm(&m, "rev_"));
    }

    #[test]
    fn protein_decoys_need_agreement() {
        let mut p = ProteinIdentification {
            protein_name: "rev_sp|P1|A".into(),
            indistinguishable_proteins: vec!["rev_sp|P3|C".into(), "sp|P2|B".into()],
            ..Default::default()
        };
        assert!(!is_decoy_protein(&p, "rev_"));
        p.indistinguishable_proteins.pop();
        assert!(is_decoy_protein(&p, "rev_"));
    }
}
